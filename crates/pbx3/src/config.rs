//! Flag-aware connection resolution.
//!
//! Combines the shared config (`pbx3_config`) with global CLI flags to
//! produce the `ConnectionConfig` a command runs against.

use clap::ValueEnum;
use secrecy::SecretString;

use pbx3_config::{Config, Profile};
use pbx3_core::ConnectionConfig;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use pbx3_config::{clear_token, config_path, load_config, save_config, store_token};

/// Load config, falling back to defaults if the file is unreadable.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Profile name from `--profile`, then `default_profile`, then "default".
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Output format from `--output`, then the config default, then JSON.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> OutputFormat {
    global.output.unwrap_or_else(|| {
        OutputFormat::from_str(&cfg.defaults.output, true).unwrap_or(OutputFormat::Json)
    })
}

/// Everything a networked command needs.
#[derive(Debug)]
pub struct Context {
    pub profile_name: String,
    pub connection: ConnectionConfig,
    /// Whether the token came from `--token`/`PBX3_TOKEN` rather than
    /// the profile's credential chain.
    pub token_from_flag: bool,
}

/// Resolve the active profile with CLI flag overrides applied.
pub fn resolve(global: &GlobalOpts, cfg: &Config) -> Result<Context, CliError> {
    let (profile_name, mut profile) = match cfg.profile(global.profile.as_deref()) {
        Ok((name, profile)) => (name, profile.clone()),
        // An explicitly named profile must exist.
        Err(_) if global.profile.is_some() => return Err(profile_not_found(global, cfg)),
        Err(_) => (active_profile_name(global, cfg), Profile::default()),
    };

    // Flags win over the profile.
    if let Some(ref base_url) = global.base_url {
        profile.base_url.clone_from(base_url);
    }
    if profile.base_url.is_empty() {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }

    let mut connection = pbx3_config::profile_to_connection(&profile, &cfg.defaults)?;

    let token_from_flag = global.token.is_some();
    connection.token = match global.token {
        Some(ref token) => Some(SecretString::from(token.clone())),
        None => pbx3_config::resolve_token(&profile, &profile_name).ok(),
    };

    Ok(Context {
        profile_name,
        connection,
        token_from_flag,
    })
}

fn profile_not_found(global: &GlobalOpts, cfg: &Config) -> CliError {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    names.sort_unstable();
    CliError::ProfileNotFound {
        name: active_profile_name(global, cfg),
        available: if names.is_empty() {
            "(none)".into()
        } else {
            names.join(", ")
        },
    }
}
