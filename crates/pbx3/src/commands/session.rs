//! login, logout, whoami.

use secrecy::SecretString;
use tracing::warn;

use pbx3_config::{Config, Profile};
use pbx3_core::Console;

use crate::cli::{GlobalOpts, LoginArgs, OutputFormat};
use crate::config::{self, Context};
use crate::error::CliError;
use crate::output;

pub async fn login(
    args: &LoginArgs,
    console: &Console,
    ctx: &Context,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    let token = match global.token {
        Some(ref token) => SecretString::from(token.clone()),
        None => prompt_token()?,
    };

    let user = console
        .login(&ctx.connection.base_url, token.clone())
        .await?;

    if !args.no_save {
        remember(ctx, global, &token)?;
    }

    output::print_output(&output::render_value(format, &user)?, global.quiet);
    Ok(())
}

fn prompt_token() -> Result<SecretString, CliError> {
    let token = rpassword::prompt_password("API token: ").map_err(|e| CliError::Validation {
        field: "token".into(),
        reason: format!("prompt failed: {e}"),
    })?;
    if token.trim().is_empty() {
        return Err(CliError::Validation {
            field: "token".into(),
            reason: "token cannot be empty".into(),
        });
    }
    Ok(SecretString::from(token.trim().to_owned()))
}

/// Store the token in the keyring and the endpoint in the profile.
///
/// A keyring failure is not fatal; the login itself already succeeded.
fn remember(ctx: &Context, global: &GlobalOpts, token: &SecretString) -> Result<(), CliError> {
    if let Err(e) = config::store_token(&ctx.profile_name, token) {
        warn!(profile = %ctx.profile_name, error = %e, "could not store token in keyring");
        if !global.quiet {
            eprintln!("warning: token not saved ({e}); pass --token or set PBX3_TOKEN next time");
        }
    }

    let mut cfg: Config = config::load_config_or_default();
    let profile = cfg
        .profiles
        .entry(ctx.profile_name.clone())
        .or_insert_with(Profile::default);
    profile.base_url.clone_from(&ctx.connection.base_url);
    if global.insecure {
        profile.insecure = Some(true);
    }
    if cfg.profiles.len() == 1 {
        cfg.default_profile = Some(ctx.profile_name.clone());
    }
    config::save_config(&cfg)?;
    Ok(())
}

pub fn logout(global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let profile_name = config::active_profile_name(global, cfg);
    config::clear_token(&profile_name)?;
    if !global.quiet {
        eprintln!("Logged out of profile '{profile_name}'");
    }
    Ok(())
}

pub async fn whoami(
    console: &Console,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    let user = console.whoami().await?;
    output::print_output(&output::render_value(format, &user)?, global.quiet);
    Ok(())
}
