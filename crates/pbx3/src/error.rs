//! CLI error types with miette diagnostics.
//!
//! Maps transport, core, and config errors into user-facing errors with
//! actionable help text.

use std::fmt::Write as _;

use miette::Diagnostic;
use thiserror::Error;

use pbx3_api::StatusCode;
use pbx3_config::ConfigError;
use pbx3_core::{CoreError, field_errors, first_error_message};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(pbx3::connection_failed),
        help(
            "Check that the PBX is running and reachable.\n\
             Reason: {reason}\n\
             Try: pbx3 whoami --insecure"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("TLS setup failed: {reason}")]
    #[diagnostic(
        code(pbx3::tls_error),
        help(
            "PBX appliances often use a self-signed certificate.\n\
             Use --insecure (-k) to accept it, or configure ca_cert in your profile."
        )
    )]
    TlsError { reason: String },

    #[error("Request to {url} timed out")]
    #[diagnostic(
        code(pbx3::timeout),
        help("Increase timeout with --timeout or check PBX responsiveness.")
    )]
    Timeout { url: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Session expired or token rejected")]
    #[diagnostic(
        code(pbx3::session_expired),
        help("Log in again with: pbx3 login --profile {profile}")
    )]
    SessionExpired { profile: String },

    #[error("Not logged in")]
    #[diagnostic(
        code(pbx3::not_logged_in),
        help(
            "Log in with: pbx3 login --profile {profile}\n\
             Or pass --token / set PBX3_TOKEN."
        )
    )]
    NotLoggedIn { profile: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(pbx3::not_found), help("Path: {path}"))]
    NotFound { path: String, message: String },

    #[error("API error ({status}): {message}")]
    #[diagnostic(code(pbx3::api_error))]
    ApiError {
        status: u16,
        message: String,
        #[help]
        details: Option<String>,
    },

    #[error("Unexpected response: {message}")]
    #[diagnostic(code(pbx3::unexpected_response))]
    UnexpectedResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(pbx3::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(pbx3::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: pbx3 login --base-url <URL> --profile {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No API endpoint configured")]
    #[diagnostic(
        code(pbx3::no_config),
        help(
            "Pass --base-url (or set PBX3_BASE_URL), or log in to create a profile.\n\
             Config file: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(pbx3::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(pbx3::json), help("Check the JSON body and try again."))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render output: {0}")]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::SessionExpired { .. } | Self::NotLoggedIn { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::ApiError { status: 403, .. } => exit_code::PERMISSION,
            Self::ApiError { status: 409, .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Fill in the profile name on auth errors raised below the CLI layer.
    pub fn for_profile(self, name: &str) -> Self {
        match self {
            Self::SessionExpired { .. } => Self::SessionExpired {
                profile: name.to_owned(),
            },
            Self::NotLoggedIn { .. } => Self::NotLoggedIn {
                profile: name.to_owned(),
            },
            other => other,
        }
    }

    /// Translate a transport error. Takes a reference because schema fetch
    /// failures are shared between callers.
    pub fn from_api(err: &pbx3_api::Error) -> Self {
        use pbx3_api::Error as Api;

        match err {
            Api::Network(e) => {
                let url = e.url().map(ToString::to_string).unwrap_or_default();
                if e.is_timeout() {
                    Self::Timeout { url }
                } else {
                    Self::ConnectionFailed {
                        url,
                        reason: err.to_string(),
                    }
                }
            }
            Api::Tls(reason) => Self::TlsError {
                reason: reason.clone(),
            },
            Api::SessionExpired(_) => Self::SessionExpired {
                profile: "current".into(),
            },
            Api::Http(failure) if failure.status == StatusCode::NOT_FOUND => Self::NotFound {
                path: failure.path.clone(),
                message: first_error_message(err, "Not found"),
            },
            Api::Http(failure) => Self::ApiError {
                status: failure.status.as_u16(),
                message: first_error_message(err, &failure.message),
                details: field_details(err),
            },
            Api::InvalidUrl(e) => Self::Validation {
                field: "url".into(),
                reason: e.to_string(),
            },
            Api::InvalidQuery(reason) => Self::Validation {
                field: "query".into(),
                reason: reason.clone(),
            },
            Api::Encode(e) => Self::Validation {
                field: "body".into(),
                reason: e.to_string(),
            },
            Api::InvalidToken(reason) => Self::Validation {
                field: "token".into(),
                reason: reason.clone(),
            },
            Api::Deserialization { message, .. } => Self::UnexpectedResponse {
                message: message.clone(),
            },
        }
    }
}

/// Every field error, one `field: message` per line.
fn field_details(err: &pbx3_api::Error) -> Option<String> {
    let errors = field_errors(err)?;
    let mut out = String::new();
    for (field, messages) in errors {
        for message in messages {
            let _ = writeln!(out, "{field}: {message}");
        }
    }
    Some(out.trim_end().to_owned())
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<pbx3_api::Error> for CliError {
    fn from(err: pbx3_api::Error) -> Self {
        Self::from_api(&err)
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Api(e) => Self::from_api(&e),
            CoreError::SchemaFetch { source } => Self::from_api(&source),
            CoreError::NotLoggedIn => Self::NotLoggedIn {
                profile: "current".into(),
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NotLoggedIn { profile },
            other => Self::Config(Box::new(other)),
        }
    }
}
