use reqwest::{Method, StatusCode};
use thiserror::Error;

/// Top-level error type for the `pbx3-api` crate.
///
/// Covers every failure mode of the transport pipeline: network, HTTP
/// status, session expiry, and request construction. `pbx3-core` wraps
/// these; the CLI maps them into diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// No response was received (DNS failure, connection refused, TLS, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// TLS configuration could not be applied to the HTTP client.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── HTTP status ─────────────────────────────────────────────────
    /// The server answered with a non-success status.
    #[error("{}", .0.message)]
    Http(Box<TransportFailure>),

    /// The server answered 401. The session provider has already been
    /// invalidated and asked to redirect to login.
    #[error("session expired -- {}", .0.message)]
    SessionExpired(Box<TransportFailure>),

    // ── Request construction ────────────────────────────────────────
    /// Base endpoint + path did not form a valid URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Query mapping contained a value that cannot be form-encoded.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Request body failed to serialize to JSON.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// Bearer token contains characters not allowed in a header value.
    #[error("invalid bearer token: {0}")]
    InvalidToken(String),

    // ── Data ────────────────────────────────────────────────────────
    /// Typed decoding of a payload failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// The normalized HTTP failure, if this error carries one.
    pub fn failure(&self) -> Option<&TransportFailure> {
        match self {
            Self::Http(failure) | Self::SessionExpired(failure) => Some(failure),
            _ => None,
        }
    }

    /// HTTP status code, if a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        self.failure().map(|f| f.status)
    }

    /// Returns `true` if the server rejected our credentials.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }

    /// Returns `true` if this is a "not found" response.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Http(failure) => {
                failure.status.is_server_error() || failure.status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

/// A non-success HTTP outcome, normalized.
///
/// Carries the raw body and, when it parses, the JSON body, so callers can
/// pull out field-level validation messages without this crate knowing
/// any resource-specific error shape.
#[derive(Debug, Clone)]
pub struct TransportFailure {
    pub method: Method,
    pub path: String,
    pub status: StatusCode,
    pub raw_body: String,
    pub parsed_body: Option<serde_json::Value>,
    pub message: String,
}

impl TransportFailure {
    pub fn new(method: Method, path: &str, status: StatusCode, raw_body: String) -> Self {
        let parsed_body = serde_json::from_str(&raw_body).ok();
        let reason = status.canonical_reason().unwrap_or_default();
        let message = format!("API {method} {path}: {} {reason}", status.as_u16())
            .trim_end()
            .to_owned();
        Self {
            method,
            path: path.to_owned(),
            status,
            raw_body,
            parsed_body,
            message,
        }
    }
}
