// ── Core error types ──
//
// Errors surfaced by pbx3-core. Transport failures pass through intact so
// callers can still reach the status code and response bodies.

use std::sync::Arc;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A request through the transport client failed.
    #[error(transparent)]
    Api(#[from] pbx3_api::Error),

    /// The shared schema fetch failed. Every caller awaiting that fetch
    /// receives the same underlying error.
    #[error("schema fetch failed: {source}")]
    SchemaFetch {
        #[source]
        source: Arc<pbx3_api::Error>,
    },

    /// An operation needs credentials and none are set.
    #[error("not logged in")]
    NotLoggedIn,
}

impl CoreError {
    /// The transport error behind this failure, if any.
    pub fn api_error(&self) -> Option<&pbx3_api::Error> {
        match self {
            Self::Api(err) => Some(err),
            Self::SchemaFetch { source } => Some(source.as_ref()),
            Self::NotLoggedIn => None,
        }
    }

    /// Returns `true` if the server rejected the session (401).
    pub fn is_auth_expired(&self) -> bool {
        self.api_error().is_some_and(pbx3_api::Error::is_auth_expired)
    }
}
