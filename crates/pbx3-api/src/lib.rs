// pbx3-api: Async Rust client for the PBX3 administration API
//
// Bearer-token transport with a text-first decode policy and session-expiry
// handling. Credentials come from a `SessionProvider`, never from globals.

pub mod client;
pub mod error;
pub mod session;
pub mod transport;

pub use client::{ApiClient, Payload, decode_text};
pub use error::{Error, TransportFailure};
pub use session::{Session, SessionEvent, SessionProvider, SessionStore};
pub use transport::{TlsMode, TransportConfig};

// Re-exported so consumers can match on statuses and build sessions
// without pinning their own reqwest/secrecy versions.
pub use reqwest::{Method, StatusCode};
pub use secrecy::{ExposeSecret, SecretString};
