// ── Runtime connection configuration ──
//
// Describes how to reach a PBX3 admin API. Carries credentials and
// connection tuning but never touches disk; the CLI builds one from a
// profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use pbx3_api::{TlsMode, TransportConfig};
use secrecy::SecretString;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. For appliances with self-signed certificates.
    DangerAcceptInvalid,
}

/// Configuration for one admin API endpoint.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Base endpoint, e.g. `https://pbx.example.com/api`.
    pub base_url: String,
    /// Bearer token. `None` means requests go out unauthenticated.
    pub token: Option<SecretString>,
    pub tls: TlsVerification,
    pub timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig::default()
            .with_tls(tls)
            .with_timeout(self.timeout)
    }
}
