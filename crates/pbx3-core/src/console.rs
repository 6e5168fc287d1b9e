// ── Console facade ──
//
// Owns the session store, the transport client built over it, and the
// schema cache. Login and logout go through here so the cache never
// outlives the session it was loaded under.

use std::sync::Arc;

use pbx3_api::{ApiClient, SecretString, SessionEvent, SessionProvider, SessionStore, TransportConfig};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::error::CoreError;
use crate::list::normalize_list;
use crate::schema::SchemaCache;

const WHOAMI_PATH: &str = "auth/whoami";

/// Entry point for consumers of the admin API.
///
/// Cheaply cloneable; clones share one session, client, and schema cache.
#[derive(Clone)]
pub struct Console {
    inner: Arc<ConsoleInner>,
}

struct ConsoleInner {
    session: Arc<SessionStore>,
    client: ApiClient,
    schemas: SchemaCache,
}

impl Console {
    /// A logged-out console. Call [`login`](Self::login) before making requests.
    pub fn new(transport: &TransportConfig) -> Result<Self, CoreError> {
        let session = SessionStore::new().shared();
        let provider: Arc<dyn SessionProvider> = session.clone();
        let client = ApiClient::from_session(provider, transport)?;
        let schemas = SchemaCache::new(client.clone());
        Ok(Self {
            inner: Arc::new(ConsoleInner {
                session,
                client,
                schemas,
            }),
        })
    }

    /// A console seeded with the endpoint and token from `config`.
    ///
    /// The token is not verified; the first request that gets a 401 will
    /// clear it.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, CoreError> {
        let console = Self::new(&config.transport())?;
        console
            .inner
            .session
            .set_credentials(config.base_url.clone(), config.token.clone());
        Ok(console)
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Set credentials and verify them with `GET auth/whoami`.
    ///
    /// On success the identity is recorded and returned. On any failure the
    /// credentials are cleared again.
    pub async fn login(&self, base_url: &str, token: SecretString) -> Result<Value, CoreError> {
        let session = &self.inner.session;
        session.set_credentials(base_url, Some(token));
        self.inner.schemas.reset();

        match self.inner.client.get(WHOAMI_PATH).await {
            Ok(payload) => {
                let user = payload.into_json();
                session.set_user(Some(user.clone()));
                info!(base_url, "logged in");
                Ok(user)
            }
            Err(e) => {
                // A 401 has already invalidated the session.
                if !e.is_auth_expired() {
                    session.invalidate();
                }
                warn!(base_url, error = %e, "login failed");
                Err(e.into())
            }
        }
    }

    /// Clear credentials and drop cached schemas.
    pub fn logout(&self) {
        self.inner.session.invalidate();
        self.inner.schemas.reset();
        debug!("logged out");
    }

    /// Refresh and return the identity behind the current token.
    pub async fn whoami(&self) -> Result<Value, CoreError> {
        if !self.is_logged_in() {
            return Err(CoreError::NotLoggedIn);
        }
        let user = self.inner.client.get(WHOAMI_PATH).await?.into_json();
        self.inner.session.set_user(Some(user.clone()));
        Ok(user)
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.session.is_logged_in()
    }

    /// Identity recorded by the last successful login or `whoami`.
    pub fn user(&self) -> Option<Value> {
        self.inner.session.user()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.session.subscribe()
    }

    // ── Data access ──────────────────────────────────────────────────

    /// `GET path` and flatten the response with [`normalize_list`].
    pub async fn list(&self, path: &str, key: Option<&str>) -> Result<Vec<Value>, CoreError> {
        let payload = self.inner.client.get(path).await?;
        Ok(normalize_list(&payload.into_json(), key))
    }

    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    pub fn schemas(&self) -> &SchemaCache {
        &self.inner.schemas
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("session", &self.inner.session)
            .field("schemas", &self.inner.schemas)
            .finish_non_exhaustive()
    }
}
