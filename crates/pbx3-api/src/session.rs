// Session provider abstraction
//
// The transport client never owns credentials. It reads the base endpoint
// and bearer token from a `SessionProvider` on every call and, on 401,
// asks the provider to invalidate itself and route the user back to login.

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::SecretString;
use tokio::sync::broadcast;
use tracing::debug;

const EVENT_CHANNEL_SIZE: usize = 16;

/// Narrow interface the transport client consumes.
///
/// Implementations must tolerate `invalidate` being called repeatedly,
/// including concurrently from several failed requests.
pub trait SessionProvider: Send + Sync {
    /// Base endpoint, e.g. `https://pbx.example:44300/api`. Empty when logged out.
    fn base_endpoint(&self) -> String;

    /// Current bearer token, if authenticated.
    fn token(&self) -> Option<SecretString>;

    /// Clear endpoint and token.
    fn invalidate(&self);

    /// Send the application to its login entry point.
    fn on_login_redirect(&self);
}

/// Credentials held by a [`SessionStore`].
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub base_endpoint: String,
    pub token: Option<SecretString>,
    /// Identity returned by `auth/whoami`, once known.
    pub user: Option<serde_json::Value>,
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }
}

/// Lifecycle notifications broadcast by [`SessionStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials were set or replaced.
    CredentialsChanged,
    /// Credentials were cleared.
    Invalidated,
    /// Consumers should navigate to the login surface.
    LoginRequired,
}

/// Default in-memory session provider.
///
/// Login redirects are published as [`SessionEvent::LoginRequired`] on a
/// broadcast channel; whatever owns navigation subscribes and acts on it.
pub struct SessionStore {
    state: RwLock<Session>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// An empty, logged-out store.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            state: RwLock::new(Session::default()),
            events,
        }
    }

    /// A store pre-populated with credentials.
    pub fn with_credentials(base_endpoint: impl Into<String>, token: Option<SecretString>) -> Self {
        let store = Self::new();
        store.write(|session| {
            session.base_endpoint = base_endpoint.into();
            session.token = token;
        });
        store
    }

    /// Convenience for wrapping in the `Arc<dyn SessionProvider>` the client takes.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Replace the endpoint and token. Clears any previously recorded user.
    pub fn set_credentials(&self, base_endpoint: impl Into<String>, token: Option<SecretString>) {
        self.write(|session| {
            session.base_endpoint = base_endpoint.into();
            session.token = token;
            session.user = None;
        });
        debug!("session credentials updated");
        let _ = self.events.send(SessionEvent::CredentialsChanged);
    }

    pub fn set_user(&self, user: Option<serde_json::Value>) {
        self.write(|session| session.user = user);
    }

    pub fn user(&self) -> Option<serde_json::Value> {
        self.read(|session| session.user.clone())
    }

    pub fn is_logged_in(&self) -> bool {
        self.read(Session::is_logged_in)
    }

    /// A copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.read(Clone::clone)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write(&self, f: impl FnOnce(&mut Session)) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl SessionProvider for SessionStore {
    fn base_endpoint(&self) -> String {
        self.read(|session| session.base_endpoint.clone())
    }

    fn token(&self) -> Option<SecretString> {
        self.read(|session| session.token.clone())
    }

    fn invalidate(&self) {
        self.write(|session| *session = Session::default());
        debug!("session invalidated");
        let _ = self.events.send(SessionEvent::Invalidated);
    }

    fn on_login_redirect(&self) {
        let _ = self.events.send(SessionEvent::LoginRequired);
    }
}
