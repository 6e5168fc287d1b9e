// ── Single-flight schema cache ──
//
// At most one `GET schemas` is outstanding at a time. Concurrent callers
// share the in-flight future and observe the same outcome. The fetch runs on
// its own task, so callers that give up early don't stall it. Success is
// cached until `reset`; failure clears the slot so the next caller retries.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use arc_swap::ArcSwapOption;
use futures::FutureExt;
use futures::future::Shared;
use pbx3_api::ApiClient;
use tracing::{debug, info, warn};

use super::{ResourceSchema, SCHEMAS_PATH, SchemaMap};
use crate::error::CoreError;

type FetchResult = Result<Arc<SchemaMap>, Arc<pbx3_api::Error>>;
type SchemaFuture = Pin<Box<dyn Future<Output = FetchResult> + Send>>;
type InFlight = Shared<SchemaFuture>;

/// Where the cache is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Fetching,
    Ready,
}

/// Process-wide cache of resource schemas.
///
/// Cheaply cloneable; clones share the same snapshot and in-flight slot.
#[derive(Clone)]
pub struct SchemaCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    client: ApiClient,
    snapshot: ArcSwapOption<SchemaMap>,
    in_flight: Mutex<Option<InFlight>>,
    last_error: ArcSwapOption<pbx3_api::Error>,
    /// Bumped by `reset`; a fetch started under an older epoch must not
    /// publish its result.
    epoch: AtomicU64,
}

impl SchemaCache {
    pub fn new(client: ApiClient) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                client,
                snapshot: ArcSwapOption::empty(),
                in_flight: Mutex::new(None),
                last_error: ArcSwapOption::empty(),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Return the cached schemas, fetching them first if needed.
    ///
    /// If a fetch is already running, this awaits that fetch instead of
    /// issuing another request. Must be called within a tokio runtime.
    pub async fn ensure_loaded(&self) -> Result<Arc<SchemaMap>, CoreError> {
        if let Some(map) = self.inner.snapshot.load_full() {
            return Ok(map);
        }

        let fetch = {
            let mut slot = self.inner.lock_slot();
            // A fetch may have completed between the fast path and the lock.
            if let Some(map) = self.inner.snapshot.load_full() {
                return Ok(map);
            }
            match slot.as_ref() {
                Some(existing) => {
                    debug!("joining in-flight schema fetch");
                    existing.clone()
                }
                None => {
                    let fetch = self.start_fetch();
                    *slot = Some(fetch.clone());
                    fetch
                }
            }
        };

        fetch.await.map_err(|source| CoreError::SchemaFetch { source })
    }

    /// Drop the cached schemas and abandon any in-flight fetch.
    ///
    /// Callers already awaiting the abandoned fetch still receive its result,
    /// but it is not stored.
    pub fn reset(&self) {
        let mut slot = self.inner.lock_slot();
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        *slot = None;
        self.inner.snapshot.store(None);
        self.inner.last_error.store(None);
        debug!("schema cache reset");
    }

    pub fn state(&self) -> CacheState {
        if self.inner.snapshot.load().is_some() {
            CacheState::Ready
        } else if self.inner.lock_slot().is_some() {
            CacheState::Fetching
        } else {
            CacheState::Empty
        }
    }

    /// The error from the most recent failed fetch, cleared on success or reset.
    pub fn last_error(&self) -> Option<Arc<pbx3_api::Error>> {
        self.inner.last_error.load_full()
    }

    /// The cached schemas, without triggering a fetch.
    pub fn snapshot(&self) -> Option<Arc<SchemaMap>> {
        self.inner.snapshot.load_full()
    }

    /// Schema for one resource. `None` if not loaded or unknown.
    pub fn get_schema(&self, resource: &str) -> Option<Arc<ResourceSchema>> {
        self.snapshot().and_then(|map| map.get(resource).cloned())
    }

    /// Overwrite form fields with the resource's non-empty defaults.
    ///
    /// Fields without a usable default are left alone. Returns how many
    /// fields were changed. Does nothing if the schemas aren't loaded.
    pub fn apply_defaults<'f, I>(&self, resource: &str, fields: I) -> usize
    where
        I: IntoIterator<Item = (&'f str, &'f mut String)>,
    {
        let Some(schema) = self.get_schema(resource) else {
            return 0;
        };
        let mut applied = 0;
        for (field, target) in fields {
            if let Some(text) = schema.default_text(field) {
                *target = text;
                applied += 1;
            }
        }
        applied
    }

    fn start_fetch(&self) -> InFlight {
        let client = self.inner.client.clone();
        let owner = Arc::downgrade(&self.inner);
        let epoch = self.inner.epoch.load(Ordering::SeqCst);

        let fetch: SchemaFuture = Box::pin(async move {
            debug!("fetching resource schemas");
            let result = client
                .get(SCHEMAS_PATH)
                .await
                .and_then(SchemaMap::from_payload)
                .map(Arc::new)
                .map_err(Arc::new);
            CacheInner::finish(&owner, epoch, &result);
            result
        });
        let fetch = fetch.shared();

        // Drive the fetch to completion even if every caller stops awaiting it.
        let driver = fetch.clone();
        tokio::spawn(async move {
            let _ = driver.await;
        });
        fetch
    }
}

impl CacheInner {
    fn lock_slot(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(owner: &Weak<Self>, epoch: u64, result: &FetchResult) {
        let Some(inner) = owner.upgrade() else {
            return;
        };
        let mut slot = inner.lock_slot();
        if inner.epoch.load(Ordering::SeqCst) != epoch {
            debug!("discarding schema fetch started before reset");
            return;
        }
        match result {
            Ok(map) => {
                inner.snapshot.store(Some(Arc::clone(map)));
                inner.last_error.store(None);
                info!(resources = map.len(), "schema metadata loaded");
            }
            Err(e) => {
                inner.last_error.store(Some(Arc::clone(e)));
                warn!(error = %e, "schema fetch failed");
            }
        }
        *slot = None;
    }
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
