//! Opt-in cache of built bundles with build coalescing.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

/// Status of a bundle lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from a previous build.
    Hit,
    /// Built for this request.
    Miss,
    /// Caching disabled.
    Bypass,
}

impl CacheStatus {
    /// Header value form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

type Slot = Arc<OnceCell<Arc<Vec<u8>>>>;

/// In-memory bundle cache keyed by bundle path.
///
/// Concurrent builds of the same key share one build. A failed build leaves
/// the slot empty, so the next request retries.
#[derive(Debug, Default)]
pub struct BuildCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl BuildCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached bundle for `key`, building it with `build` on a miss.
    pub async fn get_or_build<F, Fut, E>(
        &self,
        key: &str,
        build: F,
    ) -> Result<(Arc<Vec<u8>>, CacheStatus), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        let slot = self.slot(key);
        if let Some(bytes) = slot.get() {
            return Ok((Arc::clone(bytes), CacheStatus::Hit));
        }

        let built = AtomicBool::new(false);
        let flag = &built;
        let bytes = slot
            .get_or_try_init(move || async move {
                flag.store(true, Ordering::Relaxed);
                build().await.map(Arc::new)
            })
            .await?;

        let status = if built.load(Ordering::Relaxed) {
            CacheStatus::Miss
        } else {
            CacheStatus::Hit
        };
        Ok((Arc::clone(bytes), status))
    }

    /// Drop every cached bundle.
    pub fn clear(&self) {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Number of keys with a completed build.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Whether no build has completed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.to_string()).or_default())
    }
}
