use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::debug;

use super::error::ResolutionError;
use super::service::RetryPolicy;
use crate::core::models::EntityUri;
use crate::linking::EntityLinker;
use crate::text::language::Language;


/// Memoized outcome of one lookup. `NoMatch` is remembered like a hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedResolution {
    Linked(EntityUri),
    NoMatch,
}

impl CachedResolution {
    pub fn uri(&self) -> Option<&EntityUri> {
        match self {
            Self::Linked(uri) => Some(uri),
            Self::NoMatch => None,
        }
    }
}

impl From<Option<EntityUri>> for CachedResolution {
    fn from(uri: Option<EntityUri>) -> Self {
        uri.map_or(Self::NoMatch, Self::Linked)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub no_matches: usize,
    pub size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}


/// Label to resolution memo shared by every worker of a run.
///
/// Each label gets its own cell, so concurrent callers for the same label
/// wait on a single lookup instead of racing. Entries are never evicted;
/// failed lookups leave the cell empty and the next caller tries again.
pub struct ResolutionCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<CachedResolution>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// `None` when the label has never been resolved successfully.
    pub fn get(&self, label: &str) -> Option<CachedResolution> {
        let entries = self.entries.lock();
        entries.get(label).and_then(|cell| cell.get().cloned())
    }

    /// Cached outcome for `label`, or the outcome of `resolve(language)` on a miss.
    /// The key is the label alone.
    pub async fn get_or_resolve<F, Fut, E>(
        &self,
        label: &str,
        language: Language,
        resolve: F,
    ) -> Result<Option<EntityUri>, E>
    where
        F: FnOnce(Language) -> Fut,
        Fut: Future<Output = Result<Option<EntityUri>, E>>,
    {
        let cell = {
            let mut entries = self.entries.lock();
            Arc::clone(entries.entry(label.to_string()).or_default())
        };

        let ran = AtomicBool::new(false);
        let cached = cell
            .get_or_try_init(|| async {
                ran.store(true, Ordering::Relaxed);
                resolve(language).await.map(CachedResolution::from)
            })
            .await?;

        if ran.load(Ordering::Relaxed) {
            self.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit for '{}' ({})", label, language);
        }

        Ok(cached.uri().cloned())
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        let resolved: Vec<&CachedResolution> =
            entries.values().filter_map(|cell| cell.get()).collect();

        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            no_matches: resolved
                .iter()
                .filter(|entry| matches!(entry, CachedResolution::NoMatch))
                .count(),
            size: resolved.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.stats().size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}


/// An [`EntityLinker`] behind its own [`ResolutionCache`], retried on transient errors.
pub struct CachedLinker {
    inner: Arc<dyn EntityLinker>,
    cache: ResolutionCache,
}

impl CachedLinker {
    pub fn new(inner: Arc<dyn EntityLinker>) -> Self {
        Self {
            inner,
            cache: ResolutionCache::new(),
        }
    }

    pub fn service_name(&self) -> &'static str {
        self.inner.service_name()
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub async fn resolve(
        &self,
        label: &str,
        language: Language,
        retry: &RetryPolicy,
    ) -> Result<Option<EntityUri>, ResolutionError> {
        let service = self.inner.service_name();
        self.cache
            .get_or_resolve(label, language, |language| {
                retry.run(service, move || self.inner.resolve(label, language))
            })
            .await
    }
}
