use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::error::ResolutionError;
use super::service::KeywordResolver;
use crate::core::models::{Keyword, ResolutionResult};


#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolutionStats {
    pub total: usize,
    pub both: usize,
    pub graph_only: usize,
    pub annotation_only: usize,
    pub unlinked: usize,
    pub failed: usize,
}


#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub results: Vec<ResolutionResult>,
    /// Normalized keyword and the error that stopped it.
    pub failed: Vec<(String, ResolutionError)>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.results.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn result_for(&self, normalized: &str) -> Option<&ResolutionResult> {
        self.results.iter().find(|result| result.keyword == normalized)
    }

    pub fn stats(&self) -> ResolutionStats {
        let mut stats = ResolutionStats {
            total: self.results.len() + self.failed.len(),
            failed: self.failed.len(),
            ..Default::default()
        };
        for result in &self.results {
            match (result.graph_uri.is_some(), result.annotation_uri.is_some()) {
                (true, true) => stats.both += 1,
                (true, false) => stats.graph_only += 1,
                (false, true) => stats.annotation_only += 1,
                (false, false) => stats.unlinked += 1,
            }
        }
        stats
    }
}


/// Resolves keyword batches on a bounded worker pool.
pub struct BatchResolver {
    resolver: Arc<KeywordResolver>,
    semaphore: Arc<Semaphore>,
    deadline: Option<Duration>,
}

impl BatchResolver {

    pub fn new(resolver: Arc<KeywordResolver>, max_parallel: usize) -> Self {
        let max_parallel = max_parallel.max(1);
        info!("BatchResolver initialized: max_parallel={}", max_parallel);

        Self {
            resolver,
            semaphore: Arc::new(Semaphore::new(max_parallel)),
            deadline: None,
        }
    }


    /// Wall-clock budget for a whole batch. Keywords still pending when it
    /// elapses are reported as [`ResolutionError::Deadline`].
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline.filter(|d| !d.is_zero());
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn resolver(&self) -> &Arc<KeywordResolver> {
        &self.resolver
    }


    pub async fn resolve_batch(&self, keywords: Vec<Keyword>) -> BatchOutcome {
        let submitted = keywords.len();

        let mut seen = HashSet::new();
        let unique: Vec<Keyword> = keywords
            .into_iter()
            .filter(|keyword| !keyword.is_empty() && seen.insert(keyword.normalized.clone()))
            .collect();

        if unique.len() < submitted {
            debug!("Deduplicated: {} -> {} keywords", submitted, unique.len());
        }

        let started = Instant::now();
        let mut handles = Vec::with_capacity(unique.len());

        for keyword in &unique {
            let resolver = self.resolver.clone();
            let semaphore = self.semaphore.clone();
            let keyword = keyword.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| ResolutionError::Worker(e.to_string()))?;
                resolver.resolve(&keyword).await
            }));
        }

        let mut outcome = BatchOutcome::default();

        for (keyword, handle) in unique.iter().zip(handles) {
            let joined = match self.deadline {
                Some(deadline) => {
                    let abort = handle.abort_handle();
                    match tokio::time::timeout_at(started + deadline, handle).await {
                        Ok(joined) => joined,
                        Err(_) => {
                            abort.abort();
                            outcome
                                .failed
                                .push((keyword.normalized.clone(), ResolutionError::Deadline));
                            continue;
                        }
                    }
                }
                None => handle.await,
            };

            match joined {
                Ok(Ok(result)) => outcome.results.push(result),
                Ok(Err(e)) => {
                    warn!("Keyword '{}' failed: {}", keyword.normalized, e);
                    outcome.failed.push((keyword.normalized.clone(), e));
                }
                Err(e) => {
                    outcome.failed.push((
                        keyword.normalized.clone(),
                        ResolutionError::Worker(format!("Task panic: {}", e)),
                    ));
                }
            }
        }

        let stats = outcome.stats();
        info!(
            "Batch resolve complete: {}/{} resolved, {} failed (both={}, graph_only={}, annotation_only={}, unlinked={})",
            outcome.success_count(),
            unique.len(),
            outcome.failure_count(),
            stats.both,
            stats.graph_only,
            stats.annotation_only,
            stats.unlinked
        );

        outcome
    }
}
