use std::collections::HashMap;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::core::models::{EntityUri, Label};
use crate::linking::{LabelSource, LinkingError};


/// URI-keyed cache of knowledge-base labels. Each URI is fetched at most once,
/// failures and timeouts included.
pub struct LabelCache {
    sources: Vec<Arc<dyn LabelSource>>,
    fetched: HashMap<EntityUri, Vec<Label>>,
    failures: usize,
    deadline: Option<Instant>,
}

impl LabelCache {
    pub fn new(sources: Vec<Arc<dyn LabelSource>>) -> Self {
        Self {
            sources,
            fetched: HashMap::new(),
            failures: 0,
            deadline: None,
        }
    }

    /// Fetches still pending at `deadline` are abandoned and count as failures.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn len(&self) -> usize {
        self.fetched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetched.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub async fn labels(&mut self, uri: &EntityUri) -> Vec<Label> {
        if let Some(labels) = self.fetched.get(uri) {
            return labels.clone();
        }

        let labels = match self.sources.iter().find(|source| source.handles(uri)) {
            Some(source) => {
                let fetched = match self.deadline {
                    Some(deadline) => tokio::time::timeout_at(deadline, source.labels(uri))
                        .await
                        .unwrap_or(Err(LinkingError::Deadline {
                            service: source.service_name(),
                        })),
                    None => source.labels(uri).await,
                };
                match fetched {
                    Ok(labels) => {
                        debug!(
                            "{} labels for {} from {}",
                            labels.len(),
                            uri,
                            source.service_name()
                        );
                        labels
                    }
                    Err(e) => {
                        warn!("Label fetch for {} failed, continuing unseeded: {}", uri, e);
                        self.failures += 1;
                        Vec::new()
                    }
                }
            }
            None => {
                debug!("No label source handles {}", uri);
                Vec::new()
            }
        };

        self.fetched.insert(uri.clone(), labels.clone());
        labels
    }
}
