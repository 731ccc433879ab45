use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use super::labels::LabelCache;
use crate::core::config::PrecedencePolicy;
use crate::core::models::{CompactedEntity, EntityUri, Label, ResolutionResult};
use crate::linking::LabelSource;
use crate::text::language::Language;
use crate::text::normalize::normalize;

/// Distinct keyword labels an entity needs to survive `finalize`.
const MIN_CONTRIBUTORS: usize = 2;


#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompactionStats {
    pub entities: usize,
    pub two_labels: usize,
    pub three_labels: usize,
    pub more_labels: usize,
    pub dropped: usize,
}

impl CompactionStats {
    pub fn from_entities(entities: &[CompactedEntity], raw_count: usize) -> Self {
        let mut stats = Self {
            entities: entities.len(),
            dropped: raw_count.saturating_sub(entities.len()),
            ..Default::default()
        };
        for entity in entities {
            match entity.labels.len() {
                0..=2 => stats.two_labels += 1,
                3 => stats.three_labels += 1,
                _ => stats.more_labels += 1,
            }
        }
        stats
    }
}

struct Entry {
    entity: CompactedEntity,
    /// Labels contributed by keywords, as opposed to seeded from the knowledge base.
    contributors: HashSet<Label>,
}


/// Merges per-keyword resolutions into per-URI label sets.
///
/// Runs on the driver task after the batch barrier; nothing here is shared
/// with workers.
pub struct Compactor {
    policy: PrecedencePolicy,
    labels: Option<LabelCache>,
    entries: Vec<Entry>,
    index: HashMap<EntityUri, usize>,
}

impl Compactor {

    pub fn new(policy: PrecedencePolicy) -> Self {
        Self {
            policy,
            labels: None,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }


    /// Seeds each new entity with the labels its knowledge base advertises.
    pub fn with_label_sources(self, sources: Vec<Arc<dyn LabelSource>>) -> Self {
        self.with_label_cache(LabelCache::new(sources))
    }

    pub fn with_label_cache(mut self, cache: LabelCache) -> Self {
        self.labels = Some(cache);
        self
    }

    pub fn policy(&self) -> PrecedencePolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn label_cache(&self) -> Option<&LabelCache> {
        self.labels.as_ref()
    }


    /// Records that `keyword` resolved to `uri`. Returns `false` when the
    /// keyword was dropped for lack of a URI.
    pub async fn add(
        &mut self,
        keyword: &str,
        language: Language,
        uri: Option<&EntityUri>,
    ) -> bool {
        let Some(uri) = uri else {
            debug!("No URI for '{}', dropped from compaction", keyword);
            return false;
        };
        let keyword = normalize(keyword);
        if keyword.is_empty() {
            return false;
        }

        let position = match self.index.get(uri) {
            Some(&position) => position,
            None => {
                let mut entity = CompactedEntity::new(uri.clone());
                if let Some(cache) = self.labels.as_mut() {
                    for label in cache.labels(uri).await {
                        entity.insert_label(label);
                    }
                }
                self.entries.push(Entry {
                    entity,
                    contributors: HashSet::new(),
                });
                self.index.insert(uri.clone(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        let label = Label::new(keyword, language);
        let entry = &mut self.entries[position];
        entry.entity.insert_label(label.clone());
        entry.contributors.insert(label);
        true
    }


    pub async fn add_result(&mut self, result: &ResolutionResult) -> bool {
        let uri = result.chosen_uri(self.policy).cloned();
        self.add(&result.keyword, result.language, uri.as_ref()).await
    }

    pub async fn add_all<'a, I>(&mut self, results: I) -> usize
    where
        I: IntoIterator<Item = &'a ResolutionResult>,
    {
        let mut added = 0;
        for result in results {
            if self.add_result(result).await {
                added += 1;
            }
        }
        added
    }


    /// Every entity seen so far in first-seen order, single-keyword ones included.
    pub fn raw_map(&self) -> impl Iterator<Item = &CompactedEntity> + '_ {
        self.entries.iter().map(|entry| &entry.entity)
    }

    pub fn get(&self, uri: &EntityUri) -> Option<&CompactedEntity> {
        self.index.get(uri).map(|&position| &self.entries[position].entity)
    }


    /// Entities corroborated by at least two distinct keyword labels, in
    /// first-seen order.
    pub fn finalize(&self) -> Vec<CompactedEntity> {
        self.entries
            .iter()
            .filter(|entry| entry.contributors.len() >= MIN_CONTRIBUTORS)
            .map(|entry| entry.entity.clone())
            .collect()
    }
}
