use std::sync::Arc;

use tokio::time::Instant;
use tracing::info;

use super::compaction::{CompactionStats, Compactor, LabelCache};
use super::resolution::{BatchOutcome, BatchResolver, CacheStats};
use crate::core::config::PrecedencePolicy;
use crate::core::models::{CompactedEntity, Keyword};
use crate::linking::LabelSource;


#[derive(Debug)]
pub struct PipelineReport {
    pub outcome: BatchOutcome,
    /// Every entity any keyword resolved to, before the corroboration filter.
    pub raw: Vec<CompactedEntity>,
    pub compacted: Vec<CompactedEntity>,
    pub stats: CompactionStats,
    pub graph_cache: Option<CacheStats>,
    pub annotation_cache: Option<CacheStats>,
    /// Entities whose knowledge-base labels could not be fetched.
    pub unseeded: usize,
}


/// Resolve-then-compact over one batch. The aggregate is rebuilt from
/// scratch on every run. The batch deadline covers the whole run, label
/// seeding included.
pub struct LinkingPipeline {
    batch: BatchResolver,
    policy: PrecedencePolicy,
    label_sources: Vec<Arc<dyn LabelSource>>,
}

impl LinkingPipeline {
    pub fn new(
        batch: BatchResolver,
        policy: PrecedencePolicy,
        label_sources: Vec<Arc<dyn LabelSource>>,
    ) -> Self {
        Self {
            batch,
            policy,
            label_sources,
        }
    }

    pub fn policy(&self) -> PrecedencePolicy {
        self.policy
    }

    pub fn batch(&self) -> &BatchResolver {
        &self.batch
    }

    fn compactor(&self, deadline: Option<Instant>) -> Compactor {
        let compactor = Compactor::new(self.policy);
        if self.label_sources.is_empty() {
            compactor
        } else {
            compactor.with_label_cache(
                LabelCache::new(self.label_sources.clone()).with_deadline(deadline),
            )
        }
    }

    pub async fn run(&self, keywords: Vec<Keyword>) -> PipelineReport {
        info!("Linking pipeline started: {} keywords", keywords.len());
        let deadline = self.batch.deadline().map(|deadline| Instant::now() + deadline);

        let outcome = self.batch.resolve_batch(keywords).await;

        let mut compactor = self.compactor(deadline);
        compactor.add_all(&outcome.results).await;

        let raw: Vec<CompactedEntity> = compactor.raw_map().cloned().collect();
        let compacted = compactor.finalize();
        let stats = CompactionStats::from_entities(&compacted, raw.len());
        let unseeded = compactor.label_cache().map_or(0, LabelCache::failures);

        info!(
            "Compaction complete: {} entities kept, {} dropped (2 labels={}, 3 labels={}, more={}), {} unseeded",
            stats.entities,
            stats.dropped,
            stats.two_labels,
            stats.three_labels,
            stats.more_labels,
            unseeded
        );

        let resolver = self.batch.resolver();
        let graph_cache = resolver.graph_cache_stats();
        let annotation_cache = resolver.annotation_cache_stats();
        for (name, cache) in [("graph", &graph_cache), ("annotation", &annotation_cache)] {
            if let Some(cache) = cache {
                info!(
                    "{} cache: {} entries, {} no-match, hit rate {:.1}%",
                    name,
                    cache.size,
                    cache.no_matches,
                    cache.hit_rate() * 100.0
                );
            }
        }

        info!(
            "Linking pipeline complete: {} resolved, {} failed, {} raw entities, {} compacted",
            outcome.success_count(),
            outcome.failure_count(),
            raw.len(),
            compacted.len()
        );

        PipelineReport {
            outcome,
            raw,
            compacted,
            stats,
            graph_cache,
            annotation_cache,
            unseeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Label;
    use crate::core::services::resolution::{KeywordResolver, RetryPolicy};
    use crate::linking::testing::{ScriptedLinker, StaticLabels};
    use crate::text::language::Language;
    use std::time::Duration;

    const SEMANTIC_WEB_QID: &str = "http://www.wikidata.org/entity/Q54837";
    const THINK_ALOUD_QID: &str = "http://www.wikidata.org/entity/Q1480645";
    const E_LEARNING_DBR: &str = "http://dbpedia.org/resource/Educational_technology";

    fn pipeline(label_sources: Vec<Arc<dyn LabelSource>>) -> LinkingPipeline {
        let graph = ScriptedLinker::new("wikidata")
            .answer("semantic web", SEMANTIC_WEB_QID)
            .answer("web semàntica", SEMANTIC_WEB_QID)
            .answer("web semántica", SEMANTIC_WEB_QID)
            .answer("thinking aloud", THINK_ALOUD_QID)
            .fail_permanently("broken keyword");
        let annotation = ScriptedLinker::new("spotlight")
            .fail_permanently("broken keyword")
            .answer("e-learning", E_LEARNING_DBR)
            .answer("aprendizaje electrónico", E_LEARNING_DBR);

        let resolver = KeywordResolver::new()
            .with_graph(Arc::new(graph))
            .with_annotation(Arc::new(annotation))
            .with_retry(RetryPolicy::new(1, Duration::from_millis(1)));
        let batch = BatchResolver::new(Arc::new(resolver), 4);
        LinkingPipeline::new(batch, PrecedencePolicy::GraphFirst, label_sources)
    }

    fn keywords() -> Vec<Keyword> {
        vec![
            Keyword::new("semantic web", "r1").with_language(Language::En),
            Keyword::new("web semàntica", "r2").with_language(Language::Ca),
            Keyword::new("web semántica", "r3").with_language(Language::Es),
            Keyword::new("thinking aloud", "r4").with_language(Language::En),
            Keyword::new("e-learning", "r5").with_language(Language::En),
            Keyword::new("aprendizaje electrónico", "r6").with_language(Language::Es),
            Keyword::new("broken keyword", "r7").with_language(Language::En),
            Keyword::new("zzzz", "r8").with_language(Language::En),
        ]
    }

    #[tokio::test]
    async fn test_run_resolves_and_compacts() {
        let report = pipeline(Vec::new()).run(keywords()).await;

        assert_eq!(report.outcome.success_count(), 7);
        assert_eq!(report.outcome.failure_count(), 1);
        assert_eq!(report.raw.len(), 3);

        let uris: Vec<&str> = report.compacted.iter().map(|e| e.uri.as_str()).collect();
        assert_eq!(uris, vec![SEMANTIC_WEB_QID, E_LEARNING_DBR]);
        assert_eq!(report.compacted[0].labels.len(), 3);
        assert_eq!(report.stats.dropped, 1);
        assert_eq!(report.stats.three_labels, 1);
        assert_eq!(report.stats.two_labels, 1);
        assert_eq!(report.unseeded, 0);

        let graph_cache = report.graph_cache.unwrap();
        assert_eq!(graph_cache.misses, 7);
        assert_eq!(graph_cache.hits, 0);
        assert_eq!(graph_cache.hit_rate(), 0.0);
        assert!(report.annotation_cache.is_some());
    }

    #[tokio::test]
    async fn test_throttled_label_source_is_bounded_by_deadline() {
        use crate::linking::testing::serve;
        use crate::linking::WikidataClient;
        use axum::http::StatusCode;
        use axum::routing::get;
        use axum::Router;

        let router = Router::new().route(
            "/w/api.php",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "1")], "slow down") }),
        );
        let base = serve(router).await;
        let labels = WikidataClient::new(&base, Duration::from_secs(5)).unwrap();

        let graph = ScriptedLinker::new("wikidata")
            .answer("semantic web", SEMANTIC_WEB_QID)
            .answer("web semàntica", SEMANTIC_WEB_QID);
        let resolver = KeywordResolver::new().with_graph(Arc::new(graph));
        let batch = BatchResolver::new(Arc::new(resolver), 2)
            .with_deadline(Some(Duration::from_millis(200)));
        let pipeline = LinkingPipeline::new(
            batch,
            PrecedencePolicy::GraphFirst,
            vec![Arc::new(labels) as Arc<dyn LabelSource>],
        );

        let keywords = vec![
            Keyword::new("semantic web", "r1").with_language(Language::En),
            Keyword::new("web semàntica", "r2").with_language(Language::Ca),
        ];
        let report = tokio::time::timeout(Duration::from_secs(3), pipeline.run(keywords))
            .await
            .expect("run must finish once the deadline passes");

        assert_eq!(report.unseeded, 1);
        assert_eq!(report.compacted.len(), 1);
        assert_eq!(report.compacted[0].labels.len(), 2);
    }

    #[tokio::test]
    async fn test_run_seeds_from_label_sources() {
        let source = Arc::new(StaticLabels::new("http://dbpedia.org/").with(
            E_LEARNING_DBR,
            vec![Label::new("educational technology", Language::En)],
        ));
        let report = pipeline(vec![source.clone() as Arc<dyn LabelSource>])
            .run(keywords())
            .await;

        let e_learning = report
            .compacted
            .iter()
            .find(|entity| entity.uri.as_str() == E_LEARNING_DBR)
            .unwrap();
        assert_eq!(e_learning.labels[0], Label::new("educational technology", Language::En));
        assert_eq!(e_learning.labels.len(), 3);
        assert_eq!(source.fetch_count(E_LEARNING_DBR), 1);
    }
}
