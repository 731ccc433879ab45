use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::core::config::LexilinkConfig;
use crate::core::error::Result;
use crate::core::services::{BatchResolver, KeywordResolver, LinkingPipeline, RetryPolicy};
use crate::linking::{
    DbpediaLabelClient, EntityLinker, LabelSource, LinkingError, SpotlightClient, WikidataClient,
};


/// Builds clients and services from a validated [`LexilinkConfig`].
pub struct LinkerFactory;

impl LinkerFactory {

    pub fn graph_linker(
        config: &LexilinkConfig,
    ) -> std::result::Result<Option<Arc<dyn EntityLinker>>, LinkingError> {
        if !config.graph_enabled {
            return Ok(None);
        }
        Ok(Some(Arc::new(WikidataClient::from_config(config)?)))
    }


    pub fn annotation_linker(
        config: &LexilinkConfig,
    ) -> std::result::Result<Option<Arc<dyn EntityLinker>>, LinkingError> {
        if !config.annotation_enabled {
            return Ok(None);
        }
        Ok(Some(Arc::new(SpotlightClient::from_config(config)?)))
    }


    /// Label sources for seeding compacted entities, one per enabled knowledge base.
    pub fn label_sources(
        config: &LexilinkConfig,
    ) -> std::result::Result<Vec<Arc<dyn LabelSource>>, LinkingError> {
        let mut sources: Vec<Arc<dyn LabelSource>> = Vec::new();
        if !config.seed_labels {
            return Ok(sources);
        }
        if config.graph_enabled {
            sources.push(Arc::new(WikidataClient::from_config(config)?));
        }
        if config.annotation_enabled {
            sources.push(Arc::new(DbpediaLabelClient::from_config(config)?));
        }
        Ok(sources)
    }

    #[must_use]
    pub fn retry_policy(config: &LexilinkConfig) -> RetryPolicy {
        RetryPolicy::new(
            config.max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
        )
    }


    pub fn keyword_resolver(config: &LexilinkConfig) -> Result<KeywordResolver> {
        let mut resolver = KeywordResolver::new()
            .with_languages(config.languages.clone(), config.default_language)
            .with_retry(Self::retry_policy(config));

        if let Some(graph) = Self::graph_linker(config)? {
            resolver = resolver.with_graph(graph);
        }
        if let Some(annotation) = Self::annotation_linker(config)? {
            resolver = resolver.with_annotation(annotation);
        }
        Ok(resolver)
    }


    pub fn batch_resolver(config: &LexilinkConfig) -> Result<BatchResolver> {
        let resolver = Arc::new(Self::keyword_resolver(config)?);
        let deadline = Some(Duration::from_secs(config.batch_timeout_secs));
        Ok(BatchResolver::new(resolver, config.workers).with_deadline(deadline))
    }


    pub fn pipeline(config: &LexilinkConfig) -> Result<LinkingPipeline> {
        config.validate()?;
        info!(
            "Building pipeline: graph={}, annotation={}, workers={}, precedence={:?}",
            config.graph_enabled, config.annotation_enabled, config.workers, config.precedence
        );

        Ok(LinkingPipeline::new(
            Self::batch_resolver(config)?,
            config.precedence,
            Self::label_sources(config)?,
        ))
    }
}
