use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use super::cache::{CacheStats, CachedLinker};
use super::error::ResolutionError;
use crate::core::models::{EntityUri, Keyword, ResolutionResult};
use crate::linking::{EntityLinker, LinkingError};
use crate::text::language::{
    IdentityLemmatizer, Language, LanguageDetector, Lemmatizer, StopwordDetector,
};
use crate::text::normalize::normalize;


/// Exponential backoff for transient remote failures.
///
/// `max_retries` counts retries, so a lookup is attempted at most
/// `max_retries + 1` times. Waits are `base_delay * 2^attempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(200))
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(attempt))
    }

    pub async fn run<T, F, Fut>(
        &self,
        service: &'static str,
        mut op: F,
    ) -> Result<T, ResolutionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LinkingError>>,
    {
        let mut attempt: u32 = 0;

        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("Retry succeeded for {} on attempt {}", service, attempt + 1);
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => {
                    return Err(ResolutionError::Linking { service, source: e });
                }
                Err(e) if attempt >= self.max_retries => {
                    warn!("All {} attempts exhausted for {}: {}", attempt + 1, service, e);
                    return Err(ResolutionError::RetryExhausted {
                        service,
                        attempts: attempt + 1,
                        last: e,
                    });
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    debug!("Retry {} for {} after {:?}: {}", attempt + 1, service, delay, e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}


/// Resolves single keywords against the configured knowledge bases.
pub struct KeywordResolver {
    graph: Option<CachedLinker>,
    annotation: Option<CachedLinker>,
    detector: Arc<dyn LanguageDetector>,
    lemmatizer: Arc<dyn Lemmatizer>,
    languages: Vec<Language>,
    default_language: Language,
    retry: RetryPolicy,
}

impl Default for KeywordResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordResolver {

    pub fn new() -> Self {
        Self {
            graph: None,
            annotation: None,
            detector: Arc::new(StopwordDetector),
            lemmatizer: Arc::new(IdentityLemmatizer),
            languages: Language::iter().collect(),
            default_language: Language::default(),
            retry: RetryPolicy::default(),
        }
    }


    pub fn with_graph(mut self, linker: Arc<dyn EntityLinker>) -> Self {
        info!("KeywordResolver graph linker: {}", linker.service_name());
        self.graph = Some(CachedLinker::new(linker));
        self
    }


    pub fn with_annotation(mut self, linker: Arc<dyn EntityLinker>) -> Self {
        info!("KeywordResolver annotation linker: {}", linker.service_name());
        self.annotation = Some(CachedLinker::new(linker));
        self
    }

    pub fn with_detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_lemmatizer(mut self, lemmatizer: Arc<dyn Lemmatizer>) -> Self {
        self.lemmatizer = lemmatizer;
        self
    }

    pub fn with_languages(mut self, languages: Vec<Language>, default_language: Language) -> Self {
        self.languages = languages;
        self.default_language = default_language;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }


    /// Detected language of `text`, or the default when detection is
    /// inconclusive or lands outside the allow-list.
    pub fn detect_language(&self, text: &str) -> Language {
        self.detector
            .detect(text)
            .filter(|language| self.languages.contains(language))
            .unwrap_or(self.default_language)
    }


    /// Builds a normalized keyword with its language already detected.
    pub fn prepare(&self, raw: &str, resource_id: &str) -> Keyword {
        let keyword = Keyword::new(raw, resource_id);
        let language = self.detect_language(&keyword.normalized);
        keyword.with_language(language)
    }

    fn language_of(&self, keyword: &Keyword) -> Language {
        match keyword.language {
            Some(language) if self.languages.contains(&language) => language,
            Some(_) => self.default_language,
            None => self.detect_language(&keyword.normalized),
        }
    }


    pub async fn resolve(&self, keyword: &Keyword) -> Result<ResolutionResult, ResolutionError> {
        let language = self.language_of(keyword);
        let mut result = ResolutionResult::new(keyword.normalized.clone(), language);
        if keyword.is_empty() {
            return Ok(result);
        }

        let lemma = normalize(&self.lemmatizer.lemmatize(&keyword.normalized, language));
        let mut errors = Vec::new();

        if let Some(graph) = &self.graph {
            match self.lookup(graph, &lemma, &keyword.normalized, language).await {
                Ok(uri) => result.graph_uri = uri,
                Err(e) => errors.push(e),
            }
        }
        if let Some(annotation) = &self.annotation {
            match self.lookup(annotation, &lemma, &keyword.normalized, language).await {
                Ok(uri) => result.annotation_uri = uri,
                Err(e) => errors.push(e),
            }
        }

        let enabled = usize::from(self.graph.is_some()) + usize::from(self.annotation.is_some());
        if enabled > 0 && errors.len() == enabled {
            return Err(errors.remove(0));
        }
        for e in &errors {
            warn!("'{}' kept without this lookup: {}", result.keyword, e);
        }

        debug!(
            "Resolved '{}' ({}): graph={:?} annotation={:?}",
            result.keyword,
            language,
            result.graph_uri.as_ref().map(EntityUri::as_str),
            result.annotation_uri.as_ref().map(EntityUri::as_str)
        );
        Ok(result)
    }

    /// Lemma first; the surface form only when the lemma differs and finds nothing.
    async fn lookup(
        &self,
        linker: &CachedLinker,
        lemma: &str,
        normalized: &str,
        language: Language,
    ) -> Result<Option<EntityUri>, ResolutionError> {
        if !lemma.is_empty() {
            if let Some(uri) = linker.resolve(lemma, language, &self.retry).await? {
                return Ok(Some(uri));
            }
            if lemma == normalized {
                return Ok(None);
            }
        }
        linker.resolve(normalized, language, &self.retry).await
    }

    pub fn graph_cache_stats(&self) -> Option<CacheStats> {
        self.graph.as_ref().map(|linker| linker.cache().stats())
    }

    pub fn annotation_cache_stats(&self) -> Option<CacheStats> {
        self.annotation.as_ref().map(|linker| linker.cache().stats())
    }
}
