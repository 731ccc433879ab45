

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use strum::IntoEnumIterator;
use tracing::{debug, info};

use super::base::{Annotation, EntityLinker, LinkingError};
use super::http::{build_client, endpoint, ensure_success, send_throttled, ThrottlePolicy};
use crate::core::config::LexilinkConfig;
use crate::core::models::EntityUri;
use crate::text::language::Language;
use crate::text::normalize::truncate_chars;
use crate::{DEFAULT_HTTP_TIMEOUT, DEFAULT_SPOTLIGHT_URL, SPOTLIGHT_MAX_CHARS};

const SERVICE: &str = "dbpedia-spotlight";
const DEFAULT_CONFIDENCE: f64 = 0.4;
const DEFAULT_THROTTLE: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(rename = "Resources", default)]
    resources: Vec<SpotlightResource>,
}

#[derive(Debug, Deserialize)]
struct SpotlightResource {
    #[serde(rename = "@URI")]
    uri: String,
    #[serde(rename = "@surfaceForm", default)]
    surface_form: String,
}


/// Annotation client over DBpedia Spotlight.
pub struct SpotlightClient {
    base_url: String,
    client: Client,
    confidence: f64,
    max_chars: usize,
    languages: Vec<Language>,
    default_language: Language,
    throttle: ThrottlePolicy,
}

impl SpotlightClient {

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LinkingError> {
        // Fail on a bad base URL here rather than on the first request.
        endpoint(base_url, "en/annotate")?;
        info!("SpotlightClient initialized (url={})", base_url);

        Ok(Self {
            base_url: base_url.to_string(),
            client: build_client(timeout)?,
            confidence: DEFAULT_CONFIDENCE,
            max_chars: SPOTLIGHT_MAX_CHARS,
            languages: Language::iter().collect(),
            default_language: Language::default(),
            throttle: ThrottlePolicy::FixedOnForbidden {
                interval: DEFAULT_THROTTLE,
            },
        })
    }


    pub fn public() -> Result<Self, LinkingError> {
        Self::new(DEFAULT_SPOTLIGHT_URL, Duration::from_secs(DEFAULT_HTTP_TIMEOUT))
    }


    pub fn from_config(config: &LexilinkConfig) -> Result<Self, LinkingError> {
        Ok(Self::new(&config.spotlight_url, Duration::from_secs(config.timeout))?
            .with_languages(config.languages.clone(), config.default_language)
            .with_confidence(config.confidence)
            .with_max_chars(config.spotlight_max_chars)
            .with_throttle_interval(Duration::from_secs(config.spotlight_throttle_secs)))
    }


    pub fn with_languages(mut self, languages: Vec<Language>, default_language: Language) -> Self {
        self.languages = languages;
        self.default_language = default_language;
        self
    }


    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }


    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }


    pub fn with_throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle = ThrottlePolicy::FixedOnForbidden { interval };
        self
    }

    fn query_language(&self, language: Language) -> Language {
        if self.languages.contains(&language) {
            language
        } else {
            self.default_language
        }
    }


    /// Every distinct entity mention found in `text`, in document order.
    pub async fn annotate(
        &self,
        text: &str,
        language: Language,
    ) -> Result<Vec<Annotation>, LinkingError> {
        let text = truncate_chars(text, self.max_chars);
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let path = format!("{}/annotate", self.query_language(language).code());
        let url = endpoint(&self.base_url, &path)?;
        let confidence = self.confidence.to_string();

        let response = send_throttled(SERVICE, self.throttle, || {
            self.client
                .get(url.clone())
                .header(ACCEPT, "application/json")
                .query(&[("text", text), ("confidence", confidence.as_str())])
        })
        .await?;
        ensure_success(SERVICE, &response)?;

        let body = response.text().await?;
        let parsed = match serde_json::from_str::<AnnotateResponse>(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("Malformed annotate payload: {}", e);
                return Ok(Vec::new());
            }
        };

        let mut annotations: Vec<Annotation> = Vec::new();
        for resource in parsed.resources {
            let Some(uri) = EntityUri::new(resource.uri) else {
                continue;
            };
            let annotation = Annotation {
                surface_form: resource.surface_form,
                uri,
            };
            if !annotations.contains(&annotation) {
                annotations.push(annotation);
            }
        }

        Ok(annotations)
    }
}

#[async_trait]
impl EntityLinker for SpotlightClient {
    async fn resolve(
        &self,
        label: &str,
        language: Language,
    ) -> Result<Option<EntityUri>, LinkingError> {
        let best = self
            .annotate(label, language)
            .await?
            .into_iter()
            .next()
            .map(|annotation| annotation.uri);

        debug!(
            "Spotlight '{}' ({}) -> {:?}",
            label,
            language,
            best.as_ref().map(EntityUri::as_str)
        );
        Ok(best)
    }

    fn service_name(&self) -> &'static str {
        SERVICE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linking::testing::serve;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    type Params = Query<HashMap<String, String>>;

    fn client(base: &str) -> SpotlightClient {
        SpotlightClient::new(base, Duration::from_secs(5))
            .unwrap()
            .with_throttle_interval(Duration::from_millis(200))
    }

    fn annotate_payload() -> serde_json::Value {
        json!({
            "@text": "e-learning and semantic web",
            "@confidence": "0.4",
            "Resources": [
                { "@URI": "http://dbpedia.org/resource/Educational_technology", "@surfaceForm": "e-learning", "@offset": "0" },
                { "@URI": "http://dbpedia.org/resource/Semantic_Web", "@surfaceForm": "semantic web", "@offset": "15" },
                { "@URI": "http://dbpedia.org/resource/Educational_technology", "@surfaceForm": "e-learning", "@offset": "40" }
            ]
        })
    }

    #[tokio::test]
    async fn test_annotate_returns_distinct_mentions() {
        let router = Router::new().route(
            "/en/annotate",
            get(|Query(params): Params, headers: HeaderMap| async move {
                assert_eq!(
                    headers.get("accept").and_then(|v| v.to_str().ok()),
                    Some("application/json")
                );
                assert_eq!(params.get("confidence").map(String::as_str), Some("0.4"));
                axum::Json(annotate_payload())
            }),
        );
        let base = serve(router).await;

        let annotations = client(&base)
            .annotate("e-learning and semantic web", Language::En)
            .await
            .unwrap();
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].surface_form, "e-learning");
        assert_eq!(annotations[1].uri.as_str(), "http://dbpedia.org/resource/Semantic_Web");
    }

    #[tokio::test]
    async fn test_resolve_takes_first_mention() {
        let router = Router::new().route(
            "/es/annotate",
            get(|| async { axum::Json(annotate_payload()) }),
        );
        let base = serve(router).await;

        let uri = client(&base).resolve("e-learning", Language::Es).await.unwrap();
        assert_eq!(
            uri.unwrap().as_str(),
            "http://dbpedia.org/resource/Educational_technology"
        );
    }

    #[tokio::test]
    async fn test_missing_resources_is_no_match() {
        let router = Router::new()
            .route(
                "/en/annotate",
                get(|Query(params): Params| async move {
                    if params.get("text").map(String::as_str) == Some("garbage") {
                        "not json".into_response()
                    } else {
                        axum::Json(json!({ "@text": "zzzz" })).into_response()
                    }
                }),
            );
        let base = serve(router).await;
        let client = client(&base);

        assert!(client.resolve("zzzz", Language::En).await.unwrap().is_none());
        assert!(client.resolve("garbage", Language::En).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retries_forbidden_with_fixed_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_handler = calls.clone();
        let router = Router::new().route(
            "/en/annotate",
            get(move || {
                let calls = calls_handler.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        StatusCode::FORBIDDEN.into_response()
                    } else {
                        axum::Json(annotate_payload()).into_response()
                    }
                }
            }),
        );
        let base = serve(router).await;

        let started = Instant::now();
        let uri = client(&base).resolve("e-learning", Language::En).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(400));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(uri.is_some());
    }

    #[tokio::test]
    async fn test_input_is_truncated() {
        let seen = Arc::new(Mutex::new(0usize));
        let seen_handler = seen.clone();
        let router = Router::new().route(
            "/ca/annotate",
            get(move |Query(params): Params| {
                let seen = seen_handler.clone();
                async move {
                    let chars = params.get("text").map_or(0, |t| t.chars().count());
                    *seen.lock().unwrap() = chars;
                    axum::Json(json!({}))
                }
            }),
        );
        let base = serve(router).await;

        let long_text = "à".repeat(50);
        client(&base)
            .with_max_chars(10)
            .annotate(&long_text, Language::Ca)
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), 10);
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let router = Router::new().route(
            "/en/annotate",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let base = serve(router).await;

        let err = client(&base).resolve("e-learning", Language::En).await.unwrap_err();
        assert!(err.is_transient());
    }
}
