

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use strum::IntoEnumIterator;
use tracing::{debug, info};
use url::Url;

use super::base::{EntityLinker, LabelSource, LinkingError};
use super::http::{build_client, endpoint, ensure_success, send_throttled, ThrottlePolicy};
use super::selector::{pick_preferred, SearchCandidate};
use crate::core::config::LexilinkConfig;
use crate::core::models::{EntityUri, Label};
use crate::text::language::Language;
use crate::text::normalize::normalize;
use crate::{DEFAULT_HTTP_TIMEOUT, DEFAULT_WIKIDATA_URL};

const SERVICE: &str = "wikidata";
const ENTITY_NAMESPACE: &str = "http://www.wikidata.org/entity/";
const DEFAULT_SEARCH_LIMIT: u32 = 15;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    search: Vec<SearchCandidate>,
}

#[derive(Debug, Deserialize)]
struct EntitiesResponse {
    entities: HashMap<String, EntityLabels>,
}

#[derive(Debug, Deserialize)]
struct EntityLabels {
    #[serde(default)]
    labels: HashMap<String, LabelValue>,
}

#[derive(Debug, Deserialize)]
struct LabelValue {
    value: String,
}


/// Graph-search client over the Wikidata action API.
pub struct WikidataClient {
    api_url: Url,
    client: Client,
    languages: Vec<Language>,
    default_language: Language,
    search_limit: u32,
    throttle: ThrottlePolicy,
}

impl WikidataClient {

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LinkingError> {
        let api_url = endpoint(base_url, "w/api.php")?;
        info!("WikidataClient initialized (url={})", api_url);

        Ok(Self {
            api_url,
            client: build_client(timeout)?,
            languages: Language::iter().collect(),
            default_language: Language::default(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            throttle: ThrottlePolicy::ServerHinted {
                fallback: Duration::from_secs(5),
            },
        })
    }


    pub fn public() -> Result<Self, LinkingError> {
        Self::new(DEFAULT_WIKIDATA_URL, Duration::from_secs(DEFAULT_HTTP_TIMEOUT))
    }


    pub fn from_config(config: &LexilinkConfig) -> Result<Self, LinkingError> {
        Ok(Self::new(&config.wikidata_url, Duration::from_secs(config.timeout))?
            .with_languages(config.languages.clone(), config.default_language)
            .with_search_limit(config.search_limit)
            .with_throttle_fallback(Duration::from_secs(config.default_retry_after_secs)))
    }


    pub fn with_languages(mut self, languages: Vec<Language>, default_language: Language) -> Self {
        self.languages = languages;
        self.default_language = default_language;
        self
    }


    pub fn with_search_limit(mut self, limit: u32) -> Self {
        self.search_limit = limit.max(1);
        self
    }


    pub fn with_throttle_fallback(mut self, fallback: Duration) -> Self {
        self.throttle = ThrottlePolicy::ServerHinted { fallback };
        self
    }

    fn query_language(&self, language: Language) -> Language {
        if self.languages.contains(&language) {
            language
        } else {
            self.default_language
        }
    }


    /// Raw `wbsearchentities` candidates. `Ok(None)` when the payload is malformed.
    pub async fn search(
        &self,
        label: &str,
        language: Language,
    ) -> Result<Option<Vec<SearchCandidate>>, LinkingError> {
        let language = self.query_language(language).code();
        let limit = self.search_limit.to_string();

        let response = send_throttled(SERVICE, self.throttle, || {
            self.client.get(self.api_url.clone()).query(&[
                ("action", "wbsearchentities"),
                ("search", label),
                ("language", language),
                ("uselang", language),
                ("strictlanguage", "true"),
                ("type", "item"),
                ("limit", limit.as_str()),
                ("format", "json"),
            ])
        })
        .await?;
        ensure_success(SERVICE, &response)?;

        let body = response.text().await?;
        match serde_json::from_str::<SearchResponse>(&body) {
            Ok(parsed) => Ok(Some(parsed.search)),
            Err(e) => {
                debug!("Malformed search payload for '{}': {}", label, e);
                Ok(None)
            }
        }
    }

    fn candidate_uri(candidate: &SearchCandidate) -> Option<EntityUri> {
        candidate
            .concepturi
            .clone()
            .and_then(EntityUri::new)
            .or_else(|| EntityUri::new(format!("{}{}", ENTITY_NAMESPACE, candidate.id)))
    }
}

#[async_trait]
impl EntityLinker for WikidataClient {
    async fn resolve(
        &self,
        label: &str,
        language: Language,
    ) -> Result<Option<EntityUri>, LinkingError> {
        let Some(candidates) = self.search(label, language).await? else {
            return Ok(None);
        };

        let chosen = pick_preferred(&candidates).and_then(Self::candidate_uri);
        debug!(
            "Wikidata '{}' ({}): {} candidates -> {:?}",
            label,
            language,
            candidates.len(),
            chosen.as_ref().map(EntityUri::as_str)
        );
        Ok(chosen)
    }

    fn service_name(&self) -> &'static str {
        SERVICE
    }
}

#[async_trait]
impl LabelSource for WikidataClient {
    async fn labels(&self, uri: &EntityUri) -> Result<Vec<Label>, LinkingError> {
        let id = uri.local_name();
        let languages = self
            .languages
            .iter()
            .map(|language| language.code())
            .collect::<Vec<_>>()
            .join("|");

        let response = send_throttled(SERVICE, self.throttle, || {
            self.client.get(self.api_url.clone()).query(&[
                ("action", "wbgetentities"),
                ("ids", id),
                ("props", "labels"),
                ("languages", languages.as_str()),
                ("format", "json"),
            ])
        })
        .await?;
        ensure_success(SERVICE, &response)?;

        let body = response.text().await?;
        let parsed = match serde_json::from_str::<EntitiesResponse>(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("Malformed label payload for {}: {}", uri, e);
                return Ok(Vec::new());
            }
        };

        let Some(entity) = parsed.entities.get(id) else {
            return Ok(Vec::new());
        };

        Ok(self
            .languages
            .iter()
            .filter_map(|language| {
                let value = normalize(&entity.labels.get(language.code())?.value);
                (!value.is_empty()).then(|| Label::new(value, *language))
            })
            .collect())
    }

    fn handles(&self, uri: &EntityUri) -> bool {
        uri.as_str().contains("wikidata.org/entity/")
    }

    fn service_name(&self) -> &'static str {
        SERVICE
    }
}
