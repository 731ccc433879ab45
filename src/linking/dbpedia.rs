use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use strum::IntoEnumIterator;
use tracing::{debug, info};
use url::Url;

use super::base::{LabelSource, LinkingError};
use super::http::{build_client, ensure_success, send_throttled, ThrottlePolicy};
use crate::core::config::LexilinkConfig;
use crate::core::models::{EntityUri, Label};
use crate::text::language::Language;
use crate::text::normalize::normalize;
use crate::{DEFAULT_DBPEDIA_SPARQL_URL, DEFAULT_HTTP_TIMEOUT};

const SERVICE: &str = "dbpedia-sparql";
const SPARQL_JSON: &str = "application/sparql-results+json";

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    #[serde(default)]
    bindings: Vec<LabelBinding>,
}

#[derive(Debug, Deserialize)]
struct LabelBinding {
    label: LiteralTerm,
}

#[derive(Debug, Deserialize)]
struct LiteralTerm {
    value: String,
    #[serde(rename = "xml:lang", default)]
    lang: Option<String>,
}


/// Fetches `rdfs:label` values for DBpedia resources over SPARQL.
pub struct DbpediaLabelClient {
    sparql_url: Url,
    client: Client,
    languages: Vec<Language>,
    throttle: ThrottlePolicy,
}

impl DbpediaLabelClient {

    pub fn new(sparql_url: &str, timeout: Duration) -> Result<Self, LinkingError> {
        let sparql_url = Url::parse(sparql_url)?;
        info!("DbpediaLabelClient initialized (url={})", sparql_url);

        Ok(Self {
            sparql_url,
            client: build_client(timeout)?,
            languages: Language::iter().collect(),
            throttle: ThrottlePolicy::ServerHinted {
                fallback: Duration::from_secs(5),
            },
        })
    }


    pub fn public() -> Result<Self, LinkingError> {
        Self::new(DEFAULT_DBPEDIA_SPARQL_URL, Duration::from_secs(DEFAULT_HTTP_TIMEOUT))
    }


    pub fn from_config(config: &LexilinkConfig) -> Result<Self, LinkingError> {
        let mut client = Self::new(&config.dbpedia_sparql_url, Duration::from_secs(config.timeout))?
            .with_languages(config.languages.clone());
        client.throttle = ThrottlePolicy::ServerHinted {
            fallback: Duration::from_secs(config.default_retry_after_secs),
        };
        Ok(client)
    }


    pub fn with_languages(mut self, languages: Vec<Language>) -> Self {
        self.languages = languages;
        self
    }


    /// Builds the label query, refusing IRIs that could escape the `<…>` term.
    pub fn label_query(&self, uri: &EntityUri) -> Result<String, LinkingError> {
        let iri = uri.as_str();
        let unsafe_char =
            |c: char| matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '\\' | '^' | '`');
        if iri.chars().any(|c| c.is_whitespace() || unsafe_char(c)) {
            return Err(LinkingError::InvalidUri(iri.to_string()));
        }

        let languages = self
            .languages
            .iter()
            .map(|language| format!("\"{}\"", language.code()))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!(
            "SELECT DISTINCT ?label WHERE {{ <{}> <http://www.w3.org/2000/01/rdf-schema#label> ?label . FILTER(lang(?label) IN ({})) }}",
            iri, languages
        ))
    }
}

#[async_trait]
impl LabelSource for DbpediaLabelClient {
    async fn labels(&self, uri: &EntityUri) -> Result<Vec<Label>, LinkingError> {
        let query = self.label_query(uri)?;

        let response = send_throttled(SERVICE, self.throttle, || {
            self.client
                .get(self.sparql_url.clone())
                .header(ACCEPT, SPARQL_JSON)
                .query(&[("query", query.as_str()), ("format", SPARQL_JSON)])
        })
        .await?;
        ensure_success(SERVICE, &response)?;

        let body = response.text().await?;
        let parsed = match serde_json::from_str::<SparqlResponse>(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("Malformed SPARQL payload for {}: {}", uri, e);
                return Ok(Vec::new());
            }
        };

        let mut labels: Vec<Label> = Vec::new();
        for binding in parsed.results.bindings {
            let Some(language) = binding
                .label
                .lang
                .as_deref()
                .and_then(|code| Language::from_str(code).ok())
                .filter(|language| self.languages.contains(language))
            else {
                continue;
            };
            let value = normalize(&binding.label.value);
            if value.is_empty() {
                continue;
            }
            let label = Label::new(value, language);
            if !labels.contains(&label) {
                labels.push(label);
            }
        }

        Ok(labels)
    }

    fn handles(&self, uri: &EntityUri) -> bool {
        uri.as_str().contains("dbpedia.org/resource/")
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
    use axum::routing::get;
    use axum::Router;
    use serde_json::json;
    use std::collections::HashMap;

    fn resource(name: &str) -> EntityUri {
        EntityUri::new(format!("http://dbpedia.org/resource/{}", name)).unwrap()
    }

    #[test]
    fn test_label_query_filters_languages() {
        let client = DbpediaLabelClient::public()
            .unwrap()
            .with_languages(vec![Language::En, Language::Ca]);
        let query = client.label_query(&resource("Semantic_Web")).unwrap();
        assert!(query.contains("<http://dbpedia.org/resource/Semantic_Web>"));
        assert!(query.contains("FILTER(lang(?label) IN (\"en\", \"ca\"))"));
    }

    #[test]
    fn test_label_query_rejects_injection() {
        let client = DbpediaLabelClient::public().unwrap();
        let uri = EntityUri::new("http://dbpedia.org/resource/X> ?p ?o . <y").unwrap();
        assert!(matches!(client.label_query(&uri), Err(LinkingError::InvalidUri(_))));
    }

    #[tokio::test]
    async fn test_labels_from_sparql_bindings() {
        let router = Router::new().route(
            "/sparql",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert!(params.get("query").is_some_and(|q| q.contains("rdf-schema#label")));
                axum::Json(json!({
                    "head": { "vars": ["label"] },
                    "results": {
                        "bindings": [
                            { "label": { "type": "literal", "xml:lang": "en", "value": "Educational technology" } },
                            { "label": { "type": "literal", "xml:lang": "fr", "value": "Technologie éducative" } },
                            { "label": { "type": "literal", "xml:lang": "es", "value": "Tecnología educativa" } },
                            { "label": { "type": "literal", "value": "untagged" } }
                        ]
                    }
                }))
            }),
        );
        let base = serve(router).await;
        let client =
            DbpediaLabelClient::new(&format!("{}/sparql", base), Duration::from_secs(5)).unwrap();
        let uri = resource("Educational_technology");

        assert!(client.handles(&uri));
        assert_eq!(
            client.labels(&uri).await.unwrap(),
            vec![
                Label::new("educational technology", Language::En),
                Label::new("tecnología educativa", Language::Es),
            ]
        );
    }
}
