

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use strum::IntoEnumIterator;

use super::error::{LexilinkError, Result};
use crate::text::language::Language;
use crate::{
    DEFAULT_DBPEDIA_SPARQL_URL, DEFAULT_HTTP_TIMEOUT, DEFAULT_SPOTLIGHT_URL,
    DEFAULT_WIKIDATA_URL, SPOTLIGHT_MAX_CHARS,
};


/// Which knowledge base wins when a keyword resolves in both.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PrecedencePolicy {
    /// Prefer the Wikidata URI (structured multilingual labels).
    #[default]
    #[strum(serialize = "graph_first", serialize = "graph")]
    GraphFirst,
    /// Prefer the DBpedia Spotlight URI.
    #[strum(serialize = "annotation_first", serialize = "annotation")]
    AnnotationFirst,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexilinkConfig {

    pub wikidata_url: String,
    pub spotlight_url: String,
    pub dbpedia_sparql_url: String,
    pub timeout: u64,


    pub languages: Vec<Language>,
    pub default_language: Language,


    pub search_limit: u32,
    pub default_retry_after_secs: u64,


    pub confidence: f64,
    pub spotlight_throttle_secs: u64,
    pub spotlight_max_chars: usize,


    pub graph_enabled: bool,
    pub annotation_enabled: bool,


    pub workers: usize,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Zero disables the batch deadline.
    pub batch_timeout_secs: u64,


    pub precedence: PrecedencePolicy,
    pub seed_labels: bool,
}

impl Default for LexilinkConfig {
    fn default() -> Self {
        Self {
            wikidata_url: DEFAULT_WIKIDATA_URL.to_string(),
            spotlight_url: DEFAULT_SPOTLIGHT_URL.to_string(),
            dbpedia_sparql_url: DEFAULT_DBPEDIA_SPARQL_URL.to_string(),
            timeout: DEFAULT_HTTP_TIMEOUT,

            languages: Language::iter().collect(),
            default_language: Language::En,

            search_limit: 15,
            default_retry_after_secs: 5,

            confidence: 0.4,
            spotlight_throttle_secs: 5,
            spotlight_max_chars: SPOTLIGHT_MAX_CHARS,

            graph_enabled: true,
            annotation_enabled: true,

            workers: 8,
            max_retries: 3,
            retry_base_delay_ms: 200,
            batch_timeout_secs: 600,

            precedence: PrecedencePolicy::default(),
            seed_labels: true,
        }
    }
}

impl LexilinkConfig {

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("LEXILINK")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("languages"),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }


    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }


    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(LexilinkError::validation("workers must be at least 1"));
        }
        if self.languages.is_empty() {
            return Err(LexilinkError::validation("language allow-list is empty"));
        }
        if !self.languages.contains(&self.default_language) {
            return Err(LexilinkError::validation(format!(
                "default language '{}' is not in the allow-list",
                self.default_language
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(LexilinkError::validation(format!(
                "confidence must be within [0, 1], got {}",
                self.confidence
            )));
        }
        if !self.graph_enabled && !self.annotation_enabled {
            return Err(LexilinkError::validation("at least one knowledge base must be enabled"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = LexilinkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.languages, vec![Language::En, Language::Es, Language::Ca]);
        assert_eq!(config.timeout, 20);
        assert_eq!(config.precedence, PrecedencePolicy::GraphFirst);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = LexilinkConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(LexilinkError::Validation(_))));
    }

    #[test]
    fn test_default_language_must_be_allowed() {
        let config = LexilinkConfig {
            languages: vec![Language::Es],
            default_language: Language::En,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_precedence_parsing() {
        assert_eq!("graph".parse::<PrecedencePolicy>().unwrap(), PrecedencePolicy::GraphFirst);
        assert_eq!(
            "Annotation_First".parse::<PrecedencePolicy>().unwrap(),
            PrecedencePolicy::AnnotationFirst
        );
        assert!("random".parse::<PrecedencePolicy>().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "workers = 2\nlanguages = [\"en\", \"ca\"]\nprecedence = \"annotation_first\"\nseed_labels = false"
        )
        .unwrap();

        let config = LexilinkConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.languages, vec![Language::En, Language::Ca]);
        assert_eq!(config.precedence, PrecedencePolicy::AnnotationFirst);
        assert!(!config.seed_labels);
        assert_eq!(config.search_limit, 15);
    }
}
