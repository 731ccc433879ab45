use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::PrecedencePolicy;
use crate::text::language::Language;
use crate::text::normalize::normalize;


/// Canonical entity URI. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityUri(String);

impl EntityUri {

    pub fn new(uri: impl Into<String>) -> Option<Self> {
        let uri = uri.into();
        let trimmed = uri.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == uri.len() {
            Some(Self(uri))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing path segment, e.g. `Q54837` for a Wikidata concept URI.
    pub fn local_name(&self) -> &str {
        self.0
            .rsplit(|c: char| c == '/' || c == '#')
            .next()
            .unwrap_or(self.0.as_str())
    }
}

impl fmt::Display for EntityUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntityUri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EntityUri {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "empty entity URI".to_string())
    }
}

impl From<EntityUri> for String {
    fn from(uri: EntityUri) -> Self {
        uri.0
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    pub raw: String,
    pub resource_id: String,
    pub normalized: String,
    /// `None` until language detection has run.
    pub language: Option<Language>,
}

impl Keyword {

    pub fn new(raw: impl Into<String>, resource_id: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = normalize(&raw);
        Self {
            raw,
            resource_id: resource_id.into(),
            normalized,
            language: None,
        }
    }


    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub keyword: String,
    pub language: Language,
}

impl Label {
    pub fn new(keyword: impl Into<String>, language: Language) -> Self {
        Self {
            keyword: keyword.into(),
            language,
        }
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub keyword: String,
    pub language: Language,
    pub graph_uri: Option<EntityUri>,
    pub annotation_uri: Option<EntityUri>,
}

impl ResolutionResult {
    pub fn new(keyword: impl Into<String>, language: Language) -> Self {
        Self {
            keyword: keyword.into(),
            language,
            graph_uri: None,
            annotation_uri: None,
        }
    }


    pub fn is_linked(&self) -> bool {
        self.graph_uri.is_some() || self.annotation_uri.is_some()
    }


    pub fn chosen_uri(&self, policy: PrecedencePolicy) -> Option<&EntityUri> {
        match policy {
            PrecedencePolicy::GraphFirst => {
                self.graph_uri.as_ref().or(self.annotation_uri.as_ref())
            }
            PrecedencePolicy::AnnotationFirst => {
                self.annotation_uri.as_ref().or(self.graph_uri.as_ref())
            }
        }
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactedEntity {
    pub uri: EntityUri,
    pub labels: Vec<Label>,
}

impl CompactedEntity {
    pub fn new(uri: EntityUri) -> Self {
        Self {
            uri,
            labels: Vec::new(),
        }
    }

    /// Appends `label` unless an identical pair is already present.
    pub fn insert_label(&mut self, label: Label) -> bool {
        if self.labels.contains(&label) {
            false
        } else {
            self.labels.push(label);
            true
        }
    }

    pub fn languages(&self) -> Vec<Language> {
        let mut languages = Vec::new();
        for label in &self.labels {
            if !languages.contains(&label.language) {
                languages.push(label.language);
            }
        }
        languages
    }
}
