

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::core::models::{EntityUri, Label};
use crate::text::language::Language;


#[derive(Error, Debug)]
pub enum LinkingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status}")]
    Status { service: &'static str, status: u16 },

    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid entity URI: {0}")]
    InvalidUri(String),

    #[error("{service} did not answer before the deadline")]
    Deadline { service: &'static str },
}

impl LinkingError {
    /// Timeouts, connection failures and 5xx answers are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Self::Status { status, .. } => *status >= 500,
            Self::Url(_) | Self::InvalidUri(_) | Self::Deadline { .. } => false,
        }
    }
}


/// One entity mention found by an annotation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub surface_form: String,
    pub uri: EntityUri,
}


#[async_trait]
pub trait EntityLinker: Send + Sync {

    /// `Ok(None)` means the service definitively found nothing for `label`.
    async fn resolve(
        &self,
        label: &str,
        language: Language,
    ) -> Result<Option<EntityUri>, LinkingError>;


    fn service_name(&self) -> &'static str;
}


/// Knowledge-base labels advertised for an entity, restricted to the
/// configured languages.
#[async_trait]
pub trait LabelSource: Send + Sync {

    async fn labels(&self, uri: &EntityUri) -> Result<Vec<Label>, LinkingError>;


    fn handles(&self, uri: &EntityUri) -> bool;


    fn service_name(&self) -> &'static str;
}


#[async_trait]
impl EntityLinker for Arc<dyn EntityLinker> {
    async fn resolve(
        &self,
        label: &str,
        language: Language,
    ) -> Result<Option<EntityUri>, LinkingError> {
        (**self).resolve(label, language).await
    }

    fn service_name(&self) -> &'static str {
        (**self).service_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_transient() {
        let unavailable = LinkingError::Status {
            service: "wikidata",
            status: 503,
        };
        assert!(unavailable.is_transient());

        let not_found = LinkingError::Status {
            service: "wikidata",
            status: 404,
        };
        assert!(!not_found.is_transient());
        assert!(!LinkingError::InvalidUri("x y".to_string()).is_transient());
    }

    #[test]
    fn test_status_error_message() {
        let err = LinkingError::Status {
            service: "dbpedia-spotlight",
            status: 500,
        };
        assert_eq!(err.to_string(), "dbpedia-spotlight returned HTTP 500");
    }
}
