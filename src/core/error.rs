use thiserror::Error;

use crate::core::services::ResolutionError;
use crate::linking::LinkingError;


#[derive(Error, Debug)]
pub enum LexilinkError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Linking error: {0}")]
    Linking(#[from] LinkingError),

    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LexilinkError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}


pub type Result<T> = std::result::Result<T, LexilinkError>;
