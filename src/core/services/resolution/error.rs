
use thiserror::Error;

use crate::linking::LinkingError;


#[derive(Error, Debug)]
pub enum ResolutionError {

    #[error("{service} lookup failed: {source}")]
    Linking {
        service: &'static str,
        #[source]
        source: LinkingError,
    },


    #[error("{service} still failing after {attempts} attempts: {last}")]
    RetryExhausted {
        service: &'static str,
        attempts: u32,
        #[source]
        last: LinkingError,
    },


    #[error("Batch deadline elapsed before the keyword was resolved")]
    Deadline,


    #[error("Worker failed: {0}")]
    Worker(String),
}

impl ResolutionError {
    pub fn service(&self) -> Option<&'static str> {
        match self {
            Self::Linking { service, .. } | Self::RetryExhausted { service, .. } => Some(*service),
            Self::Deadline | Self::Worker(_) => None,
        }
    }
}
