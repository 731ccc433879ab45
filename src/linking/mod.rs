

pub mod base;
pub mod dbpedia;
pub mod http;
pub mod selector;
pub mod spotlight;
pub mod wikidata;

#[cfg(test)]
pub(crate) mod testing;

pub use base::{Annotation, EntityLinker, LabelSource, LinkingError};
pub use dbpedia::DbpediaLabelClient;
pub use http::ThrottlePolicy;
pub use selector::{pick_preferred, SearchCandidate};
pub use spotlight::SpotlightClient;
pub use wikidata::WikidataClient;
