

pub mod language;
pub mod normalize;
pub mod splitter;

pub use language::{IdentityLemmatizer, Language, LanguageDetector, Lemmatizer, StopwordDetector};
pub use normalize::{normalize, sanitize_utf8, truncate_chars};
pub use splitter::{clean_field, split_keywords, strip_annotations};
