pub mod core;
pub mod factory;
pub mod io;
pub mod linking;
pub mod text;

pub use crate::core::config::LexilinkConfig;
pub use crate::core::error::{LexilinkError, Result};
pub use crate::core::models::{CompactedEntity, EntityUri, Keyword, Label, ResolutionResult};
pub use factory::LinkerFactory;
pub use text::language::Language;


pub const DEFAULT_WIKIDATA_URL: &str = "https://www.wikidata.org";


pub const DEFAULT_SPOTLIGHT_URL: &str = "https://api.dbpedia-spotlight.org";


pub const DEFAULT_DBPEDIA_SPARQL_URL: &str = "https://dbpedia.org/sparql";


pub const DEFAULT_HTTP_TIMEOUT: u64 = 20;


pub const SPOTLIGHT_MAX_CHARS: usize = 15_000;


pub const USER_AGENT: &str = concat!("lexilink/", env!("CARGO_PKG_VERSION"));
