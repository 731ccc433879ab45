

pub mod export;
pub mod ingest;

pub use export::{write_compacted, write_resource_links};
pub use ingest::{parse_keyword_records, read_keyword_records, KeywordRecord};
