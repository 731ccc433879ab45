

pub mod config;
pub mod error;
pub mod models;

pub mod services;

pub use config::{LexilinkConfig, PrecedencePolicy};
pub use error::{LexilinkError, Result};
pub use models::{CompactedEntity, EntityUri, Keyword, Label, ResolutionResult};


pub use services::{
    BatchOutcome, BatchResolver, CacheStats, KeywordResolver, ResolutionCache, ResolutionError,
    ResolutionStats, RetryPolicy,
};


pub use services::{CompactionStats, Compactor, LinkingPipeline, PipelineReport};
