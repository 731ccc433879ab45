pub mod compaction;
pub mod pipeline;
pub mod resolution;

pub use resolution::{
    BatchOutcome, BatchResolver, CacheStats, CachedLinker, CachedResolution, KeywordResolver,
    ResolutionCache, ResolutionError, ResolutionStats, RetryPolicy,
};

pub use compaction::{CompactionStats, Compactor, LabelCache};
pub use pipeline::{LinkingPipeline, PipelineReport};
