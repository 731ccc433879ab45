

mod batch;
mod cache;
mod error;
mod service;

pub use batch::{BatchOutcome, BatchResolver, ResolutionStats};
pub use cache::{CacheStats, CachedLinker, CachedResolution, ResolutionCache};
pub use error::ResolutionError;
pub use service::{KeywordResolver, RetryPolicy};
