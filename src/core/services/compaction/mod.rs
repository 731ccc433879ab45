

mod compactor;
mod labels;

pub use compactor::{CompactionStats, Compactor};
pub use labels::LabelCache;
