use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::info;

use super::ingest::KeywordRecord;
use crate::core::config::PrecedencePolicy;
use crate::core::error::Result;
use crate::core::models::{CompactedEntity, EntityUri, ResolutionResult};
use crate::text::normalize::normalize;


/// Writes `uri,labels` rows, `labels` being a JSON array of `{keyword, language}`.
pub fn write_compacted(path: &Path, entities: &[CompactedEntity]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["uri", "labels"])?;

    for entity in entities {
        let labels = serde_json::to_string(&entity.labels)?;
        writer.write_record([entity.uri.as_str(), labels.as_str()])?;
    }

    writer.flush()?;
    info!("Wrote {} compacted entities to {}", entities.len(), path.display());
    Ok(())
}


/// Writes `resource_id,uri` links for keywords whose chosen URI survived
/// compaction. Returns the number of links written.
pub fn write_resource_links(
    path: &Path,
    records: &[KeywordRecord],
    results: &[ResolutionResult],
    policy: PrecedencePolicy,
    compacted: &[CompactedEntity],
) -> Result<usize> {
    let by_keyword: HashMap<&str, &ResolutionResult> = results
        .iter()
        .map(|result| (result.keyword.as_str(), result))
        .collect();
    let kept: HashSet<&EntityUri> = compacted.iter().map(|entity| &entity.uri).collect();

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["resource_id", "uri"])?;

    let mut written: HashSet<(&str, &EntityUri)> = HashSet::new();
    for record in records {
        let normalized = normalize(&record.keyword);
        let Some(uri) = by_keyword
            .get(normalized.as_str())
            .and_then(|result| result.chosen_uri(policy))
        else {
            continue;
        };
        if !kept.contains(uri) || !written.insert((record.resource_id.as_str(), uri)) {
            continue;
        }
        writer.write_record([record.resource_id.as_str(), uri.as_str()])?;
    }

    writer.flush()?;
    info!("Wrote {} resource links to {}", written.len(), path.display());
    Ok(written.len())
}
