use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::error::Result;
use crate::text::normalize::sanitize_utf8;
use crate::text::splitter::clean_field;


/// One cleaned keyword attached to the resource that carried it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeywordRecord {
    pub resource_id: String,
    pub keyword: String,
}


/// Reads a `resource_id,keyword` CSV with a header row.
pub fn read_keyword_records(path: &Path) -> Result<Vec<KeywordRecord>> {
    let file = File::open(path)?;
    let records = parse_keyword_records(file)?;
    info!("Read {} keyword records from {}", records.len(), path.display());
    Ok(records)
}


/// Parses keyword rows from any reader.
///
/// Extra fields from unquoted commas are folded back into the keyword
/// column, duplicate rows are skipped, and each keyword field is expanded
/// through [`clean_field`].
pub fn parse_keyword_records<R: Read>(input: R) -> Result<Vec<KeywordRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let mut seen_rows: HashSet<(String, String)> = HashSet::new();
    let mut seen_records: HashSet<KeywordRecord> = HashSet::new();
    let mut records = Vec::new();

    for (idx, row) in reader.byte_records().enumerate() {
        let row = row?;
        let fields: Vec<String> = row.iter().map(sanitize_utf8).collect();

        let Some((resource_id, rest)) = fields.split_first() else {
            continue;
        };
        let resource_id = resource_id.trim().to_string();
        if resource_id.is_empty() {
            warn!("Row {} has no resource id, skipped", idx + 1);
            continue;
        }
        if rest.len() > 1 {
            debug!("Row {} had {} keyword fields, rejoined", idx + 1, rest.len());
        }
        let field = rest.join(",");

        if !seen_rows.insert((resource_id.clone(), field.clone())) {
            continue;
        }

        for keyword in clean_field(&field) {
            let record = KeywordRecord {
                resource_id: resource_id.clone(),
                keyword,
            };
            if seen_records.insert(record.clone()) {
                records.push(record);
            }
        }
    }

    Ok(records)
}
