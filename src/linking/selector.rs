use serde::{Deserialize, Serialize};

/// Descriptions containing this are topical articles, not primary entities.
const ARTICLE_MARKER: &str = "article";


/// One `wbsearchentities` hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub id: String,
    #[serde(default)]
    pub concepturi: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SearchCandidate {
    pub fn is_article(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|description| description.contains(ARTICLE_MARKER))
    }
}


/// First candidate that is undescribed or not an article, in remote order.
pub fn pick_preferred(candidates: &[SearchCandidate]) -> Option<&SearchCandidate> {
    candidates.iter().find(|candidate| !candidate.is_article())
}
