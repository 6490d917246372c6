use serde::{Deserialize, Serialize};

/// A visited page, keyed by URI in the history index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub uri: String,
    pub title: String,
    pub visits: u32,
    pub last_visit: i64,
}
