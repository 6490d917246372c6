//! History index.
//!
//! Implements `HistoryManagerTrait`: visited pages keyed by URI, so a
//! revisit updates the existing entry instead of adding a duplicate.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::types::errors::HistoryError;
use crate::types::history::HistoryEntry;

/// Trait defining history index operations.
pub trait HistoryManagerTrait {
    fn record_visit(&mut self, uri: &str, title: &str) -> Result<(), HistoryError>;
    fn get(&self, uri: &str) -> Option<&HistoryEntry>;
    fn set_title(&mut self, uri: &str, title: &str) -> Result<(), HistoryError>;
    fn remove(&mut self, uri: &str) -> Result<HistoryEntry, HistoryError>;
    fn clear(&mut self);
    fn search(&self, query: &str) -> Vec<&HistoryEntry>;
    fn iter(&self) -> std::collections::btree_map::Values<'_, String, HistoryEntry>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
    fn is_recording_enabled(&self) -> bool;
    fn set_recording_enabled(&mut self, enabled: bool);
}

/// Ordered in-memory history index.
pub struct HistoryManager {
    entries: BTreeMap<String, HistoryEntry>,
    recording_enabled: bool,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            recording_enabled: true,
        }
    }

    /// Returns the current UNIX timestamp in seconds.
    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    /// Internal pages never go into history.
    pub fn is_recordable(uri: &str) -> bool {
        !(uri.is_empty() || uri.starts_with("about:") || uri.starts_with("xxxt://"))
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryManagerTrait for HistoryManager {
    /// Records a page visit. An existing URI gets the new title and one more
    /// visit. Internal URIs are ignored.
    fn record_visit(&mut self, uri: &str, title: &str) -> Result<(), HistoryError> {
        if !self.recording_enabled {
            return Err(HistoryError::RecordingDisabled);
        }
        if !Self::is_recordable(uri) {
            return Ok(());
        }

        let now = Self::now();
        match self.entries.get_mut(uri) {
            Some(entry) => {
                if !title.is_empty() {
                    entry.title = title.to_string();
                }
                entry.visits += 1;
                entry.last_visit = now;
            }
            None => {
                debug!("history: new entry {}", uri);
                self.entries.insert(
                    uri.to_string(),
                    HistoryEntry {
                        uri: uri.to_string(),
                        title: title.to_string(),
                        visits: 1,
                        last_visit: now,
                    },
                );
            }
        }
        Ok(())
    }

    fn get(&self, uri: &str) -> Option<&HistoryEntry> {
        self.entries.get(uri)
    }

    /// Retitle an existing entry; visits and last visit are left alone.
    fn set_title(&mut self, uri: &str, title: &str) -> Result<(), HistoryError> {
        let entry = self
            .entries
            .get_mut(uri)
            .ok_or_else(|| HistoryError::NotFound(uri.to_string()))?;
        if !title.is_empty() {
            entry.title = title.to_string();
        }
        Ok(())
    }

    fn remove(&mut self, uri: &str) -> Result<HistoryEntry, HistoryError> {
        self.entries
            .remove(uri)
            .ok_or_else(|| HistoryError::NotFound(uri.to_string()))
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    /// Case-insensitive substring match on URI or title, in URI order.
    fn search(&self, query: &str) -> Vec<&HistoryEntry> {
        let needle = query.to_lowercase();
        self.entries
            .values()
            .filter(|e| {
                e.uri.to_lowercase().contains(&needle) || e.title.to_lowercase().contains(&needle)
            })
            .collect()
    }

    fn iter(&self) -> std::collections::btree_map::Values<'_, String, HistoryEntry> {
        self.entries.values()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_recording_enabled(&self) -> bool {
        self.recording_enabled
    }

    /// Enables or disables recording.
    fn set_recording_enabled(&mut self, enabled: bool) {
        self.recording_enabled = enabled;
    }
}
