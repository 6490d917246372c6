//! Download index.
//!
//! Downloads are keyed by a numeric id in an ordered map, so the downloads
//! page lists them oldest first without sorting.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{info, warn};

use crate::types::download::{Download, DownloadState};
use crate::types::errors::DownloadError;
use crate::types::tab::TabId;

/// Trait defining download index operations.
pub trait DownloadManagerTrait {
    fn start(&mut self, uri: &str, destination: &str, tab: Option<TabId>) -> u32;
    fn get(&self, id: u32) -> Option<&Download>;
    fn find_by_uri(&self, uri: &str) -> Option<&Download>;
    fn update_progress(&mut self, id: u32, received: u64, total: Option<u64>) -> Result<(), DownloadError>;
    fn finish(&mut self, id: u32) -> Result<(), DownloadError>;
    fn fail(&mut self, id: u32, reason: &str) -> Result<(), DownloadError>;
    fn cancel(&mut self, id: u32) -> Result<(), DownloadError>;
    fn remove(&mut self, id: u32) -> Result<Download, DownloadError>;
    fn clear_inactive(&mut self) -> usize;
    fn iter(&self) -> std::collections::btree_map::Values<'_, u32, Download>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
}

/// Ordered in-memory download index.
pub struct DownloadManager {
    downloads: BTreeMap<u32, Download>,
    next_id: u32,
}

impl DownloadManager {
    pub fn new() -> Self {
        Self {
            downloads: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn now_ts() -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
    }

    fn live_mut(&mut self, id: u32) -> Result<&mut Download, DownloadError> {
        let dl = self.downloads.get_mut(&id).ok_or(DownloadError::NotFound(id))?;
        if dl.state.is_terminal() {
            return Err(DownloadError::AlreadyFinished(id));
        }
        Ok(dl)
    }
}

impl Default for DownloadManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadManagerTrait for DownloadManager {
    /// Register a new download and return its id.
    fn start(&mut self, uri: &str, destination: &str, tab: Option<TabId>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        let filename = Path::new(destination)
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| destination.to_string());

        self.downloads.insert(
            id,
            Download {
                id,
                uri: uri.to_string(),
                filename,
                destination: destination.to_string(),
                state: DownloadState::Created,
                received: 0,
                total: None,
                tab,
                started_at: Self::now_ts(),
            },
        );
        info!("download {} started: {} -> {}", id, uri, destination);
        id
    }

    fn get(&self, id: u32) -> Option<&Download> {
        self.downloads.get(&id)
    }

    /// Most recent live download for `uri`, falling back to any entry.
    fn find_by_uri(&self, uri: &str) -> Option<&Download> {
        self.downloads
            .values()
            .rev()
            .find(|d| d.uri == uri && !d.state.is_terminal())
            .or_else(|| self.downloads.values().rev().find(|d| d.uri == uri))
    }

    fn update_progress(&mut self, id: u32, received: u64, total: Option<u64>) -> Result<(), DownloadError> {
        let dl = self.live_mut(id)?;
        dl.state = DownloadState::Started;
        dl.received = received;
        if total.is_some() {
            dl.total = total;
        }
        Ok(())
    }

    fn finish(&mut self, id: u32) -> Result<(), DownloadError> {
        let dl = self.live_mut(id)?;
        dl.state = DownloadState::Finished;
        if let Some(total) = dl.total {
            dl.received = total;
        }
        info!("download {} finished", id);
        Ok(())
    }

    fn fail(&mut self, id: u32, reason: &str) -> Result<(), DownloadError> {
        let dl = self.live_mut(id)?;
        dl.state = DownloadState::Error(reason.to_string());
        warn!("download {} failed: {}", id, reason);
        Ok(())
    }

    fn cancel(&mut self, id: u32) -> Result<(), DownloadError> {
        let dl = self.live_mut(id)?;
        dl.state = DownloadState::Cancelled;
        info!("download {} cancelled", id);
        Ok(())
    }

    fn remove(&mut self, id: u32) -> Result<Download, DownloadError> {
        self.downloads.remove(&id).ok_or(DownloadError::NotFound(id))
    }

    /// Drop every finished, cancelled or failed download. Returns how many went.
    fn clear_inactive(&mut self) -> usize {
        let before = self.downloads.len();
        self.downloads.retain(|_, d| !d.state.is_terminal());
        before - self.downloads.len()
    }

    fn iter(&self) -> std::collections::btree_map::Values<'_, u32, Download> {
        self.downloads.values()
    }

    fn len(&self) -> usize {
        self.downloads.len()
    }

    fn is_empty(&self) -> bool {
        self.downloads.is_empty()
    }
}
