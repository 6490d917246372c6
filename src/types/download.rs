use serde::{Deserialize, Serialize};

use super::tab::TabId;

/// Lifecycle of a download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DownloadState {
    Created,
    Started,
    Finished,
    Cancelled,
    Error(String),
}

impl DownloadState {
    /// Finished, cancelled and failed downloads no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadState::Finished | DownloadState::Cancelled | DownloadState::Error(_)
        )
    }

    pub fn label(&self) -> &str {
        match self {
            DownloadState::Created => "Created",
            DownloadState::Started => "Downloading",
            DownloadState::Finished => "Finished",
            DownloadState::Cancelled => "Cancelled",
            DownloadState::Error(_) => "Error",
        }
    }
}

/// A download tracked by the browser. The bytes move through the rendering
/// engine; this is the bookkeeping side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Download {
    pub id: u32,
    pub uri: String,
    pub filename: String,
    pub destination: String,
    pub state: DownloadState,
    pub received: u64,
    pub total: Option<u64>,
    pub tab: Option<TabId>,
    pub started_at: i64,
}

impl Download {
    /// Progress in percent, when the total size is known.
    pub fn percent(&self) -> Option<u8> {
        match self.total {
            Some(0) => Some(100),
            Some(total) => Some(((self.received.min(total) * 100) / total) as u8),
            None => None,
        }
    }
}
