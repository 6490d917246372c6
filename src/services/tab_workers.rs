//! Per-tab worker threads.
//!
//! Blocking network calls (favicon fetches) run off the UI thread, at most
//! one per tab. Results travel back over a channel and are applied by the
//! owner of the tab registry when it drains them.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::{debug, warn};

use crate::managers::whitelist_manager::host_of;
use crate::types::errors::WorkerError;
use crate::types::tab::TabId;

/// What a finished job produced.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerResult {
    /// Favicon as a `data:` URI.
    Favicon(String),
}

/// A job's outcome tagged with the tab that asked for it.
#[derive(Debug)]
pub struct WorkerMessage {
    pub tab: TabId,
    pub result: Result<WorkerResult, WorkerError>,
}

pub struct TabWorkers {
    enabled: bool,
    timeout: Duration,
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
    running: HashMap<TabId, JoinHandle<()>>,
}

impl TabWorkers {
    pub fn new(enabled: bool, timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            enabled,
            timeout,
            tx,
            rx,
            running: HashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_busy(&self, tab: TabId) -> bool {
        self.running.get(&tab).is_some_and(|h| !h.is_finished())
    }

    pub fn running(&self) -> usize {
        self.running.values().filter(|h| !h.is_finished()).count()
    }

    /// Run `job` on a new thread for `tab`. Refused while the tab already
    /// has a job in flight.
    pub fn spawn<F>(&mut self, tab: TabId, job: F) -> Result<(), WorkerError>
    where
        F: FnOnce() -> Result<WorkerResult, WorkerError> + Send + 'static,
    {
        if !self.enabled {
            return Err(WorkerError::Disabled);
        }
        if self.is_busy(tab) {
            return Err(WorkerError::Busy(tab));
        }
        let tx = self.tx.clone();
        let handle = thread::Builder::new()
            .name(format!("tab-{}-worker", tab))
            .spawn(move || {
                let result = job();
                // The receiver only goes away with the browser itself.
                let _ = tx.send(WorkerMessage { tab, result });
            })?;
        debug!("tab {}: worker spawned", tab);
        self.running.insert(tab, handle);
        Ok(())
    }

    /// Fetch `/favicon.ico` for the site of `page_uri`.
    pub fn spawn_favicon(&mut self, tab: TabId, page_uri: &str) -> Result<(), WorkerError> {
        let icon_uri = favicon_uri(page_uri)
            .ok_or_else(|| WorkerError::Fetch(format!("no host in {}", page_uri)))?;
        let timeout = self.timeout;
        self.spawn(tab, move || fetch_favicon(&icon_uri, timeout))
    }

    /// Collect every finished job. Never blocks.
    pub fn drain(&mut self) -> Vec<WorkerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            if let Some(handle) = self.running.remove(&msg.tab) {
                if handle.join().is_err() {
                    warn!("tab {}: worker panicked", msg.tab);
                }
            }
            out.push(msg);
        }
        out
    }

    /// Stop tracking the worker of a closed tab. A late result is dropped
    /// by the caller because the tab no longer exists.
    pub fn forget(&mut self, tab: TabId) {
        self.running.remove(&tab);
    }
}

/// `scheme://host[:port]/favicon.ico` for an http(s) page.
pub fn favicon_uri(page_uri: &str) -> Option<String> {
    let (scheme, rest) = page_uri.split_once("://")?;
    if scheme != "http" && scheme != "https" {
        return None;
    }
    host_of(page_uri)?;
    let authority = rest.split(['/', '?', '#']).next()?;
    Some(format!("{}://{}/favicon.ico", scheme, authority))
}

fn fetch_favicon(icon_uri: &str, timeout: Duration) -> Result<WorkerResult, WorkerError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WorkerError::Fetch(e.to_string()))?;
        let resp = client
            .get(icon_uri)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| WorkerError::Fetch(e.to_string()))?;
        let mime = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/x-icon")
            .to_string();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| WorkerError::Fetch(e.to_string()))?;
        Ok(WorkerResult::Favicon(format!(
            "data:{};base64,{}",
            mime,
            BASE64.encode(&bytes)
        )))
    })
}
