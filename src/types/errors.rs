use thiserror::Error;

use super::tab::TabId;

// === TabError ===

/// Errors related to the tab registry.
#[derive(Debug, Error)]
pub enum TabError {
    /// Tab with the given ID was not found.
    #[error("Tab not found: {0}")]
    NotFound(TabId),
    /// A mark was requested for a character outside `a-z`, `A-Z`, `0-9`.
    #[error("Invalid mark: {0:?}")]
    InvalidMark(char),
}

// === DownloadError ===

/// Errors related to the download index.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Download with the given ID was not found.
    #[error("Download not found: {0}")]
    NotFound(u32),
    /// The download already reached a terminal state.
    #[error("Download already finished: {0}")]
    AlreadyFinished(u32),
}

// === HistoryError ===

/// Errors related to the history index.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// No history entry for the given URI.
    #[error("History entry not found: {0}")]
    NotFound(String),
    /// Recording is switched off.
    #[error("History recording is disabled")]
    RecordingDisabled,
}

// === FavoriteError ===

/// Errors related to the favorites file.
#[derive(Debug, Error)]
pub enum FavoriteError {
    /// No favorite at the given index.
    #[error("Favorite not found: {0}")]
    NotFound(usize),
    /// The favorites file could not be read or written.
    #[error("Favorites I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A favorite needs both a title and a URI.
    #[error("Invalid favorite: {0}")]
    Invalid(String),
}

// === CookieError ===

/// Errors related to the cookie jars.
#[derive(Debug, Error)]
pub enum CookieError {
    /// No session cookie at the given index.
    #[error("Cookie not found: {0}")]
    NotFound(usize),
    /// The persistent jar failed.
    #[error("Cookie database error: {0}")]
    Database(#[from] rusqlite::Error),
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    #[error("Settings I/O error: {0}")]
    IoError(String),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The provided settings key is invalid.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided settings value is invalid.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

// === XtpError ===

/// Errors raised while handling `xxxt://` command URLs.
#[derive(Debug, Error, PartialEq)]
pub enum XtpError {
    /// The URL does not have the `xxxt://class/key/cmd[/arg]` shape.
    #[error("Malformed xtp url: {0}")]
    Malformed(String),
    /// The class number is not one of the known page classes.
    #[error("Unknown xtp class: {0}")]
    UnknownClass(String),
    /// The session key does not match the one issued for the class.
    #[error("Invalid xtp session key for class {0}")]
    BadKey(u8),
    /// The command is not valid for the class.
    #[error("Unknown xtp command: {0}")]
    UnknownCommand(String),
    /// The command argument is missing or not a number.
    #[error("Invalid xtp argument: {0}")]
    BadArgument(String),
    /// The system random generator failed while creating session keys.
    #[error("Failed to generate xtp session keys")]
    KeyGeneration,
}

// === WorkerError ===

/// Errors raised by per-tab worker threads.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The tab already has a job in flight.
    #[error("Tab {0} already has a worker running")]
    Busy(TabId),
    /// Worker threads are disabled by configuration.
    #[error("Worker threads are disabled")]
    Disabled,
    /// The worker could not be spawned.
    #[error("Failed to spawn worker: {0}")]
    Spawn(#[from] std::io::Error),
    /// The network request failed.
    #[error("Fetch failed: {0}")]
    Fetch(String),
}

// === BrowserError ===

/// Top-level error for operations driven through [`crate::app::App`].
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error(transparent)]
    Tab(#[from] TabError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Favorite(#[from] FavoriteError),
    #[error(transparent)]
    Cookie(#[from] CookieError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Xtp(#[from] XtpError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    /// An `about:` page name missing from the about table.
    #[error("Unknown about page: {0}")]
    UnknownAboutPage(String),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
