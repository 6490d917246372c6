use serde::{Deserialize, Serialize};

use crate::platform;

/// Top-level browser settings container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BrowserSettings {
    pub general: GeneralSettings,
    pub paths: PathSettings,
    pub privacy: PrivacySettings,
    pub network: NetworkSettings,
}

/// General browser settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralSettings {
    pub home: String,
    pub user_agent: Option<String>,
    /// Seconds between automatic refreshes of the downloads page.
    pub refresh_interval: u32,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            home: "about:startpage".to_string(),
            user_agent: None,
            refresh_interval: 10,
        }
    }
}

/// Files and directories the browser reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathSettings {
    pub work_dir: String,
    pub resource_dir: String,
    pub ssl_ca_file: Option<String>,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            work_dir: platform::work_dir().to_string_lossy().to_string(),
            resource_dir: platform::resource_dir().to_string_lossy().to_string(),
            ssl_ca_file: None,
        }
    }
}

/// Cookie, script and plugin policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrivacySettings {
    pub enable_cookie_whitelist: bool,
    pub save_rejected_cookies: bool,
    pub enable_scripts: bool,
    pub enable_plugins: bool,
    /// Record finished page loads in history.
    pub enable_history: bool,
    pub cookie_wl: Vec<String>,
    pub js_wl: Vec<String>,
    pub pl_wl: Vec<String>,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            enable_cookie_whitelist: true,
            save_rejected_cookies: false,
            enable_scripts: false,
            enable_plugins: false,
            enable_history: true,
            cookie_wl: Vec::new(),
            js_wl: Vec::new(),
            pl_wl: Vec::new(),
        }
    }
}

/// Background network work done outside the rendering engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkSettings {
    /// Run blocking network calls on per-tab worker threads.
    pub use_threads: bool,
    pub fetch_favicons: bool,
    pub worker_timeout_secs: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            use_threads: true,
            fetch_favicons: true,
            worker_timeout_secs: 15,
        }
    }
}
