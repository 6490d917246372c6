//! App core for xxxterm.
//!
//! Central struct holding the registries, the cookie jars, settings and the
//! per-tab workers. Everything the UI does to browser state goes through here.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};

use crate::about::{self, html, InternalUri};
use crate::about::xtp::XtpKeys;
use crate::database::Database;
use crate::managers::cookie_manager::{CookieManager, CookieManagerTrait, CookiePolicy};
use crate::managers::download_manager::{DownloadManager, DownloadManagerTrait};
use crate::managers::favorites_manager::{FavoritesManager, FavoritesManagerTrait};
use crate::managers::history_manager::{HistoryManager, HistoryManagerTrait};
use crate::managers::tab_manager::{TabManager, TabManagerTrait};
use crate::managers::whitelist_manager::{host_of, WhitelistManager, WhitelistTrait};
use crate::platform;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::tab_workers::{TabWorkers, WorkerResult};
use crate::types::about::{AboutPage, Karg};
use crate::types::cookie::Cookie;
use crate::types::errors::{BrowserError, TabError};
use crate::types::settings::BrowserSettings;
use crate::types::tab::{InspectorCmd, TabId, XtpMeaning};
use crate::view::{ContentPolicy, ViewFactory};

/// Central application struct holding all managers and services.
pub struct App {
    pub settings_engine: SettingsEngine,
    pub tab_manager: TabManager,
    pub download_manager: DownloadManager,
    pub history_manager: HistoryManager,
    pub favorites_manager: FavoritesManager,
    pub cookie_manager: CookieManager,
    pub whitelists: WhitelistManager,
    pub workers: TabWorkers,
    pub xtp_keys: XtpKeys,
}

fn cookie_policy(settings: &BrowserSettings) -> CookiePolicy {
    CookiePolicy {
        enable_whitelist: settings.privacy.enable_cookie_whitelist,
        save_rejected: settings.privacy.save_rejected_cookies,
    }
}

/// Turn what the user typed into something the engine can load.
pub fn normalize_uri(input: &str) -> String {
    let input = input.trim();
    if input.is_empty() {
        return "about:blank".to_string();
    }
    if input.contains("://") || input.starts_with("about:") || input.starts_with("data:") {
        return input.to_string();
    }
    if input.starts_with('/') {
        return format!("file://{}", input);
    }
    format!("https://{}", input)
}

impl App {
    /// Loads settings (falling back to defaults when the rc file is unusable)
    /// and opens the persistent cookie jar in the working directory.
    pub fn new(mut settings_engine: SettingsEngine, make_view: ViewFactory) -> Result<Self, BrowserError> {
        if let Err(e) = settings_engine.load() {
            warn!("settings: {}; using defaults", e);
        }
        let work_dir = PathBuf::from(&settings_engine.get_settings().paths.work_dir);
        fs::create_dir_all(&work_dir)?;
        let db = Database::open(work_dir.join(platform::COOKIE_DB_FILE))?;
        Self::with_database(settings_engine, make_view, db)
    }

    /// Builds the app around an already opened database, with settings as
    /// they are in `settings_engine`.
    pub fn with_database(
        settings_engine: SettingsEngine,
        make_view: ViewFactory,
        db: Database,
    ) -> Result<Self, BrowserError> {
        let settings = settings_engine.get_settings().clone();
        let privacy = &settings.privacy;

        let cookie_manager = CookieManager::new(db, cookie_policy(&settings))?;
        let whitelists = WhitelistManager::new(&privacy.cookie_wl, &privacy.js_wl, &privacy.pl_wl);

        let mut favorites_manager =
            FavoritesManager::new(Path::new(&settings.paths.work_dir).join(platform::FAVORITES_FILE));
        match favorites_manager.load() {
            Ok(n) => debug!("favorites: {} loaded", n),
            Err(e) => warn!("favorites: {}", e),
        }

        let workers = TabWorkers::new(
            settings.network.use_threads,
            Duration::from_secs(settings.network.worker_timeout_secs),
        );

        let mut history_manager = HistoryManager::new();
        history_manager.set_recording_enabled(privacy.enable_history);

        Ok(Self {
            settings_engine,
            tab_manager: TabManager::new(make_view),
            download_manager: DownloadManager::new(),
            history_manager,
            favorites_manager,
            cookie_manager,
            whitelists,
            workers,
            xtp_keys: XtpKeys::generate()?,
        })
    }

    fn settings(&self) -> &BrowserSettings {
        self.settings_engine.get_settings()
    }

    // --- tabs ---

    /// Open a tab showing `uri`, or the home page.
    pub fn open_tab(&mut self, uri: Option<&str>, focus: bool) -> TabId {
        let id = self.tab_manager.create_tab(focus);
        let user_agent = self.settings().general.user_agent.clone();
        if let Some(tab) = self.tab_manager.get_tab_mut(id) {
            tab.user_agent = user_agent;
            tab.new_tab = true;
        }
        let target = uri
            .map(str::to_string)
            .unwrap_or_else(|| self.settings().general.home.clone());
        if let Err(e) = self.navigate(id, &target) {
            debug!("tab {}: initial load of {} failed: {}", id, target, e);
        }
        id
    }

    pub fn close_tab(&mut self, tab: TabId) -> Result<(), BrowserError> {
        self.tab_manager.close_tab(tab)?;
        self.workers.forget(tab);
        Ok(())
    }

    /// Load `uri` into `tab` as a new entry of its back/forward list.
    ///
    /// `about:` names go to the dispatcher and `xxxt://` commands to the xtp
    /// handler; failures of either leave the oops page in the tab.
    pub fn navigate(&mut self, tab: TabId, uri: &str) -> Result<(), BrowserError> {
        let uri = uri.trim();
        if self.tab_manager.get_tab(tab).is_none() {
            return Err(TabError::NotFound(tab).into());
        }
        let target = match about::parse_internal_uri(uri) {
            Some(InternalUri::Xtp(_)) => return about::handle_xtp(self, tab, uri),
            Some(InternalUri::About(_)) => uri.to_string(),
            None => normalize_uri(uri),
        };

        if let Some(t) = self.tab_manager.get_tab_mut(tab) {
            t.new_tab = false;
            t.history.navigate(&target, "");
        }
        self.load(tab, &target)
    }

    /// Load without touching the back/forward list.
    fn load(&mut self, tab: TabId, uri: &str) -> Result<(), BrowserError> {
        match about::parse_internal_uri(uri) {
            Some(InternalUri::About(name)) => {
                about::dispatch(self, tab, name, &about::args_from_uri(uri)).map(|_| ())
            }
            Some(InternalUri::Xtp(_)) => about::handle_xtp(self, tab, uri),
            None => {
                let policy = self.content_policy(uri);
                let t = self.tab_manager.get_tab_mut(tab).ok_or(TabError::NotFound(tab))?;
                t.set_policy(policy);
                t.load_uri(uri);
                debug!("tab {}: loading {}", tab, uri);
                Ok(())
            }
        }
    }

    /// The engine finished loading a network page.
    pub fn page_loaded(&mut self, tab: TabId, uri: &str, title: &str) -> Result<(), BrowserError> {
        if about::parse_internal_uri(uri).is_some() {
            return Ok(());
        }
        let t = self.tab_manager.get_tab_mut(tab).ok_or(TabError::NotFound(tab))?;
        if t.uri != uri {
            // Redirects and in-page links change the URI behind our back.
            t.uri = uri.to_string();
            t.chrome.uri_entry = uri.to_string();
            t.content = None;
            t.history.navigate(uri, title);
        }
        t.chrome.spinner = false;
        t.set_meaning(XtpMeaning::Normal);
        t.set_title(if title.is_empty() { uri } else { title });
        if let Some(css) = t.stylesheet.clone() {
            t.set_style(&css);
        }
        // Again for the new document: plugins are stripped once it exists.
        let policy = self.content_policy(uri);
        if let Some(t) = self.tab_manager.get_tab_mut(tab) {
            t.set_policy(policy);
        }

        if self.history_manager.is_recording_enabled() {
            match self.history_manager.record_visit(uri, title) {
                Ok(()) => about::refresh_tabs(self, AboutPage::History),
                Err(e) => debug!("history: {}", e),
            }
        }

        if self.settings().network.fetch_favicons && self.workers.is_enabled() {
            if let Err(e) = self.workers.spawn_favicon(tab, uri) {
                debug!("tab {}: no favicon fetch: {}", tab, e);
            }
        }
        Ok(())
    }

    /// Title changes reported by the engine after load.
    pub fn title_changed(&mut self, tab: TabId, title: &str) -> Result<(), BrowserError> {
        let t = self.tab_manager.get_tab_mut(tab).ok_or(TabError::NotFound(tab))?;
        if t.is_internal() {
            return Ok(());
        }
        t.set_title(title);
        let uri = t.uri.clone();
        if !title.is_empty() && self.history_manager.get(&uri).is_some_and(|e| e.title != title) {
            self.history_manager.set_title(&uri, title)?;
            about::refresh_tabs(self, AboutPage::History);
        }
        Ok(())
    }

    pub fn go_back(&mut self, tab: TabId) -> Result<bool, BrowserError> {
        let t = self.tab_manager.get_tab_mut(tab).ok_or(TabError::NotFound(tab))?;
        let Some(entry) = t.history.back() else {
            return Ok(false);
        };
        let uri = entry.uri.clone();
        self.load(tab, &uri)?;
        Ok(true)
    }

    pub fn go_forward(&mut self, tab: TabId) -> Result<bool, BrowserError> {
        let t = self.tab_manager.get_tab_mut(tab).ok_or(TabError::NotFound(tab))?;
        let Some(entry) = t.history.forward() else {
            return Ok(false);
        };
        let uri = entry.uri.clone();
        self.load(tab, &uri)?;
        Ok(true)
    }

    /// Internal pages are rendered again; network pages are reloaded by the
    /// engine.
    pub fn reload(&mut self, tab: TabId) -> Result<(), BrowserError> {
        let t = self.tab_manager.get_tab_mut(tab).ok_or(TabError::NotFound(tab))?;
        match t.xtp_meaning {
            XtpMeaning::About(page) => about::dispatch(self, tab, page.name(), &Karg::default()).map(|_| ()),
            XtpMeaning::Normal => {
                t.chrome.spinner = true;
                t.view.reload();
                Ok(())
            }
        }
    }

    /// Show an error page in `tab`. The tab keeps a `Normal` meaning so no
    /// refresh ever overwrites it.
    pub fn show_oops(&mut self, tab: TabId, msg: &str) {
        warn!("tab {}: {}", tab, msg);
        let body = format!(
            "<p class=\"oops\">{}</p><p><a href=\"about:help\">help</a></p>",
            html::escape(msg)
        );
        let page = html::page(None, "Oops!", &body, "");
        if let Some(t) = self.tab_manager.get_tab_mut(tab) {
            t.load_html(page, "about:oops");
            t.set_meaning(XtpMeaning::Normal);
            t.set_title("Oops!");
            t.chrome.oops = Some(msg.to_string());
        }
    }

    pub fn load_html_string(&mut self, tab: TabId, html: String, uri: &str) -> Result<(), TabError> {
        let t = self.tab_manager.get_tab_mut(tab).ok_or(TabError::NotFound(tab))?;
        t.chrome.oops = None;
        t.load_html(html, uri);
        Ok(())
    }

    // --- downloads ---

    /// Register a download the engine is about to start. Without an explicit
    /// destination the file goes to the platform download directory.
    pub fn start_download(&mut self, uri: &str, destination: Option<&Path>, tab: Option<TabId>) -> u32 {
        let destination = match destination {
            Some(p) => p.to_path_buf(),
            None => platform::download_dir().join(suggested_filename(uri)),
        };
        let id = self
            .download_manager
            .start(uri, &destination.to_string_lossy(), tab);
        about::refresh_tabs(self, AboutPage::Downloads);
        id
    }

    pub fn download_progress(&mut self, id: u32, received: u64, total: Option<u64>) -> Result<(), BrowserError> {
        self.download_manager.update_progress(id, received, total)?;
        Ok(())
    }

    pub fn finish_download(&mut self, id: u32) -> Result<(), BrowserError> {
        self.download_manager.finish(id)?;
        about::refresh_tabs(self, AboutPage::Downloads);
        Ok(())
    }

    pub fn fail_download(&mut self, id: u32, reason: &str) -> Result<(), BrowserError> {
        self.download_manager.fail(id, reason)?;
        about::refresh_tabs(self, AboutPage::Downloads);
        Ok(())
    }

    pub fn cancel_download(&mut self, id: u32) -> Result<(), BrowserError> {
        self.download_manager.cancel(id)?;
        about::refresh_tabs(self, AboutPage::Downloads);
        Ok(())
    }

    /// Completion as reported by the engine, which only knows the URI.
    pub fn download_completed_by_uri(&mut self, uri: &str, success: bool) -> Result<(), BrowserError> {
        let Some(id) = self.download_manager.find_by_uri(uri).map(|d| d.id) else {
            warn!("completion for unknown download {}", uri);
            return Ok(());
        };
        if success {
            self.finish_download(id)
        } else {
            self.fail_download(id, "transfer failed")
        }
    }

    // --- favorites, cookies, settings ---

    /// Add the page shown in `tab` to the favorites.
    pub fn add_favorite(&mut self, tab: TabId) -> Result<usize, BrowserError> {
        let t = self.tab_manager.get_tab(tab).ok_or(TabError::NotFound(tab))?;
        let (title, uri) = (t.title.clone(), t.uri.clone());
        let index = self.favorites_manager.add(&title, &uri)?;
        about::refresh_tabs(self, AboutPage::Favorites);
        Ok(index)
    }

    /// Offer a cookie set by a page. Returns whether it was accepted.
    pub fn offer_cookie(&mut self, cookie: Cookie) -> Result<bool, BrowserError> {
        let accepted = self.cookie_manager.offer(cookie, &self.whitelists.cookies)?;
        about::refresh_tabs(self, AboutPage::CookieJar);
        Ok(accepted)
    }

    /// Whether scripts may run on `uri`.
    pub fn scripts_allowed(&self, uri: &str) -> bool {
        if self.settings().privacy.enable_scripts {
            return true;
        }
        host_of(uri).is_some_and(|h| self.whitelists.javascript.allows(h))
    }

    /// Whether embedded plugin content may stay on `uri`.
    pub fn plugins_allowed(&self, uri: &str) -> bool {
        if self.settings().privacy.enable_plugins {
            return true;
        }
        host_of(uri).is_some_and(|h| self.whitelists.plugins.allows(h))
    }

    pub fn content_policy(&self, uri: &str) -> ContentPolicy {
        ContentPolicy {
            scripts: self.scripts_allowed(uri),
            plugins: self.plugins_allowed(uri),
        }
    }

    /// Run the engine's cookies for a page through the jar. Returns the
    /// rejected ones, which the engine should drop.
    pub fn sync_cookies(&mut self, cookies: Vec<Cookie>) -> Result<Vec<Cookie>, BrowserError> {
        let mut rejected = Vec::new();
        for cookie in cookies {
            let known = self.cookie_manager.cookies().into_iter().any(|c| c == &cookie);
            if known {
                continue;
            }
            if !self.cookie_manager.offer(cookie.clone(), &self.whitelists.cookies)? {
                rejected.push(cookie);
            }
        }
        about::refresh_tabs(self, AboutPage::CookieJar);
        Ok(rejected)
    }

    /// Toggle the user stylesheet `<resource_dir>/style.css` on `tab`.
    /// Returns whether the tab is styled afterwards.
    pub fn toggle_style(&mut self, tab: TabId) -> Result<bool, BrowserError> {
        let path = Path::new(&self.settings().paths.resource_dir).join(platform::STYLESHEET_FILE);
        let t = self.tab_manager.get_tab_mut(tab).ok_or(TabError::NotFound(tab))?;
        if t.styled {
            t.clear_style();
            return Ok(false);
        }
        let css = fs::read_to_string(&path)?;
        t.set_style(&css);
        debug!("tab {}: styled with {}", tab, path.display());
        Ok(true)
    }

    /// Show, hide or close the web inspector of `tab`.
    pub fn inspector(&mut self, tab: TabId, cmd: InspectorCmd) -> Result<bool, BrowserError> {
        let t = self.tab_manager.get_tab_mut(tab).ok_or(TabError::NotFound(tab))?;
        Ok(t.inspector(cmd))
    }

    /// Change one setting by dot path and apply it to the running browser.
    pub fn set_setting(&mut self, key: &str, raw: &str) -> Result<(), BrowserError> {
        self.settings_engine.set_from_str(key, raw)?;
        self.apply_settings();
        about::refresh_tabs(self, AboutPage::Set);
        Ok(())
    }

    fn apply_settings(&mut self) {
        let settings = self.settings().clone();
        let privacy = &settings.privacy;
        self.whitelists = WhitelistManager::new(&privacy.cookie_wl, &privacy.js_wl, &privacy.pl_wl);
        self.cookie_manager.set_policy(cookie_policy(&settings));
        self.workers.set_enabled(settings.network.use_threads);
        self.history_manager.set_recording_enabled(privacy.enable_history);
        for page in [AboutPage::CookieWhitelist, AboutPage::JsWhitelist, AboutPage::PluginWhitelist] {
            about::refresh_tabs(self, page);
        }
    }

    // --- workers ---

    /// Apply finished worker results. Results for closed tabs are dropped.
    pub fn poll_workers(&mut self) -> usize {
        let mut applied = 0;
        for msg in self.workers.drain() {
            let Some(tab) = self.tab_manager.get_tab_mut(msg.tab) else {
                debug!("tab {}: closed before its worker finished", msg.tab);
                continue;
            };
            match msg.result {
                Ok(WorkerResult::Favicon(data_uri)) => {
                    tab.icon = Some(data_uri);
                    applied += 1;
                }
                Err(e) => debug!("tab {}: worker failed: {}", msg.tab, e),
            }
        }
        applied
    }

    // --- lifecycle ---

    /// Startup sequence: open the first tab when none exists.
    pub fn startup(&mut self, uris: &[String]) {
        info!(
            "xxxterm starting: rc {}, work dir {}",
            self.settings_engine.get_config_path(),
            self.settings().paths.work_dir
        );
        for uri in uris {
            self.open_tab(Some(uri), false);
        }
        if self.tab_manager.tab_count() == 0 {
            self.open_tab(None, true);
        }
    }

    /// Shutdown sequence: close every tab and drop session-only state.
    pub fn shutdown(&mut self) {
        for id in self.tab_manager.tab_ids() {
            let _ = self.close_tab(id);
        }
        self.cookie_manager.clear_session();
        info!("xxxterm shut down");
    }
}

/// Last path segment of `uri`, or `download` when there is none.
pub fn suggested_filename(uri: &str) -> String {
    uri.split(['?', '#'])
        .next()
        .and_then(|u| u.rsplit('/').next())
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .unwrap_or("download")
        .to_string()
}
