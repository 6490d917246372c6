//! Seam between browser state and the rendering engine.
//!
//! Each tab owns one [`WebView`]. The GUI build backs it with the `wry`
//! view; the console demo and the tests use [`HeadlessView`].

use std::sync::{Arc, Mutex};

use crate::types::tab::TabId;

/// Operations the browser needs from a rendering-engine view.
pub trait WebView: Send {
    fn load_uri(&mut self, uri: &str);
    fn load_html(&mut self, html: &str, base_uri: &str);
    fn reload(&mut self);
    fn stop(&mut self);
    fn search(&mut self, text: &str, forward: bool);
    fn set_stylesheet(&mut self, css: Option<&str>);
    /// Scripts and plugins allowed on the page being loaded.
    fn set_policy(&mut self, policy: ContentPolicy);
    fn show_inspector(&mut self, visible: bool);
}

/// Per-page content policy from the script and plugin whitelists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentPolicy {
    pub scripts: bool,
    pub plugins: bool,
}

/// Builds the view for a freshly created tab.
pub type ViewFactory = Box<dyn FnMut(TabId) -> Box<dyn WebView> + Send>;

/// Something a [`HeadlessView`] was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    LoadUri(String),
    LoadHtml { uri: String, html: String },
    Reload,
    Stop,
    Search { text: String, forward: bool },
    Stylesheet(Option<String>),
    Policy(ContentPolicy),
    Inspector(bool),
}

/// Shared, inspectable record of view events.
pub type ViewLog = Arc<Mutex<Vec<(TabId, ViewEvent)>>>;

/// A view that renders nothing and records every request.
pub struct HeadlessView {
    tab: TabId,
    log: ViewLog,
}

impl HeadlessView {
    pub fn new(tab: TabId, log: ViewLog) -> Self {
        Self { tab, log }
    }

    /// A factory producing headless views that all write into `log`.
    pub fn factory(log: ViewLog) -> ViewFactory {
        Box::new(move |tab| Box::new(HeadlessView::new(tab, log.clone())) as Box<dyn WebView>)
    }

    fn record(&self, event: ViewEvent) {
        if let Ok(mut log) = self.log.lock() {
            log.push((self.tab, event));
        }
    }
}

impl WebView for HeadlessView {
    fn load_uri(&mut self, uri: &str) {
        self.record(ViewEvent::LoadUri(uri.to_string()));
    }

    fn load_html(&mut self, html: &str, base_uri: &str) {
        self.record(ViewEvent::LoadHtml {
            uri: base_uri.to_string(),
            html: html.to_string(),
        });
    }

    fn reload(&mut self) {
        self.record(ViewEvent::Reload);
    }

    fn stop(&mut self) {
        self.record(ViewEvent::Stop);
    }

    fn search(&mut self, text: &str, forward: bool) {
        self.record(ViewEvent::Search {
            text: text.to_string(),
            forward,
        });
    }

    fn set_stylesheet(&mut self, css: Option<&str>) {
        self.record(ViewEvent::Stylesheet(css.map(str::to_string)));
    }

    fn set_policy(&mut self, policy: ContentPolicy) {
        self.record(ViewEvent::Policy(policy));
    }

    fn show_inspector(&mut self, visible: bool) {
        self.record(ViewEvent::Inspector(visible));
    }
}
