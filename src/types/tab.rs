use std::fmt;

use serde::{Deserialize, Serialize};

use super::about::AboutPage;
use super::errors::TabError;
use crate::view::{ContentPolicy, WebView};

/// Number of mark slots: `a-z`, `A-Z` and `0-9`.
pub const MARK_COUNT: usize = ('z' as usize - 'a' as usize + 1) * 2 + 10;

/// Identifier of a tab, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a tab is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum XtpMeaning {
    /// A regular network page.
    #[default]
    Normal,
    /// One of the internal about pages.
    About(AboutPage),
}

/// Completion popup attached to the URI entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub items: Vec<String>,
    pub visible: bool,
}

/// State of the widgets that make up a tab's chrome.
///
/// Every widget belongs to exactly one tab and goes away with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabChrome {
    pub label: String,
    pub uri_entry: String,
    pub search_entry: String,
    pub statusbar: String,
    pub buffercmd: String,
    pub zoom: String,
    pub position: String,
    pub cmd: String,
    pub spinner: bool,
    /// Whether scripts may run on the loaded page.
    pub js_enabled: bool,
    pub oops: Option<String>,
    pub completion: Completion,
}

/// In-page search state.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    pub text: Option<String>,
    pub forward: bool,
    pub id: u32,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            text: None,
            forward: true,
            id: 0,
        }
    }
}

/// Named scroll positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Marks {
    slots: [Option<f64>; MARK_COUNT],
}

impl Default for Marks {
    fn default() -> Self {
        Self {
            slots: [None; MARK_COUNT],
        }
    }
}

impl Marks {
    /// Maps `a-z` to 0..26, `A-Z` to 26..52 and `0-9` to 52..62.
    pub fn index(c: char) -> Option<usize> {
        match c {
            'a'..='z' => Some(c as usize - 'a' as usize),
            'A'..='Z' => Some(26 + c as usize - 'A' as usize),
            '0'..='9' => Some(52 + c as usize - '0' as usize),
            _ => None,
        }
    }

    pub fn set(&mut self, c: char, position: f64) -> Result<(), TabError> {
        let i = Self::index(c).ok_or(TabError::InvalidMark(c))?;
        self.slots[i] = Some(position);
        Ok(())
    }

    pub fn get(&self, c: char) -> Option<f64> {
        Self::index(c).and_then(|i| self.slots[i])
    }
}

/// One entry of the per-tab back/forward list.
#[derive(Debug, Clone, PartialEq)]
pub struct NavEntry {
    pub uri: String,
    pub title: String,
}

/// Back/forward navigation list of a tab.
#[derive(Debug, Clone, Default)]
pub struct BackForwardList {
    back: Vec<NavEntry>,
    current: Option<NavEntry>,
    forward: Vec<NavEntry>,
}

impl BackForwardList {
    /// Push a new page. The current one moves to the back stack and the
    /// forward stack is dropped.
    pub fn navigate(&mut self, uri: &str, title: &str) {
        if let Some(entry) = self.current.take() {
            if entry.uri == uri {
                self.current = Some(NavEntry {
                    uri: uri.to_string(),
                    title: title.to_string(),
                });
                return;
            }
            self.back.push(entry);
        }
        self.forward.clear();
        self.current = Some(NavEntry {
            uri: uri.to_string(),
            title: title.to_string(),
        });
    }

    pub fn back(&mut self) -> Option<&NavEntry> {
        let prev = self.back.pop()?;
        if let Some(cur) = self.current.take() {
            self.forward.push(cur);
        }
        self.current = Some(prev);
        self.current.as_ref()
    }

    pub fn forward(&mut self) -> Option<&NavEntry> {
        let next = self.forward.pop()?;
        if let Some(cur) = self.current.take() {
            self.back.push(cur);
        }
        self.current = Some(next);
        self.current.as_ref()
    }

    pub fn set_title(&mut self, title: &str) {
        if let Some(cur) = self.current.as_mut() {
            cur.title = title.to_string();
        }
    }

    pub fn current(&self) -> Option<&NavEntry> {
        self.current.as_ref()
    }

    pub fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    pub fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }
}

/// Web inspector commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InspectorCmd {
    Show,
    Hide,
    Close,
}

impl InspectorCmd {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "show" => Some(Self::Show),
            "hide" => Some(Self::Hide),
            "close" => Some(Self::Close),
            _ => None,
        }
    }
}

/// Where a tab's inspector is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InspectorState {
    #[default]
    Closed,
    Shown,
    /// Attached but not visible.
    Hidden,
}

/// A browser tab: one rendering-engine view plus the chrome around it.
pub struct Tab {
    pub id: TabId,
    pub view: Box<dyn WebView>,
    pub chrome: TabChrome,
    pub history: BackForwardList,
    pub uri: String,
    pub title: String,
    pub icon: Option<String>,
    pub content: Option<String>,
    pub xtp_meaning: XtpMeaning,
    pub focus_wv: bool,
    pub ctrl_click: bool,
    pub popup: bool,
    pub status: Option<String>,
    pub tmp_uri: Option<String>,
    pub script_init: bool,
    pub hints_on: bool,
    pub new_tab: bool,
    pub styled: bool,
    pub stylesheet: Option<String>,
    pub search: SearchState,
    pub user_agent: Option<String>,
    pub marks: Marks,
    pub policy: ContentPolicy,
    pub inspector: InspectorState,
}

impl fmt::Debug for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tab")
            .field("id", &self.id)
            .field("uri", &self.uri)
            .field("title", &self.title)
            .field("xtp_meaning", &self.xtp_meaning)
            .finish_non_exhaustive()
    }
}

impl Tab {
    pub fn new(id: TabId, view: Box<dyn WebView>) -> Self {
        Self {
            id,
            view,
            chrome: TabChrome::default(),
            history: BackForwardList::default(),
            uri: String::new(),
            title: String::new(),
            icon: None,
            content: None,
            xtp_meaning: XtpMeaning::Normal,
            focus_wv: false,
            ctrl_click: false,
            popup: false,
            status: None,
            tmp_uri: None,
            script_init: false,
            hints_on: false,
            new_tab: false,
            styled: false,
            stylesheet: None,
            search: SearchState::default(),
            user_agent: None,
            marks: Marks::default(),
            policy: ContentPolicy::default(),
            inspector: InspectorState::Closed,
        }
    }

    /// Load a network URI into the view.
    pub fn load_uri(&mut self, uri: &str) {
        self.uri = uri.to_string();
        self.chrome.uri_entry = uri.to_string();
        self.chrome.spinner = true;
        self.chrome.oops = None;
        self.content = None;
        self.xtp_meaning = XtpMeaning::Normal;
        self.view.load_uri(uri);
    }

    /// Load synthesized HTML into the view, shown under `uri`.
    pub fn load_html(&mut self, html: String, uri: &str) {
        self.uri = uri.to_string();
        self.chrome.uri_entry = uri.to_string();
        self.chrome.spinner = false;
        self.view.load_html(&html, uri);
        self.content = Some(html);
    }

    pub fn set_meaning(&mut self, meaning: XtpMeaning) {
        self.xtp_meaning = meaning;
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        self.chrome.label = title.to_string();
        self.history.set_title(title);
    }

    pub fn set_status(&mut self, status: &str) {
        self.status = Some(status.to_string());
        self.chrome.statusbar = status.to_string();
    }

    pub fn set_mark(&mut self, c: char, position: f64) -> Result<(), TabError> {
        self.marks.set(c, position)
    }

    pub fn mark(&self, c: char) -> Option<f64> {
        self.marks.get(c)
    }

    /// Start or continue an in-page search.
    pub fn set_search(&mut self, text: &str, forward: bool) {
        self.search.text = Some(text.to_string());
        self.search.forward = forward;
        self.search.id = self.search.id.wrapping_add(1);
        self.chrome.search_entry = text.to_string();
        self.view.search(text, forward);
    }

    /// Apply a user stylesheet override.
    pub fn set_style(&mut self, css: &str) {
        self.styled = true;
        self.stylesheet = Some(css.to_string());
        self.view.set_stylesheet(Some(css));
    }

    pub fn clear_style(&mut self) {
        self.styled = false;
        self.stylesheet = None;
        self.view.set_stylesheet(None);
    }

    pub fn set_policy(&mut self, policy: ContentPolicy) {
        self.policy = policy;
        self.chrome.js_enabled = policy.scripts;
        self.view.set_policy(policy);
    }

    /// Apply an inspector command. Returns whether the inspector is visible.
    pub fn inspector(&mut self, cmd: InspectorCmd) -> bool {
        self.inspector = match (cmd, self.inspector) {
            (InspectorCmd::Show, _) => InspectorState::Shown,
            (InspectorCmd::Hide, InspectorState::Closed) => InspectorState::Closed,
            (InspectorCmd::Hide, _) => InspectorState::Hidden,
            (InspectorCmd::Close, _) => InspectorState::Closed,
        };
        let visible = self.inspector == InspectorState::Shown;
        self.view.show_inspector(visible);
        visible
    }

    pub fn set_completion(&mut self, items: Vec<String>) {
        self.chrome.completion.visible = !items.is_empty();
        self.chrome.completion.items = items;
        self.popup = self.chrome.completion.visible;
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.xtp_meaning, XtpMeaning::About(_))
    }
}
