//! Tab registry.
//!
//! Tabs live in creation order. The registry is owned by the UI thread and
//! never shared across threads while it is being mutated.

use log::{debug, info};

use crate::types::about::AboutPage;
use crate::types::errors::TabError;
use crate::types::tab::{Tab, TabId, XtpMeaning};
use crate::view::ViewFactory;

/// Trait defining the tab registry interface.
pub trait TabManagerTrait {
    fn create_tab(&mut self, focus: bool) -> TabId;
    fn close_tab(&mut self, tab_id: TabId) -> Result<(), TabError>;
    fn switch_tab(&mut self, tab_id: TabId) -> Result<(), TabError>;
    fn next_tab(&mut self) -> Option<TabId>;
    fn prev_tab(&mut self) -> Option<TabId>;
    fn get_tab(&self, tab_id: TabId) -> Option<&Tab>;
    fn get_tab_mut(&mut self, tab_id: TabId) -> Option<&mut Tab>;
    fn tabs(&self) -> std::slice::Iter<'_, Tab>;
    fn tab_ids(&self) -> Vec<TabId>;
    fn active_tab(&self) -> Option<&Tab>;
    fn active_tab_mut(&mut self) -> Option<&mut Tab>;
    fn tabs_showing(&self, page: AboutPage) -> Vec<TabId>;
    fn tab_count(&self) -> usize;
}

/// In-memory tab registry.
pub struct TabManager {
    tabs: Vec<Tab>,
    active: Option<TabId>,
    next_id: u32,
    make_view: ViewFactory,
}

impl TabManager {
    pub fn new(make_view: ViewFactory) -> Self {
        Self {
            tabs: Vec::new(),
            active: None,
            next_id: 1,
            make_view,
        }
    }

    fn position(&self, tab_id: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == tab_id)
    }

    fn active_position(&self) -> Option<usize> {
        self.active.and_then(|id| self.position(id))
    }

    pub fn active_id(&self) -> Option<TabId> {
        self.active
    }
}

impl TabManagerTrait for TabManager {
    /// Create a new, empty tab at the end of the list. Returns its id.
    fn create_tab(&mut self, focus: bool) -> TabId {
        let id = TabId(self.next_id);
        self.next_id += 1;
        let view = (self.make_view)(id);
        self.tabs.push(Tab::new(id, view));
        if focus || self.active.is_none() {
            self.active = Some(id);
        }
        info!("created tab {} ({} open)", id, self.tabs.len());
        id
    }

    /// Close a tab and drop its view and widgets. If it was active, the tab
    /// that slides into its slot becomes active, or the previous one when
    /// the closed tab was last.
    fn close_tab(&mut self, tab_id: TabId) -> Result<(), TabError> {
        let idx = self.position(tab_id).ok_or(TabError::NotFound(tab_id))?;
        let tab = self.tabs.remove(idx);
        drop(tab);

        if self.active == Some(tab_id) {
            self.active = if self.tabs.is_empty() {
                None
            } else {
                Some(self.tabs[idx.min(self.tabs.len() - 1)].id)
            };
        }
        info!("closed tab {} ({} open)", tab_id, self.tabs.len());
        Ok(())
    }

    fn switch_tab(&mut self, tab_id: TabId) -> Result<(), TabError> {
        if self.position(tab_id).is_none() {
            return Err(TabError::NotFound(tab_id));
        }
        debug!("switch to tab {}", tab_id);
        self.active = Some(tab_id);
        Ok(())
    }

    /// Activate the tab after the current one, wrapping around.
    fn next_tab(&mut self) -> Option<TabId> {
        let cur = self.active_position()?;
        let id = self.tabs[(cur + 1) % self.tabs.len()].id;
        self.active = Some(id);
        Some(id)
    }

    /// Activate the tab before the current one, wrapping around.
    fn prev_tab(&mut self) -> Option<TabId> {
        let cur = self.active_position()?;
        let len = self.tabs.len();
        let id = self.tabs[(cur + len - 1) % len].id;
        self.active = Some(id);
        Some(id)
    }

    fn get_tab(&self, tab_id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == tab_id)
    }

    fn get_tab_mut(&mut self, tab_id: TabId) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.id == tab_id)
    }

    fn tabs(&self) -> std::slice::Iter<'_, Tab> {
        self.tabs.iter()
    }

    fn tab_ids(&self) -> Vec<TabId> {
        self.tabs.iter().map(|t| t.id).collect()
    }

    fn active_tab(&self) -> Option<&Tab> {
        self.active.and_then(|id| self.get_tab(id))
    }

    fn active_tab_mut(&mut self) -> Option<&mut Tab> {
        let id = self.active?;
        self.get_tab_mut(id)
    }

    fn tabs_showing(&self, page: AboutPage) -> Vec<TabId> {
        self.tabs
            .iter()
            .filter(|t| t.xtp_meaning == XtpMeaning::About(page))
            .map(|t| t.id)
            .collect()
    }

    fn tab_count(&self) -> usize {
        self.tabs.len()
    }
}
