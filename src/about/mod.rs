//! Internal pages.
//!
//! `about:<name>` (and `xxxt://<name>`) look the name up in [`ABOUT_LIST`]
//! and run its handler, which renders HTML into the requesting tab.
//! `xxxt://<class>/<key>/<cmd>` URLs carry commands from those pages back
//! into the browser; see [`xtp`].

pub mod html;
pub mod pages;
pub mod xtp;

use log::{debug, warn};

use crate::app::App;
use crate::managers::cookie_manager::CookieManagerTrait;
use crate::managers::download_manager::DownloadManagerTrait;
use crate::managers::favorites_manager::FavoritesManagerTrait;
use crate::managers::history_manager::HistoryManagerTrait;
use crate::managers::tab_manager::TabManagerTrait;
use crate::types::about::{AboutPage, Karg};
use crate::types::errors::{BrowserError, HistoryError, XtpError};
use crate::types::tab::{TabId, XtpMeaning};

use xtp::{XtpClass, XtpCommand, XTP_SCHEME};

pub const ABOUT_PREFIX: &str = "about:";

/// Renders one internal page into a tab.
pub type AboutHandler = fn(&mut App, TabId, &Karg) -> Result<(), BrowserError>;

/// One row of the about table.
pub struct AboutEntry {
    pub name: &'static str,
    pub page: AboutPage,
    pub handler: AboutHandler,
}

/// The about table, in [`AboutPage`] index order.
pub static ABOUT_LIST: &[AboutEntry] = &[
    AboutEntry { name: "about", page: AboutPage::About, handler: pages::about },
    AboutEntry { name: "blank", page: AboutPage::Blank, handler: pages::blank },
    AboutEntry { name: "certs", page: AboutPage::Certs, handler: pages::certs },
    AboutEntry { name: "cookiewl", page: AboutPage::CookieWhitelist, handler: pages::cookie_whitelist },
    AboutEntry { name: "cookiejar", page: AboutPage::CookieJar, handler: pages::cookie_jar },
    AboutEntry { name: "downloads", page: AboutPage::Downloads, handler: pages::downloads },
    AboutEntry { name: "favorites", page: AboutPage::Favorites, handler: pages::favorites },
    AboutEntry { name: "help", page: AboutPage::Help, handler: pages::help },
    AboutEntry { name: "history", page: AboutPage::History, handler: pages::history },
    AboutEntry { name: "jswl", page: AboutPage::JsWhitelist, handler: pages::js_whitelist },
    AboutEntry { name: "plwl", page: AboutPage::PluginWhitelist, handler: pages::plugin_whitelist },
    AboutEntry { name: "set", page: AboutPage::Set, handler: pages::set },
    AboutEntry { name: "stats", page: AboutPage::Stats, handler: pages::stats },
    AboutEntry { name: "marco", page: AboutPage::Marco, handler: pages::marco },
    AboutEntry { name: "startpage", page: AboutPage::StartPage, handler: pages::startpage },
];

pub fn about_list_size() -> usize {
    ABOUT_LIST.len()
}

pub fn lookup(name: &str) -> Option<&'static AboutEntry> {
    ABOUT_LIST.iter().find(|e| e.name == name)
}

/// A URI the browser serves itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalUri<'a> {
    /// An about page by name (not necessarily a known one).
    About(&'a str),
    /// An `xxxt://<class>/...` command URL, whole.
    Xtp(&'a str),
}

/// Classify `uri`; `None` for anything the rendering engine should load.
pub fn parse_internal_uri(uri: &str) -> Option<InternalUri<'_>> {
    let uri = uri.trim();
    if let Some(rest) = uri.strip_prefix(ABOUT_PREFIX) {
        let name = rest.split(['?', '#']).next().unwrap_or("");
        return Some(InternalUri::About(name));
    }
    let rest = uri.strip_prefix(XTP_SCHEME)?;
    if rest.starts_with(|c: char| c.is_ascii_digit()) {
        Some(InternalUri::Xtp(uri))
    } else {
        Some(InternalUri::About(rest.trim_end_matches('/')))
    }
}

/// Render about page `name` into `tab`.
///
/// On success the tab's meaning tag names the page. An unknown name, or a
/// handler failure, puts the oops page in the tab and returns the error.
pub fn dispatch(app: &mut App, tab: TabId, name: &str, args: &Karg) -> Result<AboutPage, BrowserError> {
    let Some(entry) = lookup(name) else {
        warn!("tab {}: unknown about page {:?}", tab, name);
        app.show_oops(tab, &format!("Unknown about page: {}", name));
        return Err(BrowserError::UnknownAboutPage(name.to_string()));
    };

    debug!("tab {}: about:{}", tab, entry.name);
    match (entry.handler)(app, tab, args) {
        Ok(()) => {
            if let Some(t) = app.tab_manager.get_tab_mut(tab) {
                t.set_meaning(XtpMeaning::About(entry.page));
                t.set_title(entry.name);
            }
            Ok(entry.page)
        }
        Err(e) => {
            app.show_oops(tab, &format!("about:{} failed: {}", entry.name, e));
            Err(e)
        }
    }
}

/// Handler arguments carried in the `?query` of an internal URI.
pub fn args_from_uri(uri: &str) -> Karg {
    uri.split_once('?')
        .map(|(_, q)| Karg::with_str(q.split('#').next().unwrap_or_default()))
        .unwrap_or_default()
}

/// Re-render every tab currently showing `page`, keeping each tab's query.
pub fn refresh_tabs(app: &mut App, page: AboutPage) {
    let targets: Vec<(TabId, Karg)> = app
        .tab_manager
        .tabs_showing(page)
        .into_iter()
        .filter_map(|id| app.tab_manager.get_tab(id).map(|t| (id, args_from_uri(&t.uri))))
        .collect();
    for (tab, args) in targets {
        let _ = dispatch(app, tab, page.name(), &args);
    }
}

fn class_page(class: XtpClass) -> AboutPage {
    match class {
        XtpClass::Downloads => AboutPage::Downloads,
        XtpClass::History => AboutPage::History,
        XtpClass::Cookies => AboutPage::CookieJar,
        XtpClass::Favorites => AboutPage::Favorites,
    }
}

/// Execute an `xxxt://` command URL requested from `tab`, then show the
/// class's page in that tab and refresh the other tabs showing it.
pub fn handle_xtp(app: &mut App, tab: TabId, uri: &str) -> Result<(), BrowserError> {
    let request = match app.xtp_keys.parse(uri) {
        Ok(r) => r,
        Err(e) => {
            warn!("tab {}: rejected xtp url: {}", tab, e);
            app.show_oops(tab, &e.to_string());
            return Err(e.into());
        }
    };

    let outcome = run_command(app, request.class, request.command);
    let page = class_page(request.class);
    if let Err(e) = outcome {
        app.show_oops(tab, &e.to_string());
        return Err(e);
    }

    refresh_tabs(app, page);
    let showing = app
        .tab_manager
        .get_tab(tab)
        .is_some_and(|t| t.xtp_meaning == XtpMeaning::About(page));
    if !showing {
        dispatch(app, tab, page.name(), &Karg::default())?;
    }
    Ok(())
}

fn run_command(app: &mut App, class: XtpClass, command: XtpCommand) -> Result<(), BrowserError> {
    match (class, command) {
        (_, XtpCommand::List) => Ok(()),
        (XtpClass::Downloads, XtpCommand::Remove(id)) => {
            let id = u32::try_from(id).map_err(|_| XtpError::BadArgument(id.to_string()))?;
            app.download_manager.remove(id)?;
            Ok(())
        }
        (XtpClass::Downloads, XtpCommand::Cancel(id)) => Ok(app.download_manager.cancel(id)?),
        (XtpClass::Downloads, XtpCommand::Clear) => {
            app.download_manager.clear_inactive();
            Ok(())
        }
        (XtpClass::History, XtpCommand::Remove(i)) => {
            let uri = app
                .history_manager
                .iter()
                .nth(i)
                .map(|e| e.uri.clone())
                .ok_or_else(|| HistoryError::NotFound(format!("#{}", i)))?;
            app.history_manager.remove(&uri)?;
            Ok(())
        }
        (XtpClass::Cookies, XtpCommand::Remove(i)) => {
            app.cookie_manager.remove_cookie(i)?;
            Ok(())
        }
        (XtpClass::Favorites, XtpCommand::Remove(i)) => {
            app.favorites_manager.remove(i)?;
            Ok(())
        }
        // The parser only yields cancel/clear for downloads.
        (_, XtpCommand::Cancel(_)) | (_, XtpCommand::Clear) => Ok(()),
    }
}
