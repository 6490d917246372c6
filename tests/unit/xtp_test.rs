//! Unit tests for `xxxt://` command URLs: parsing, session keys, and the
//! commands run through the app.

use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use xxxterm::about::{self, xtp::{XtpClass, XtpCommand, XtpKeys, XtpRequest}};
use xxxterm::app::App;
use xxxterm::database::Database;
use xxxterm::managers::cookie_manager::CookieManagerTrait;
use xxxterm::managers::download_manager::DownloadManagerTrait;
use xxxterm::managers::favorites_manager::FavoritesManagerTrait;
use xxxterm::managers::history_manager::HistoryManagerTrait;
use xxxterm::managers::tab_manager::TabManagerTrait;
use xxxterm::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use xxxterm::types::about::AboutPage;
use xxxterm::types::cookie::Cookie;
use xxxterm::types::download::DownloadState;
use xxxterm::types::errors::{BrowserError, XtpError};
use xxxterm::types::tab::XtpMeaning;
use xxxterm::view::{HeadlessView, ViewLog};

fn setup() -> (App, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = SettingsEngine::new(Some(dir.path().join("xxxterm.json").to_string_lossy().to_string()));
    settings.set_from_str("paths.work_dir", &dir.path().to_string_lossy()).unwrap();
    settings.set_from_str("network.use_threads", "false").unwrap();
    let log: ViewLog = Arc::new(Mutex::new(Vec::new()));
    let app = App::with_database(settings, HeadlessView::factory(log), Database::open_in_memory().unwrap()).unwrap();
    (app, dir)
}

// ─── Parsing ───

#[test]
fn test_link_parses_back() {
    let keys = XtpKeys::generate().unwrap();
    let cases = [
        (XtpClass::Downloads, XtpCommand::List),
        (XtpClass::Downloads, XtpCommand::Cancel(7)),
        (XtpClass::Downloads, XtpCommand::Clear),
        (XtpClass::History, XtpCommand::Remove(3)),
        (XtpClass::Cookies, XtpCommand::Remove(0)),
        (XtpClass::Favorites, XtpCommand::Remove(12)),
    ];
    for (class, command) in cases {
        let link = keys.link(class, command);
        assert!(link.starts_with(&format!("xxxt://{}/", class as u8)));
        assert_eq!(keys.parse(&link).unwrap(), XtpRequest { class, command });
    }
}

#[test]
fn test_key_of_other_class_is_rejected() {
    let keys = XtpKeys::generate().unwrap();
    let forged = format!("xxxt://1/{}/clear", keys.key_hex(XtpClass::History));
    assert_eq!(keys.parse(&forged), Err(XtpError::BadKey(1)));
}

#[test]
fn test_keys_differ_between_sessions() {
    let a = XtpKeys::generate().unwrap();
    let b = XtpKeys::generate().unwrap();
    let link = a.link(XtpClass::Downloads, XtpCommand::Clear);
    assert!(matches!(b.parse(&link), Err(XtpError::BadKey(1))));
}

#[test]
fn test_malformed_urls() {
    let keys = XtpKeys::generate().unwrap();
    let key = keys.key_hex(XtpClass::Downloads);

    assert!(matches!(keys.parse("https://x/"), Err(XtpError::Malformed(_))));
    assert!(matches!(keys.parse("xxxt://9/abc/list"), Err(XtpError::UnknownClass(_))));
    assert!(matches!(keys.parse("xxxt://1"), Err(XtpError::Malformed(_))));
    assert!(matches!(keys.parse(&format!("xxxt://1/{}", key)), Err(XtpError::Malformed(_))));
    assert!(matches!(keys.parse(&format!("xxxt://1/{}/frob", key)), Err(XtpError::UnknownCommand(_))));
    assert!(matches!(keys.parse(&format!("xxxt://1/{}/remove", key)), Err(XtpError::BadArgument(_))));
    assert!(matches!(keys.parse(&format!("xxxt://1/{}/remove/x", key)), Err(XtpError::BadArgument(_))));
    assert!(matches!(keys.parse(&format!("xxxt://1/{}/remove/1/2", key)), Err(XtpError::Malformed(_))));
}

#[test]
fn test_cancel_and_clear_only_for_downloads() {
    let keys = XtpKeys::generate().unwrap();
    let key = keys.key_hex(XtpClass::History);
    assert!(matches!(keys.parse(&format!("xxxt://2/{}/clear", key)), Err(XtpError::UnknownCommand(_))));
    assert!(matches!(keys.parse(&format!("xxxt://2/{}/cancel/1", key)), Err(XtpError::UnknownCommand(_))));
}

// ─── Commands through the app ───

#[test]
fn test_download_cancel_remove_clear() {
    let (mut app, _dir) = setup();
    let tab = app.open_tab(Some("about:downloads"), true);
    let a = app.start_download("https://a.b/one", None, None);
    let b = app.start_download("https://a.b/two", None, None);
    let c = app.start_download("https://a.b/three", None, None);

    let cancel = app.xtp_keys.link(XtpClass::Downloads, XtpCommand::Cancel(a));
    about::handle_xtp(&mut app, tab, &cancel).unwrap();
    assert_eq!(app.download_manager.get(a).unwrap().state, DownloadState::Cancelled);

    app.finish_download(b).unwrap();
    let remove = app.xtp_keys.link(XtpClass::Downloads, XtpCommand::Remove(b as usize));
    about::handle_xtp(&mut app, tab, &remove).unwrap();
    assert!(app.download_manager.get(b).is_none());

    let clear = app.xtp_keys.link(XtpClass::Downloads, XtpCommand::Clear);
    about::handle_xtp(&mut app, tab, &clear).unwrap();
    assert_eq!(app.download_manager.iter().map(|d| d.id).collect::<Vec<_>>(), vec![c]);

    let t = app.tab_manager.get_tab(tab).unwrap();
    assert_eq!(t.xtp_meaning, XtpMeaning::About(AboutPage::Downloads));
}

#[test]
fn test_history_remove_by_position() {
    let (mut app, _dir) = setup();
    let tab = app.open_tab(Some("https://b.example/"), true);
    app.page_loaded(tab, "https://b.example/", "B").unwrap();
    app.navigate(tab, "https://a.example/").unwrap();
    app.page_loaded(tab, "https://a.example/", "A").unwrap();

    // Position 0 is the smallest URI.
    let link = app.xtp_keys.link(XtpClass::History, XtpCommand::Remove(0));
    app.navigate(tab, &link).unwrap();
    assert!(app.history_manager.get("https://a.example/").is_none());
    assert!(app.history_manager.get("https://b.example/").is_some());
    assert_eq!(
        app.tab_manager.get_tab(tab).unwrap().xtp_meaning,
        XtpMeaning::About(AboutPage::History)
    );
}

#[test]
fn test_cookie_and_favorite_remove() {
    let (mut app, _dir) = setup();
    app.set_setting("privacy.enable_cookie_whitelist", "false").unwrap();
    app.offer_cookie(Cookie::new("a", "1", "example.org")).unwrap();
    let tab = app.open_tab(Some("https://example.org/"), true);
    app.add_favorite(tab).unwrap();

    let link = app.xtp_keys.link(XtpClass::Cookies, XtpCommand::Remove(0));
    about::handle_xtp(&mut app, tab, &link).unwrap();
    assert!(app.cookie_manager.cookies().is_empty());

    let link = app.xtp_keys.link(XtpClass::Favorites, XtpCommand::Remove(0));
    about::handle_xtp(&mut app, tab, &link).unwrap();
    assert!(app.favorites_manager.list().is_empty());
}

#[test]
fn test_bad_key_shows_oops_and_changes_nothing() {
    let (mut app, _dir) = setup();
    let tab = app.open_tab(Some("about:downloads"), true);
    let id = app.start_download("https://a.b/f", None, None);
    app.finish_download(id).unwrap();

    let err = about::handle_xtp(&mut app, tab, "xxxt://1/deadbeef/clear").unwrap_err();
    assert!(matches!(err, BrowserError::Xtp(XtpError::BadKey(1))));
    assert!(app.download_manager.get(id).is_some());

    let t = app.tab_manager.get_tab(tab).unwrap();
    assert!(t.chrome.oops.is_some());
    assert_eq!(t.xtp_meaning, XtpMeaning::Normal);
}

#[test]
fn test_remove_of_missing_item_shows_oops() {
    let (mut app, _dir) = setup();
    let tab = app.open_tab(Some("about:history"), true);
    let link = app.xtp_keys.link(XtpClass::History, XtpCommand::Remove(5));
    assert!(about::handle_xtp(&mut app, tab, &link).is_err());
    assert!(app.tab_manager.get_tab(tab).unwrap().chrome.oops.is_some());
}

#[test]
fn test_xtp_navigation_not_pushed_to_back_list() {
    let (mut app, _dir) = setup();
    let tab = app.open_tab(Some("about:downloads"), true);
    let link = app.xtp_keys.link(XtpClass::Downloads, XtpCommand::List);
    app.navigate(tab, &link).unwrap();

    let t = app.tab_manager.get_tab(tab).unwrap();
    assert_eq!(t.history.current().map(|e| e.uri.as_str()), Some("about:downloads"));
    assert!(!t.history.can_go_back());
}
