//! Unit tests for the app core: navigation, history recording, downloads,
//! favorites, settings and worker results.

use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use xxxterm::app::{normalize_uri, App};
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
use xxxterm::types::errors::{BrowserError, TabError};
use xxxterm::types::tab::{InspectorCmd, InspectorState, TabId, XtpMeaning};
use xxxterm::view::{ContentPolicy, HeadlessView, ViewEvent, ViewLog};

fn setup() -> (App, ViewLog, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = SettingsEngine::new(Some(dir.path().join("xxxterm.json").to_string_lossy().to_string()));
    settings.set_from_str("paths.work_dir", &dir.path().to_string_lossy()).unwrap();
    settings.set_from_str("network.use_threads", "false").unwrap();
    let log: ViewLog = Arc::new(Mutex::new(Vec::new()));
    let app = App::with_database(settings, HeadlessView::factory(log.clone()), Database::open_in_memory().unwrap()).unwrap();
    (app, log, dir)
}

fn events_for(log: &ViewLog, tab: TabId) -> Vec<ViewEvent> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|(t, _)| *t == tab)
        .map(|(_, e)| e.clone())
        .collect()
}

// ─── Tabs and navigation ───

#[test]
fn test_open_tab_without_uri_shows_home() {
    let (mut app, _log, _dir) = setup();
    let tab = app.open_tab(None, true);
    let t = app.tab_manager.get_tab(tab).unwrap();
    assert_eq!(t.xtp_meaning, XtpMeaning::About(AboutPage::StartPage));
    assert_eq!(t.uri, "about:startpage");
}

#[test]
fn test_navigate_network_uri_loads_in_view() {
    let (mut app, log, _dir) = setup();
    let tab = app.open_tab(Some("about:blank"), true);
    app.navigate(tab, "example.org").unwrap();

    let t = app.tab_manager.get_tab(tab).unwrap();
    assert_eq!(t.uri, "https://example.org");
    assert_eq!(t.xtp_meaning, XtpMeaning::Normal);
    assert!(t.content.is_none());
    assert_eq!(
        events_for(&log, tab).last(),
        Some(&ViewEvent::LoadUri("https://example.org".to_string()))
    );
}

#[test]
fn test_navigate_unknown_tab() {
    let (mut app, _log, _dir) = setup();
    let err = app.navigate(TabId(77), "https://x/").unwrap_err();
    assert!(matches!(err, BrowserError::Tab(TabError::NotFound(TabId(77)))));
}

#[test]
fn test_back_and_forward_across_internal_and_network_pages() {
    let (mut app, _log, _dir) = setup();
    let tab = app.open_tab(Some("about:help"), true);
    app.navigate(tab, "https://example.org/").unwrap();

    assert!(app.go_back(tab).unwrap());
    assert_eq!(app.tab_manager.get_tab(tab).unwrap().xtp_meaning, XtpMeaning::About(AboutPage::Help));
    assert!(!app.go_back(tab).unwrap());

    assert!(app.go_forward(tab).unwrap());
    let t = app.tab_manager.get_tab(tab).unwrap();
    assert_eq!(t.uri, "https://example.org/");
    assert_eq!(t.xtp_meaning, XtpMeaning::Normal);
}

#[test]
fn test_reload_rerenders_internal_page() {
    let (mut app, log, _dir) = setup();
    let tab = app.open_tab(Some("about:stats"), true);
    log.lock().unwrap().clear();
    app.reload(tab).unwrap();
    assert!(matches!(events_for(&log, tab).last(), Some(ViewEvent::LoadHtml { .. })));

    app.navigate(tab, "https://example.org/").unwrap();
    app.reload(tab).unwrap();
    assert_eq!(events_for(&log, tab).last(), Some(&ViewEvent::Reload));
}

#[test]
fn test_close_tab() {
    let (mut app, _log, _dir) = setup();
    let a = app.open_tab(None, true);
    let b = app.open_tab(None, false);
    app.close_tab(a).unwrap();
    assert!(app.tab_manager.get_tab(a).is_none());
    assert_eq!(app.tab_manager.tab_ids(), vec![b]);
    assert!(app.close_tab(a).is_err());
}

#[test]
fn test_scripts_follow_js_whitelist() {
    let (mut app, _log, _dir) = setup();
    app.set_setting("privacy.js_wl", r#"[".example.org"]"#).unwrap();
    let tab = app.open_tab(Some("https://www.example.org/"), true);
    assert!(app.tab_manager.get_tab(tab).unwrap().chrome.js_enabled);

    app.navigate(tab, "https://other.net/").unwrap();
    assert!(!app.tab_manager.get_tab(tab).unwrap().chrome.js_enabled);

    app.set_setting("privacy.enable_scripts", "true").unwrap();
    assert!(app.scripts_allowed("https://other.net/"));
}

// ─── History ───

#[test]
fn test_page_loaded_records_history_and_title() {
    let (mut app, _log, _dir) = setup();
    let tab = app.open_tab(Some("https://example.org/"), true);
    app.page_loaded(tab, "https://example.org/", "Example Domain").unwrap();

    let entry = app.history_manager.get("https://example.org/").unwrap();
    assert_eq!(entry.title, "Example Domain");
    assert_eq!(app.tab_manager.get_tab(tab).unwrap().title, "Example Domain");
}

#[test]
fn test_internal_pages_never_enter_history() {
    let (mut app, _log, _dir) = setup();
    let tab = app.open_tab(Some("about:downloads"), true);
    app.page_loaded(tab, "about:downloads", "").unwrap();
    app.navigate(tab, "about:history").unwrap();
    assert!(app.history_manager.is_empty());
}

#[test]
fn test_history_tabs_refresh_on_visit() {
    let (mut app, log, _dir) = setup();
    let history_tab = app.open_tab(Some("about:history"), false);
    let tab = app.open_tab(Some("https://example.org/"), true);
    app.page_loaded(tab, "https://example.org/", "Example").unwrap();

    let rendered = events_for(&log, history_tab);
    assert!(matches!(
        rendered.last(),
        Some(ViewEvent::LoadHtml { html, .. }) if html.contains("https://example.org/")
    ));
}

#[test]
fn test_redirect_updates_tab_uri() {
    let (mut app, _log, _dir) = setup();
    let tab = app.open_tab(Some("http://example.org"), true);
    app.page_loaded(tab, "https://www.example.org/", "Example").unwrap();
    let t = app.tab_manager.get_tab(tab).unwrap();
    assert_eq!(t.uri, "https://www.example.org/");
    assert!(app.history_manager.get("https://www.example.org/").is_some());
}

#[test]
fn test_title_changes_do_not_count_visits() {
    let (mut app, _log, _dir) = setup();
    let tab = app.open_tab(Some("https://mail.example.org/"), true);
    app.page_loaded(tab, "https://mail.example.org/", "Inbox").unwrap();
    app.title_changed(tab, "Inbox (1)").unwrap();
    app.title_changed(tab, "Inbox (2)").unwrap();

    let entry = app.history_manager.get("https://mail.example.org/").unwrap();
    assert_eq!(entry.visits, 1);
    assert_eq!(entry.title, "Inbox (2)");
    assert_eq!(app.tab_manager.get_tab(tab).unwrap().title, "Inbox (2)");
}

#[test]
fn test_history_recording_follows_setting() {
    let (mut app, _log, _dir) = setup();
    app.set_setting("privacy.enable_history", "false").unwrap();
    assert!(!app.history_manager.is_recording_enabled());
    let tab = app.open_tab(Some("https://example.org/"), true);
    app.page_loaded(tab, "https://example.org/", "Example").unwrap();
    assert!(app.history_manager.is_empty());

    app.set_setting("privacy.enable_history", "true").unwrap();
    app.page_loaded(tab, "https://example.org/", "Example").unwrap();
    assert_eq!(app.history_manager.get("https://example.org/").unwrap().visits, 1);
}

// ─── Content policy, styles and inspector ───

#[test]
fn test_content_policy_reaches_the_view_before_load() {
    let (mut app, log, _dir) = setup();
    app.set_setting("privacy.js_wl", r#"[".example.org"]"#).unwrap();
    app.set_setting("privacy.pl_wl", r#"["www.example.org"]"#).unwrap();
    let tab = app.open_tab(Some("https://www.example.org/"), true);
    let allowed = ContentPolicy { scripts: true, plugins: true };
    assert!(events_for(&log, tab).contains(&ViewEvent::Policy(allowed)));
    assert_eq!(app.tab_manager.get_tab(tab).unwrap().policy, allowed);

    app.navigate(tab, "https://other.net/").unwrap();
    let events = events_for(&log, tab);
    let load = events
        .iter()
        .position(|e| *e == ViewEvent::LoadUri("https://other.net/".to_string()))
        .unwrap();
    assert_eq!(events[load - 1], ViewEvent::Policy(ContentPolicy::default()));

    // Applied again once the document exists.
    log.lock().unwrap().clear();
    app.page_loaded(tab, "https://other.net/", "Other").unwrap();
    assert!(events_for(&log, tab).contains(&ViewEvent::Policy(ContentPolicy::default())));

    app.set_setting("privacy.enable_plugins", "true").unwrap();
    assert!(app.plugins_allowed("https://other.net/"));
    assert!(!app.scripts_allowed("https://other.net/"));
}

#[test]
fn test_toggle_style_uses_resource_dir() {
    let (mut app, log, dir) = setup();
    std::fs::write(dir.path().join("style.css"), "body{background:#000}").unwrap();
    app.set_setting("paths.resource_dir", &dir.path().to_string_lossy()).unwrap();
    let tab = app.open_tab(Some("https://example.org/"), true);

    assert!(app.toggle_style(tab).unwrap());
    assert!(app.tab_manager.get_tab(tab).unwrap().styled);
    assert_eq!(
        events_for(&log, tab).last(),
        Some(&ViewEvent::Stylesheet(Some("body{background:#000}".to_string())))
    );

    // The stylesheet survives a page load.
    log.lock().unwrap().clear();
    app.page_loaded(tab, "https://example.org/", "Example").unwrap();
    assert!(events_for(&log, tab).contains(&ViewEvent::Stylesheet(Some("body{background:#000}".to_string()))));

    assert!(!app.toggle_style(tab).unwrap());
    assert_eq!(events_for(&log, tab).last(), Some(&ViewEvent::Stylesheet(None)));
}

#[test]
fn test_toggle_style_without_stylesheet_file() {
    let (mut app, _log, dir) = setup();
    app.set_setting("paths.resource_dir", &dir.path().join("missing").to_string_lossy()).unwrap();
    let tab = app.open_tab(Some("https://example.org/"), true);
    assert!(matches!(app.toggle_style(tab), Err(BrowserError::Io(_))));
    assert!(!app.tab_manager.get_tab(tab).unwrap().styled);
}

#[test]
fn test_inspector_commands() {
    let (mut app, log, _dir) = setup();
    let tab = app.open_tab(Some("https://example.org/"), true);
    let state = |app: &App| app.tab_manager.get_tab(tab).unwrap().inspector;

    assert!(!app.inspector(tab, InspectorCmd::Hide).unwrap());
    assert_eq!(state(&app), InspectorState::Closed);
    assert!(app.inspector(tab, InspectorCmd::Show).unwrap());
    assert_eq!(state(&app), InspectorState::Shown);
    assert_eq!(events_for(&log, tab).last(), Some(&ViewEvent::Inspector(true)));
    assert!(!app.inspector(tab, InspectorCmd::Hide).unwrap());
    assert_eq!(state(&app), InspectorState::Hidden);
    assert!(app.inspector(tab, InspectorCmd::Show).unwrap());
    assert!(!app.inspector(tab, InspectorCmd::Close).unwrap());
    assert_eq!(state(&app), InspectorState::Closed);
    assert_eq!(events_for(&log, tab).last(), Some(&ViewEvent::Inspector(false)));

    assert!(app.inspector(TabId(99), InspectorCmd::Show).is_err());
    assert_eq!(InspectorCmd::parse("show"), Some(InspectorCmd::Show));
    assert_eq!(InspectorCmd::parse("toggle"), None);
}

// ─── Downloads ───

#[test]
fn test_download_lifecycle_by_uri() {
    let (mut app, _log, dir) = setup();
    let dest = dir.path().join("f.bin");
    let id = app.start_download("https://a.b/f.bin", Some(&dest), None);
    app.download_progress(id, 10, Some(20)).unwrap();
    app.download_completed_by_uri("https://a.b/f.bin", true).unwrap();
    assert_eq!(app.download_manager.get(id).unwrap().state, DownloadState::Finished);

    let id2 = app.start_download("https://a.b/g.bin", None, None);
    assert!(app.download_manager.get(id2).unwrap().destination.ends_with("g.bin"));
    app.download_completed_by_uri("https://a.b/g.bin", false).unwrap();
    assert!(matches!(app.download_manager.get(id2).unwrap().state, DownloadState::Error(_)));

    // Unknown URIs are ignored.
    app.download_completed_by_uri("https://nowhere/", true).unwrap();
}

#[test]
fn test_downloads_page_refreshes_while_live() {
    let (mut app, log, _dir) = setup();
    app.start_download("https://a.b/f.bin", None, None);
    let tab = app.open_tab(Some("about:downloads"), true);
    assert!(matches!(
        events_for(&log, tab).last(),
        Some(ViewEvent::LoadHtml { html, .. }) if html.contains("http-equiv=\"refresh\"")
    ));
}

// ─── Favorites, cookies, settings ───

#[test]
fn test_add_favorite_uses_tab_title() {
    let (mut app, _log, _dir) = setup();
    let tab = app.open_tab(Some("https://example.org/"), true);
    app.page_loaded(tab, "https://example.org/", "Example").unwrap();
    assert_eq!(app.add_favorite(tab).unwrap(), 0);
    assert_eq!(app.favorites_manager.list()[0].title, "Example");
    assert!(app.favorites_manager.path().exists());
}

#[test]
fn test_offer_cookie_respects_whitelist_setting() {
    let (mut app, _log, _dir) = setup();
    assert!(!app.offer_cookie(Cookie::new("a", "1", "example.org")).unwrap());
    app.set_setting("privacy.cookie_wl", r#"["example.org"]"#).unwrap();
    assert!(app.offer_cookie(Cookie::new("a", "1", "example.org")).unwrap());
}

#[test]
fn test_set_setting_refreshes_set_page() {
    let (mut app, log, _dir) = setup();
    let tab = app.open_tab(Some("about:set"), true);
    app.set_setting("general.home", "https://example.org/").unwrap();
    assert!(matches!(
        events_for(&log, tab).last(),
        Some(ViewEvent::LoadHtml { html, .. }) if html.contains("https://example.org/")
    ));
    assert!(app.set_setting("general.missing", "1").is_err());
}

#[test]
fn test_unknown_about_page_is_oops_not_panic() {
    let (mut app, _log, _dir) = setup();
    let tab = app.open_tab(Some("about:nonsense"), true);
    let t = app.tab_manager.get_tab(tab).unwrap();
    assert!(t.chrome.oops.is_some());
    assert_eq!(t.title, "Oops!");
}

// ─── Lifecycle ───

#[test]
fn test_startup_opens_given_uris_or_home() {
    let (mut app, _log, _dir) = setup();
    app.startup(&[]);
    assert_eq!(app.tab_manager.tab_count(), 1);

    let (mut app, _log, _dir) = setup();
    app.startup(&["https://a/".to_string(), "about:help".to_string()]);
    assert_eq!(app.tab_manager.tab_count(), 2);

    app.shutdown();
    assert_eq!(app.tab_manager.tab_count(), 0);
}

#[test]
fn test_poll_workers_without_jobs() {
    let (mut app, _log, _dir) = setup();
    assert_eq!(app.poll_workers(), 0);
}

#[test]
fn test_normalize_uri_variants() {
    assert_eq!(normalize_uri("docs.rs"), "https://docs.rs");
    assert_eq!(normalize_uri("xxxt://1/k/list"), "xxxt://1/k/list");
    assert_eq!(normalize_uri("data:text/plain,hi"), "data:text/plain,hi");
}

#[test]
fn test_sync_cookies_returns_rejected() {
    let (mut app, log, _dir) = setup();
    app.set_setting("privacy.cookie_wl", r#"[".example.org"]"#).unwrap();
    let jar_tab = app.open_tab(Some("about:cookiejar"), false);
    log.lock().unwrap().clear();

    let engine = vec![Cookie::new("sid", "1", "www.example.org"), Cookie::new("track", "x", ".ads.net")];
    let rejected = app.sync_cookies(engine.clone()).unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].name, "track");
    assert_eq!(app.cookie_manager.cookies().len(), 1);
    assert!(matches!(
        events_for(&log, jar_tab).last(),
        Some(ViewEvent::LoadHtml { html, .. }) if html.contains("sid")
    ));

    // Cookies already in the jar are not offered twice.
    let rejected = app.sync_cookies(engine).unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(app.cookie_manager.cookies().len(), 1);
    assert_eq!(app.cookie_manager.blocked_cookies(), 2);
}
