//! Unit tests for the about-page dispatcher.
//!
//! Every name in the about table must reach its own handler, which renders
//! into the requesting tab and tags it with the page; anything else gets the
//! oops page.

use std::sync::{Arc, Mutex};

use rstest::rstest;
use tempfile::TempDir;
use xxxterm::about::xtp::{XtpClass, XtpCommand};
use xxxterm::about::{self, ABOUT_LIST};
use xxxterm::app::App;
use xxxterm::database::Database;
use xxxterm::managers::history_manager::HistoryManagerTrait;
use xxxterm::managers::tab_manager::TabManagerTrait;
use xxxterm::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use xxxterm::types::about::{AboutPage, Karg};
use xxxterm::types::cookie::Cookie;
use xxxterm::types::errors::BrowserError;
use xxxterm::types::tab::{TabId, XtpMeaning};
use xxxterm::view::{HeadlessView, ViewEvent, ViewLog};

fn setup() -> (App, ViewLog, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = SettingsEngine::new(Some(dir.path().join("xxxterm.json").to_string_lossy().to_string()));
    settings.set_from_str("paths.work_dir", &dir.path().to_string_lossy()).unwrap();
    settings.set_from_str("network.use_threads", "false").unwrap();
    let log: ViewLog = Arc::new(Mutex::new(Vec::new()));
    let app = App::with_database(settings, HeadlessView::factory(log.clone()), Database::open_in_memory().unwrap()).unwrap();
    (app, log, dir)
}

fn last_html(log: &ViewLog, tab: TabId) -> String {
    log.lock()
        .unwrap()
        .iter()
        .rev()
        .find_map(|(t, e)| match e {
            ViewEvent::LoadHtml { html, .. } if *t == tab => Some(html.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

#[rstest]
#[case("about", AboutPage::About)]
#[case("blank", AboutPage::Blank)]
#[case("certs", AboutPage::Certs)]
#[case("cookiewl", AboutPage::CookieWhitelist)]
#[case("cookiejar", AboutPage::CookieJar)]
#[case("downloads", AboutPage::Downloads)]
#[case("favorites", AboutPage::Favorites)]
#[case("help", AboutPage::Help)]
#[case("history", AboutPage::History)]
#[case("jswl", AboutPage::JsWhitelist)]
#[case("plwl", AboutPage::PluginWhitelist)]
#[case("set", AboutPage::Set)]
#[case("stats", AboutPage::Stats)]
#[case("marco", AboutPage::Marco)]
#[case("startpage", AboutPage::StartPage)]
fn dispatch_reaches_its_handler(#[case] name: &str, #[case] page: AboutPage) {
    let (mut app, log, _dir) = setup();
    let tab = app.open_tab(Some("https://example.org"), true);

    let got = about::dispatch(&mut app, tab, name, &Karg::default()).unwrap();
    assert_eq!(got, page);

    let t = app.tab_manager.get_tab(tab).unwrap();
    assert_eq!(t.xtp_meaning, XtpMeaning::About(page));
    assert_eq!(t.uri, format!("about:{}", name));
    assert!(t.chrome.oops.is_none());

    let html = last_html(&log, tab);
    if page == AboutPage::Blank {
        assert!(html.is_empty());
    } else {
        assert!(html.contains(&format!("data-page=\"{}\"", name)), "{} rendered {}", name, html);
    }
}

#[test]
fn dispatch_unknown_name_shows_oops() {
    let (mut app, log, _dir) = setup();
    let tab = app.open_tab(Some("about:help"), true);

    let err = about::dispatch(&mut app, tab, "nonexistent", &Karg::default()).unwrap_err();
    assert!(matches!(err, BrowserError::UnknownAboutPage(ref n) if n == "nonexistent"));

    let t = app.tab_manager.get_tab(tab).unwrap();
    assert_eq!(t.xtp_meaning, XtpMeaning::Normal);
    assert!(t.chrome.oops.as_deref().unwrap().contains("nonexistent"));
    assert!(last_html(&log, tab).contains("data-page=\"oops\""));
}

#[test]
fn dispatch_only_touches_requesting_tab() {
    let (mut app, _log, _dir) = setup();
    let a = app.open_tab(Some("about:help"), true);
    let b = app.open_tab(Some("about:marco"), false);

    about::dispatch(&mut app, a, "stats", &Karg::default()).unwrap();
    assert_eq!(app.tab_manager.get_tab(a).unwrap().xtp_meaning, XtpMeaning::About(AboutPage::Stats));
    assert_eq!(app.tab_manager.get_tab(b).unwrap().xtp_meaning, XtpMeaning::About(AboutPage::Marco));
}

#[test]
fn about_table_is_complete_and_ordered() {
    assert_eq!(about::about_list_size(), 15);
    for (i, entry) in ABOUT_LIST.iter().enumerate() {
        assert_eq!(entry.page.index(), i);
        assert!(about::lookup(entry.name).is_some());
    }
    assert!(about::lookup("oops").is_none());
}

#[test]
fn navigate_routes_about_and_xxxt_names() {
    let (mut app, _log, _dir) = setup();
    let tab = app.open_tab(None, true);
    app.navigate(tab, "about:history").unwrap();
    assert_eq!(app.tab_manager.get_tab(tab).unwrap().xtp_meaning, XtpMeaning::About(AboutPage::History));

    app.navigate(tab, "xxxt://downloads").unwrap();
    assert_eq!(app.tab_manager.get_tab(tab).unwrap().xtp_meaning, XtpMeaning::About(AboutPage::Downloads));
}

#[test]
fn certs_without_ca_file_says_so() {
    let (mut app, log, _dir) = setup();
    let tab = app.open_tab(Some("about:certs"), true);
    assert!(last_html(&log, tab).contains("No CA file configured"));
}

#[test]
fn certs_lists_bundle_fingerprints() {
    let (mut app, log, dir) = setup();
    let ca = dir.path().join("ca.pem");
    std::fs::write(&ca, "-----BEGIN CERTIFICATE-----\nAAECAw==\n-----END CERTIFICATE-----\n").unwrap();
    app.set_setting("paths.ssl_ca_file", &ca.to_string_lossy()).unwrap();

    let tab = app.open_tab(Some("about:certs"), true);
    let html = last_html(&log, tab);
    assert!(html.contains("1 certificate(s)"));
    assert!(html.contains("4 bytes"));
}

#[test]
fn certs_with_missing_file_shows_oops() {
    let (mut app, _log, dir) = setup();
    let missing = dir.path().join("missing.pem");
    app.set_setting("paths.ssl_ca_file", &missing.to_string_lossy()).unwrap();

    let tab = app.open_tab(None, true);
    assert!(about::dispatch(&mut app, tab, "certs", &Karg::default()).is_err());
    let t = app.tab_manager.get_tab(tab).unwrap();
    assert!(t.chrome.oops.is_some());
    assert_eq!(t.xtp_meaning, XtpMeaning::Normal);
}

#[test]
fn history_page_filters_by_query() {
    let (mut app, log, _dir) = setup();
    let tab = app.open_tab(Some("https://www.rust-lang.org/"), true);
    app.page_loaded(tab, "https://www.rust-lang.org/", "Rust").unwrap();
    app.navigate(tab, "https://example.org/").unwrap();
    app.page_loaded(tab, "https://example.org/", "Example").unwrap();

    app.navigate(tab, "about:history?rust").unwrap();
    let html = last_html(&log, tab);
    assert!(html.contains("https://www.rust-lang.org/"));
    assert!(!html.contains("https://example.org/"));
}

#[test]
fn whitelist_pages_list_entries() {
    let (mut app, log, _dir) = setup();
    app.set_setting("privacy.js_wl", r#"[".example.org", "docs.rs"]"#).unwrap();
    let tab = app.open_tab(Some("about:jswl"), true);
    let html = last_html(&log, tab);
    assert!(html.contains(".example.org"));
    assert!(html.contains("domain and subdomains"));
    assert!(html.contains("docs.rs"));
    assert!(html.contains("exact host"));
}

#[test]
fn refresh_tabs_rerenders_only_matching_tabs() {
    let (mut app, log, _dir) = setup();
    let downloads = app.open_tab(Some("about:downloads"), true);
    let help = app.open_tab(Some("about:help"), false);
    log.lock().unwrap().clear();

    app.start_download("https://example.org/file.bin", None, None);

    let log = log.lock().unwrap();
    assert!(log.iter().any(|(t, e)| *t == downloads && matches!(e, ViewEvent::LoadHtml { html, .. } if html.contains("file.bin"))));
    assert!(!log.iter().any(|(t, _)| *t == help));
}

#[test]
fn history_page_reads_q_parameter() {
    let (mut app, log, _dir) = setup();
    let tab = app.open_tab(Some("https://www.rust-lang.org/"), true);
    app.page_loaded(tab, "https://www.rust-lang.org/", "Rust Programming").unwrap();
    app.navigate(tab, "https://example.org/").unwrap();
    app.page_loaded(tab, "https://example.org/", "Example").unwrap();

    app.navigate(tab, "about:history?q=rust+programming").unwrap();
    let html = last_html(&log, tab);
    assert!(html.contains("https://www.rust-lang.org/"));
    assert!(!html.contains("https://example.org/"));
    assert_eq!(app.tab_manager.get_tab(tab).unwrap().uri, "about:history?q=rust%20programming");
}

#[test]
fn history_page_without_matches_names_the_filter() {
    let (mut app, log, _dir) = setup();
    let tab = app.open_tab(Some("https://example.org/"), true);
    app.page_loaded(tab, "https://example.org/", "Example").unwrap();

    app.navigate(tab, "about:history?q=zig").unwrap();
    let html = last_html(&log, tab);
    assert!(html.contains("No history entries match &quot;zig&quot;"));
    assert!(!html.contains("History is empty"));

    let empty = app.open_tab(None, true);
    app.history_manager.clear();
    app.navigate(empty, "about:history").unwrap();
    assert!(last_html(&log, empty).contains("History is empty."));
}

#[test]
fn history_remove_keeps_the_filter() {
    let (mut app, log, _dir) = setup();
    let tab = app.open_tab(Some("https://a.rust-lang.org/"), true);
    for (uri, title) in [
        ("https://a.rust-lang.org/", "A"),
        ("https://b.rust-lang.org/", "B"),
        ("https://example.org/", "Example"),
    ] {
        app.navigate(tab, uri).unwrap();
        app.page_loaded(tab, uri, title).unwrap();
    }
    app.navigate(tab, "about:history?q=rust").unwrap();

    // Position 0 in the whole index is the first rust-lang entry.
    let remove = app.xtp_keys.link(XtpClass::History, XtpCommand::Remove(0));
    app.navigate(tab, &remove).unwrap();

    let html = last_html(&log, tab);
    assert!(!html.contains("https://a.rust-lang.org/"));
    assert!(html.contains("https://b.rust-lang.org/"));
    assert!(!html.contains("https://example.org/"));
    assert_eq!(app.tab_manager.get_tab(tab).unwrap().uri, "about:history?q=rust");
}

#[test]
fn cookie_jar_lists_rejected_cookies_when_kept() {
    let (mut app, log, _dir) = setup();
    app.set_setting("privacy.save_rejected_cookies", "true").unwrap();
    app.offer_cookie(Cookie::new("track", "x", ".ads.net")).unwrap();

    let tab = app.open_tab(Some("about:cookiejar"), true);
    let html = last_html(&log, tab);
    assert!(html.contains("Rejected cookies"));
    assert!(html.contains("ads.net"));
    assert!(html.contains("track"));

    app.set_setting("privacy.save_rejected_cookies", "false").unwrap();
    app.navigate(tab, "about:cookiejar").unwrap();
    assert!(!last_html(&log, tab).contains("Rejected cookies"));
}
