//! xxxterm: a minimalist, keyboard-driven web browser shell.
//!
//! Entry point: opens the browser window with the URIs given on the command
//! line. When built without the `gui` feature, runs a console demo against
//! headless views.
//!
//! Usage: `xxxterm [-f rcfile] [uri ...]`

/// Command line: optional rc file override and the URIs to open.
struct Args {
    rc_file: Option<String>,
    uris: Vec<String>,
}

fn parse_args() -> Args {
    let mut args = std::env::args().skip(1);
    let mut parsed = Args {
        rc_file: None,
        uris: Vec::new(),
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-f" => parsed.rc_file = args.next(),
            "-V" | "--version" => {
                println!("xxxterm {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            _ => parsed.uris.push(arg),
        }
    }
    parsed
}

#[cfg(feature = "gui")]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = parse_args();
    if let Err(e) = xxxterm::ui::webview_app::run(args.rc_file, args.uris) {
        log::error!("xxxterm: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "gui"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = parse_args();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                xxxterm v{} — Demo Mode                    ║", env!("CARGO_PKG_VERSION"));
    println!("║        Headless views, no rendering engine attached          ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    if let Err(e) = demo::run(args.rc_file, &args.uris) {
        eprintln!("  ✗ demo failed: {}", e);
        std::process::exit(1);
    }

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("  ✅ All components demonstrated successfully!");
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(not(feature = "gui"))]
mod demo {
    use std::sync::{Arc, Mutex};

    use xxxterm::about;
    use xxxterm::about::xtp::{XtpClass, XtpCommand};
    use xxxterm::app::App;
    use xxxterm::database::Database;
    use xxxterm::managers::cookie_manager::CookieManagerTrait;
    use xxxterm::managers::download_manager::DownloadManagerTrait;
    use xxxterm::managers::history_manager::HistoryManagerTrait;
    use xxxterm::managers::tab_manager::TabManagerTrait;
    use xxxterm::services::settings_engine::SettingsEngine;
    use xxxterm::types::cookie::Cookie;
    use xxxterm::types::errors::BrowserError;
    use xxxterm::view::{HeadlessView, ViewEvent, ViewLog};

    fn section(name: &str) {
        println!("───────────────────────────────────────────────────────────────");
        println!("  📦 {}", name);
        println!("───────────────────────────────────────────────────────────────");
    }

    pub fn run(rc_file: Option<String>, uris: &[String]) -> Result<(), BrowserError> {
        let log: ViewLog = Arc::new(Mutex::new(Vec::new()));
        // The demo changes settings; keep it away from the real rc file.
        let rc = rc_file.unwrap_or_else(|| {
            std::env::temp_dir().join("xxxterm-demo.json").to_string_lossy().to_string()
        });
        let settings = SettingsEngine::new(Some(rc));
        let mut app = App::with_database(settings, HeadlessView::factory(log.clone()), Database::open_in_memory()?)?;

        demo_tabs(&mut app, uris)?;
        demo_history(&mut app)?;
        demo_downloads(&mut app)?;
        demo_cookies(&mut app)?;
        demo_about_pages(&mut app, &log)?;
        demo_xtp(&mut app)?;

        app.shutdown();
        Ok(())
    }

    fn demo_tabs(app: &mut App, uris: &[String]) -> Result<(), BrowserError> {
        section("Tab Registry");
        app.startup(uris);
        let t2 = app.open_tab(Some("example.org"), false);
        let t3 = app.open_tab(Some("about:help"), true);
        for tab in app.tab_manager.tabs() {
            println!("  tab {}: {} ({:?})", tab.id, tab.uri, tab.xtp_meaning);
        }
        app.close_tab(t2)?;
        println!("  Closed tab {}, {} open, active {:?}", t2, app.tab_manager.tab_count(),
            app.tab_manager.active_tab().map(|t| t.id));
        app.close_tab(t3)?;
        println!("  ✓ TabManager OK");
        println!();
        Ok(())
    }

    fn demo_history(app: &mut App) -> Result<(), BrowserError> {
        section("History Index");
        let tab = app.open_tab(Some("https://www.rust-lang.org"), true);
        app.page_loaded(tab, "https://www.rust-lang.org/", "Rust Programming Language")?;
        app.navigate(tab, "https://docs.rs")?;
        app.page_loaded(tab, "https://docs.rs/", "Docs.rs")?;
        app.go_back(tab)?;
        app.page_loaded(tab, "https://www.rust-lang.org/", "Rust Programming Language")?;
        for e in app.history_manager.iter() {
            println!("  {} — {} ({} visit(s))", e.uri, e.title, e.visits);
        }
        println!("  ✓ HistoryManager OK");
        println!();
        Ok(())
    }

    fn demo_downloads(app: &mut App) -> Result<(), BrowserError> {
        section("Download Index");
        let a = app.start_download("https://example.org/a.tar.gz", None, None);
        let b = app.start_download("https://example.org/b.iso", None, None);
        app.download_progress(a, 512, Some(1024))?;
        app.finish_download(a)?;
        app.download_progress(b, 10, None)?;
        app.cancel_download(b)?;
        for d in app.download_manager.iter() {
            println!("  #{} {} -> {} [{}]", d.id, d.uri, d.destination, d.state.label());
        }
        println!("  ✓ DownloadManager OK");
        println!();
        Ok(())
    }

    fn demo_cookies(app: &mut App) -> Result<(), BrowserError> {
        section("Cookie Jars");
        app.set_setting("privacy.cookie_wl", r#"[".example.org"]"#)?;
        let accepted = app.offer_cookie(Cookie::new("sid", "42", "www.example.org"))?;
        let rejected = !app.offer_cookie(Cookie::new("track", "1", "ads.example.net"))?;
        println!("  Whitelisted cookie accepted: {}", accepted);
        println!("  Foreign cookie rejected: {}", rejected);
        println!("  Session jar: {}, blocked: {}", app.cookie_manager.cookies().len(),
            app.cookie_manager.blocked_cookies());
        println!("  ✓ CookieManager OK");
        println!();
        Ok(())
    }

    fn demo_about_pages(app: &mut App, log: &ViewLog) -> Result<(), BrowserError> {
        section("About Pages");
        let tab = app.open_tab(Some("about:blank"), true);
        for entry in about::ABOUT_LIST {
            app.navigate(tab, &format!("about:{}", entry.name))?;
            let bytes = log
                .lock()
                .ok()
                .and_then(|l| {
                    l.iter().rev().find_map(|(t, e)| match e {
                        ViewEvent::LoadHtml { html, .. } if *t == tab => Some(html.len()),
                        _ => None,
                    })
                })
                .unwrap_or(0);
            println!("  about:{:<10} {:>6} bytes", entry.name, bytes);
        }
        if about::dispatch(app, tab, "nonsense", &Default::default()).is_err() {
            println!("  about:nonsense -> oops page");
        }
        println!("  ✓ About dispatcher OK ({} pages)", about::about_list_size());
        println!();
        Ok(())
    }

    fn demo_xtp(app: &mut App) -> Result<(), BrowserError> {
        section("xtp Commands");
        let tab = app.open_tab(Some("about:downloads"), true);
        let clear = app.xtp_keys.link(XtpClass::Downloads, XtpCommand::Clear);
        app.navigate(tab, &clear)?;
        println!("  Cleared finished downloads, {} left", app.download_manager.len());

        let forged = "xxxt://1/00000000/clear";
        if app.navigate(tab, forged).is_err() {
            println!("  Forged session key rejected");
        }
        println!("  ✓ xtp OK");
        Ok(())
    }
}
