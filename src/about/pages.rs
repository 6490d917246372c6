//! Handlers for the about table. Each one builds a page from browser state
//! and loads it into the requesting tab.

use std::fs;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ring::digest;

use super::html::{escape, kv_table, page};
use super::xtp::{XtpClass, XtpCommand};
use crate::app::App;
use crate::managers::cookie_manager::CookieManagerTrait;
use crate::managers::download_manager::DownloadManagerTrait;
use crate::managers::favorites_manager::FavoritesManagerTrait;
use crate::managers::history_manager::HistoryManagerTrait;
use crate::managers::tab_manager::TabManagerTrait;
use crate::managers::whitelist_manager::{WhitelistKind, WhitelistTrait};
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::about::{AboutPage, Karg};
use crate::types::download::DownloadState;
use crate::types::errors::BrowserError;
use crate::types::history::HistoryEntry;
use crate::types::tab::TabId;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn render(app: &mut App, tab: TabId, which: AboutPage, title: &str, body: &str, head: &str) -> Result<(), BrowserError> {
    render_at(app, tab, &which.uri(), which, title, body, head)
}

fn render_at(
    app: &mut App,
    tab: TabId,
    uri: &str,
    which: AboutPage,
    title: &str,
    body: &str,
    head: &str,
) -> Result<(), BrowserError> {
    let html = page(Some(which), title, body, head);
    app.load_html_string(tab, html, uri)?;
    Ok(())
}

fn link(href: &str, text: &str) -> String {
    format!("<a class=\"action\" href=\"{}\">{}</a>", escape(href), escape(text))
}

pub fn about(app: &mut App, tab: TabId, _args: &Karg) -> Result<(), BrowserError> {
    let body = format!(
        "<p>xxxterm {}</p>\
         <p>A minimalist browser that keeps out of the way: vi-like keys, \
         per-domain cookie, script and plugin whitelists.</p>\
         <p>{} {} {}</p>",
        escape(VERSION),
        link("about:help", "help"),
        link("about:stats", "statistics"),
        link("about:set", "settings"),
    );
    render(app, tab, AboutPage::About, "About xxxterm", &body, "")
}

pub fn blank(app: &mut App, tab: TabId, _args: &Karg) -> Result<(), BrowserError> {
    app.load_html_string(tab, String::new(), &AboutPage::Blank.uri())?;
    Ok(())
}

/// Lists the certificates of the configured CA bundle with their SHA-256
/// fingerprints.
pub fn certs(app: &mut App, tab: TabId, _args: &Karg) -> Result<(), BrowserError> {
    let ca_file = app.settings_engine.get_settings().paths.ssl_ca_file.clone();
    let body = match ca_file {
        None => "<p class=\"muted\">No CA file configured (paths.ssl_ca_file).</p>".to_string(),
        Some(path) => {
            let pem = fs::read_to_string(&path)?;
            let certs = pem_blocks(&pem);
            let mut out = format!(
                "<p>{} certificate(s) in {}</p><table><tr><th>#</th><th>SHA-256</th><th>Size</th></tr>",
                certs.len(),
                escape(&path)
            );
            for (i, der) in certs.iter().enumerate() {
                let row = match der {
                    Some(der) => format!(
                        "<tr><td>{}</td><td><code>{}</code></td><td>{} bytes</td></tr>",
                        i,
                        fingerprint(der),
                        der.len()
                    ),
                    None => format!("<tr><td>{}</td><td colspan=\"2\" class=\"oops\">invalid base64</td></tr>", i),
                };
                out.push_str(&row);
            }
            out.push_str("</table>");
            out
        }
    };
    render(app, tab, AboutPage::Certs, "Certificates", &body, "")
}

/// Decoded DER of every `CERTIFICATE` block; `None` for undecodable ones.
pub fn pem_blocks(pem: &str) -> Vec<Option<Vec<u8>>> {
    let mut out = Vec::new();
    let mut current: Option<String> = None;
    for line in pem.lines().map(str::trim) {
        match line {
            "-----BEGIN CERTIFICATE-----" => current = Some(String::new()),
            "-----END CERTIFICATE-----" => {
                if let Some(b64) = current.take() {
                    out.push(BASE64.decode(b64.as_bytes()).ok());
                }
            }
            _ => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(line);
                }
            }
        }
    }
    out
}

fn fingerprint(der: &[u8]) -> String {
    digest::digest(&digest::SHA256, der)
        .as_ref()
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

fn whitelist_page(app: &mut App, tab: TabId, kind: WhitelistKind) -> Result<(), BrowserError> {
    let privacy = &app.settings_engine.get_settings().privacy;
    let (which, title, policy) = match kind {
        WhitelistKind::Cookie => (
            AboutPage::CookieWhitelist,
            "Cookie whitelist",
            if privacy.enable_cookie_whitelist { "only whitelisted domains may set cookies" } else { "whitelist disabled, all cookies accepted" },
        ),
        WhitelistKind::JavaScript => (
            AboutPage::JsWhitelist,
            "JavaScript whitelist",
            if privacy.enable_scripts { "scripts enabled everywhere" } else { "scripts only on whitelisted domains" },
        ),
        WhitelistKind::Plugin => (
            AboutPage::PluginWhitelist,
            "Plugin whitelist",
            if privacy.enable_plugins { "plugins enabled everywhere" } else { "plugins only on whitelisted domains" },
        ),
    };

    let entries = app.whitelists.get(kind).entries();
    let mut body = format!("<p>Policy: {}</p>", policy);
    if entries.is_empty() {
        body.push_str("<p class=\"muted\">No entries.</p>");
    } else {
        body.push_str("<table><tr><th>Domain</th><th>Covers</th></tr>");
        for d in entries {
            let covers = if d.starts_with('.') { "domain and subdomains" } else { "exact host" };
            body.push_str(&format!("<tr><td>{}</td><td>{}</td></tr>", escape(d), covers));
        }
        body.push_str("</table>");
    }
    render(app, tab, which, title, &body, "")
}

pub fn cookie_whitelist(app: &mut App, tab: TabId, _args: &Karg) -> Result<(), BrowserError> {
    whitelist_page(app, tab, WhitelistKind::Cookie)
}

pub fn js_whitelist(app: &mut App, tab: TabId, _args: &Karg) -> Result<(), BrowserError> {
    whitelist_page(app, tab, WhitelistKind::JavaScript)
}

pub fn plugin_whitelist(app: &mut App, tab: TabId, _args: &Karg) -> Result<(), BrowserError> {
    whitelist_page(app, tab, WhitelistKind::Plugin)
}

pub fn cookie_jar(app: &mut App, tab: TabId, _args: &Karg) -> Result<(), BrowserError> {
    let persistent = app.cookie_manager.persistent_cookies()?.len();
    let mut body = format!(
        "<p>{} cookie(s) in the session jar, {} stored on disk, {} blocked.</p>",
        app.cookie_manager.cookies().len(),
        persistent,
        app.cookie_manager.blocked_cookies()
    );
    body.push_str(
        "<table><tr><th>Domain</th><th>Path</th><th>Name</th><th>Value</th>\
         <th>Expires</th><th>Flags</th><th></th></tr>",
    );
    for (i, c) in app.cookie_manager.cookies().iter().enumerate() {
        let mut flags = Vec::new();
        if c.secure {
            flags.push("secure");
        }
        if c.http_only {
            flags.push("httponly");
        }
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&c.domain),
            escape(&c.path),
            escape(&c.name),
            escape(&c.value),
            c.expires.map_or_else(|| "session".to_string(), |e| e.to_string()),
            flags.join(" "),
            link(&app.xtp_keys.link(XtpClass::Cookies, XtpCommand::Remove(i)), "remove"),
        ));
    }
    body.push_str("</table>");

    if app.settings_engine.get_settings().privacy.save_rejected_cookies {
        let rejected = app.cookie_manager.rejected()?;
        body.push_str(&format!("<h2>Rejected cookies</h2><p>{} rejected.</p>", rejected.len()));
        if !rejected.is_empty() {
            body.push_str("<table><tr><th>Domain</th><th>Path</th><th>Name</th><th>Value</th></tr>");
            for c in &rejected {
                body.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    escape(&c.domain),
                    escape(&c.path),
                    escape(&c.name),
                    escape(&c.value),
                ));
            }
            body.push_str("</table>");
        }
    }
    render(app, tab, AboutPage::CookieJar, "Cookie jar", &body, "")
}

pub fn downloads(app: &mut App, tab: TabId, _args: &Karg) -> Result<(), BrowserError> {
    let keys = &app.xtp_keys;
    let mut live = false;
    let mut body = format!(
        "<p>{} {}</p>",
        link(&keys.link(XtpClass::Downloads, XtpCommand::List), "refresh"),
        link(&keys.link(XtpClass::Downloads, XtpCommand::Clear), "clear finished"),
    );
    if app.download_manager.is_empty() {
        body.push_str("<p class=\"muted\">No downloads.</p>");
    } else {
        body.push_str("<table><tr><th>#</th><th>File</th><th>Source</th><th>Status</th><th>Progress</th><th></th></tr>");
        for d in app.download_manager.iter() {
            live |= !d.state.is_terminal();
            let progress = match (d.percent(), &d.state) {
                (_, DownloadState::Error(reason)) => escape(reason),
                (Some(p), _) => format!("{}%", p),
                (None, _) => format!("{} bytes", d.received),
            };
            let action = if d.state.is_terminal() {
                link(&keys.link(XtpClass::Downloads, XtpCommand::Remove(d.id as usize)), "remove")
            } else {
                link(&keys.link(XtpClass::Downloads, XtpCommand::Cancel(d.id)), "cancel")
            };
            body.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                d.id,
                escape(&d.filename),
                escape(&d.uri),
                d.state.label(),
                progress,
                action,
            ));
        }
        body.push_str("</table>");
    }

    let interval = app.settings_engine.get_settings().general.refresh_interval;
    let head = if live && interval > 0 {
        format!(
            "<meta http-equiv=\"refresh\" content=\"{}; url={}\">",
            interval,
            escape(&app.xtp_keys.link(XtpClass::Downloads, XtpCommand::List))
        )
    } else {
        String::new()
    };
    render(app, tab, AboutPage::Downloads, "Downloads", &body, &head)
}

pub fn favorites(app: &mut App, tab: TabId, _args: &Karg) -> Result<(), BrowserError> {
    let mut body = String::new();
    if app.favorites_manager.list().is_empty() {
        body.push_str("<p class=\"muted\">No favorites yet.</p>");
    } else {
        body.push_str("<table><tr><th>#</th><th>Title</th><th></th></tr>");
        for (i, f) in app.favorites_manager.list().iter().enumerate() {
            body.push_str(&format!(
                "<tr><td>{}</td><td><a href=\"{}\">{}</a></td><td>{}</td></tr>",
                i + 1,
                escape(&f.uri),
                escape(&f.title),
                link(&app.xtp_keys.link(XtpClass::Favorites, XtpCommand::Remove(i)), "remove"),
            ));
        }
        body.push_str("</table>");
    }
    render(app, tab, AboutPage::Favorites, "Favorites", &body, "")
}

pub fn help(app: &mut App, tab: TabId, _args: &Karg) -> Result<(), BrowserError> {
    let rows: Vec<(String, String)> = [
        ("o / O", "open a URI in this tab / edit the current one"),
        ("t / T", "open a URI in a new tab"),
        ("gt / gT", "next / previous tab"),
        ("H / L", "back / forward"),
        ("r", "reload"),
        ("/ ?", "search forward / backward"),
        ("m<c> / '<c>", "set / jump to mark c (a-z, A-Z, 0-9)"),
        ("f", "follow hint"),
        (":fav", "add the current page to favorites"),
        (":set key value", "change a setting"),
        (":q", "close the tab"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let pages: Vec<String> = super::ABOUT_LIST
        .iter()
        .map(|e| link(&format!("about:{}", e.name), e.name))
        .collect();
    let body = format!("{}<h2>Internal pages</h2><p>{}</p>", kv_table(&rows), pages.join(" "));
    render(app, tab, AboutPage::Help, "Help", &body, "")
}

/// The history filter in a page query: the `q` parameter when the query
/// has parameters, the whole query otherwise, form-decoded.
pub fn history_filter(args: &Karg) -> Option<String> {
    let raw = args.s.as_deref()?;
    let raw = if raw.contains('=') {
        raw.split('&').find_map(|p| p.strip_prefix("q="))?
    } else {
        raw
    };
    let raw = raw.replace('+', " ");
    let decoded = match urlencoding::decode(&raw) {
        Ok(s) => s.into_owned(),
        Err(_) => raw.clone(),
    };
    let decoded = decoded.trim();
    (!decoded.is_empty()).then(|| decoded.to_string())
}

pub fn history(app: &mut App, tab: TabId, args: &Karg) -> Result<(), BrowserError> {
    let filter = history_filter(args);
    let mut body = String::new();
    if let Some(q) = &filter {
        body.push_str(&format!("<p>Entries matching &quot;{}&quot;</p>", escape(q)));
    }

    // Remove links carry the position in the whole index.
    let rows: Vec<(usize, &HistoryEntry)> = match &filter {
        Some(q) => {
            let hits = app.history_manager.search(q);
            app.history_manager
                .iter()
                .enumerate()
                .filter(|(_, e)| hits.iter().any(|h| h.uri == e.uri))
                .collect()
        }
        None => app.history_manager.iter().enumerate().collect(),
    };
    if rows.is_empty() {
        match &filter {
            Some(q) => body.push_str(&format!(
                "<p class=\"muted\">No history entries match &quot;{}&quot;.</p>",
                escape(q)
            )),
            None => body.push_str("<p class=\"muted\">History is empty.</p>"),
        }
    } else {
        body.push_str("<table><tr><th>URI</th><th>Title</th><th>Visits</th><th></th></tr>");
        for (i, h) in rows {
            body.push_str(&format!(
                "<tr><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&h.uri),
                escape(&h.uri),
                escape(&h.title),
                h.visits,
                link(&app.xtp_keys.link(XtpClass::History, XtpCommand::Remove(i)), "remove"),
            ));
        }
        body.push_str("</table>");
    }

    let uri = match &filter {
        Some(q) => format!("{}?q={}", AboutPage::History.uri(), urlencoding::encode(q)),
        None => AboutPage::History.uri(),
    };
    render_at(app, tab, &uri, AboutPage::History, "History", &body, "")
}

pub fn set(app: &mut App, tab: TabId, _args: &Karg) -> Result<(), BrowserError> {
    let rows = app.settings_engine.flatten();
    let body = format!(
        "<p>rc file: {}</p>{}<p class=\"muted\">Change a value with <code>:set key value</code>.</p>",
        escape(app.settings_engine.get_config_path()),
        kv_table(&rows)
    );
    render(app, tab, AboutPage::Set, "Settings", &body, "")
}

pub fn stats(app: &mut App, tab: TabId, _args: &Karg) -> Result<(), BrowserError> {
    let rows = vec![
        ("Open tabs".to_string(), app.tab_manager.tab_count().to_string()),
        ("Downloads".to_string(), app.download_manager.len().to_string()),
        ("History entries".to_string(), app.history_manager.len().to_string()),
        ("Favorites".to_string(), app.favorites_manager.list().len().to_string()),
        ("Session cookies".to_string(), app.cookie_manager.cookies().len().to_string()),
        ("Blocked cookies".to_string(), app.cookie_manager.blocked_cookies().to_string()),
        ("Worker threads running".to_string(), app.workers.running().to_string()),
    ];
    render(app, tab, AboutPage::Stats, "Statistics", &kv_table(&rows), "")
}

pub fn marco(app: &mut App, tab: TabId, _args: &Karg) -> Result<(), BrowserError> {
    let body = "<blockquote><p>Polo!</p></blockquote>\
                <p class=\"muted\">Some people shout into the void; some people build browsers.</p>";
    render(app, tab, AboutPage::Marco, "Marco", body, "")
}

pub fn startpage(app: &mut App, tab: TabId, _args: &Karg) -> Result<(), BrowserError> {
    let mut body = String::from("<p>Welcome. Press <code>o</code> to open a URI.</p>");
    let favs = app.favorites_manager.list();
    if !favs.is_empty() {
        body.push_str("<h2>Favorites</h2><ul>");
        for f in favs.iter().take(10) {
            body.push_str(&format!("<li><a href=\"{}\">{}</a></li>", escape(&f.uri), escape(&f.title)));
        }
        body.push_str("</ul>");
    }
    body.push_str(&format!(
        "<p>{} {} {}</p>",
        link("about:history", "history"),
        link("about:downloads", "downloads"),
        link("about:help", "help")
    ));
    render(app, tab, AboutPage::StartPage, "Start page", &body, "")
}
