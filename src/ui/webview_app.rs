//! WebView-based browser application using `wry` + `tao`.
//!
//! Architecture:
//! - One window, one `wry` view. Tabs are browser state; whatever the active
//!   tab holds is what the view shows.
//! - Every tab gets a [`ProxyView`], which turns load/search/style requests
//!   into [`UserEvent`]s on the event loop. Requests from inactive tabs only
//!   update state.
//! - `with_initialization_script(TOOLBAR_JS)` injects the tab strip and URI
//!   entry into network pages. Synthesized internal pages carry it inlined.
//! - `about:` and `xxxt://` navigations are stopped by the navigation handler
//!   and routed through the about dispatcher instead.
//! - IPC from JS → Rust via `window.ipc.postMessage()`.
//! - After each page load the engine's cookies for the page go through the
//!   cookie jar; the ones it rejects are deleted from the engine.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tao::event::{Event, StartCause, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy};
use tao::window::WindowBuilder;
use wry::WebViewBuilder;

use crate::about;
use crate::app::{suggested_filename, App};
use crate::managers::tab_manager::TabManagerTrait;
use crate::managers::whitelist_manager::host_of;
use crate::platform;
use crate::services::settings_engine::SettingsEngine;
use crate::types::cookie::Cookie;
use crate::types::errors::BrowserError;
use crate::types::tab::{InspectorCmd, InspectorState, TabId};
use crate::view::{ContentPolicy, ViewFactory, WebView};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug)]
enum UserEvent {
    Load { tab: TabId, uri: String },
    Html { tab: TabId, html: String },
    Reload(TabId),
    Stop(TabId),
    Eval { tab: TabId, script: String },
    Policy { tab: TabId, policy: ContentPolicy },
    Inspector { tab: TabId, visible: bool },
    /// Run the engine's cookies for this URI through the jar.
    SyncCookies(String),
    /// Re-show the active tab (after a tab switch or close).
    ShowActive,
    /// Push tab strip and URI entry state into the page.
    Chrome,
    /// An internal URI the page tried to navigate to.
    Internal(String),
    TitleChanged(String),
    DownloadStarted { uri: String, path: PathBuf },
    DownloadFinished { uri: String, success: bool },
}

/// What the event loop does to the window after a state change.
enum Action {
    LoadUrl(String),
    LoadHtml(String),
    Reload,
    Eval(String),
    Title(String),
    Policy(ContentPolicy),
    Inspector(bool),
}

struct BrowserState {
    app: App,
}

fn lock(state: &Mutex<BrowserState>) -> MutexGuard<'_, BrowserState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ─── Tab views ───

/// The view of one tab: forwards requests to the single `wry` view.
struct ProxyView {
    tab: TabId,
    proxy: EventLoopProxy<UserEvent>,
}

impl ProxyView {
    fn factory(proxy: EventLoopProxy<UserEvent>) -> ViewFactory {
        Box::new(move |tab| {
            Box::new(ProxyView {
                tab,
                proxy: proxy.clone(),
            }) as Box<dyn WebView>
        })
    }

    fn send(&self, event: UserEvent) {
        if self.proxy.send_event(event).is_err() {
            debug!("tab {}: event loop gone", self.tab);
        }
    }
}

impl WebView for ProxyView {
    fn load_uri(&mut self, uri: &str) {
        self.send(UserEvent::Load {
            tab: self.tab,
            uri: uri.to_string(),
        });
    }

    fn load_html(&mut self, html: &str, _base_uri: &str) {
        self.send(UserEvent::Html {
            tab: self.tab,
            html: html.to_string(),
        });
    }

    fn reload(&mut self) {
        self.send(UserEvent::Reload(self.tab));
    }

    fn stop(&mut self) {
        self.send(UserEvent::Stop(self.tab));
    }

    fn search(&mut self, text: &str, forward: bool) {
        let script = format!(
            "window.find({}, false, {}, true)",
            serde_json::Value::String(text.to_string()),
            !forward
        );
        self.send(UserEvent::Eval { tab: self.tab, script });
    }

    fn set_stylesheet(&mut self, css: Option<&str>) {
        let script = match css {
            Some(css) => format!(
                "(function(){{var s=document.getElementById('__xt_style');\
                 if(!s){{s=document.createElement('style');s.id='__xt_style';document.documentElement.appendChild(s)}}\
                 s.textContent={};}})()",
                serde_json::Value::String(css.to_string())
            ),
            None => "(function(){var s=document.getElementById('__xt_style');if(s)s.remove();})()".to_string(),
        };
        self.send(UserEvent::Eval { tab: self.tab, script });
    }

    fn set_policy(&mut self, policy: ContentPolicy) {
        self.send(UserEvent::Policy { tab: self.tab, policy });
    }

    fn show_inspector(&mut self, visible: bool) {
        self.send(UserEvent::Inspector { tab: self.tab, visible });
    }
}

// ─── Toolbar ───

const TOOLBAR_JS: &str = r#"(function(){
if(window.__xt_toolbar)return;window.__xt_toolbar=true;
function send(cmd,args){var m=args||{};m.cmd=cmd;window.ipc.postMessage(JSON.stringify(m));}
window.__xt_ipc=send;
function esc(s){return String(s).replace(/[&<>"]/g,function(c){return{'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;'}[c];});}
function build(){
 if(document.getElementById('__xt_bar'))return;
 var bar=document.createElement('div');bar.id='__xt_bar';
 bar.style.cssText='position:fixed;top:0;left:0;right:0;z-index:2147483647;font:12px monospace;background:#222;color:#ddd;border-bottom:1px solid #444';
 bar.innerHTML='<div id="__xt_tabs" style="display:flex;overflow-x:auto;white-space:nowrap"></div>'+
  '<div style="display:flex;gap:2px;padding:2px">'+
  '<button data-c="back">&lt;</button><button data-c="forward">&gt;</button><button data-c="reload">r</button>'+
  '<input id="__xt_uri" style="flex:1;font:inherit;background:#111;color:#eee;border:1px solid #555">'+
  '<button data-c="add_favorite">fav</button><button data-c="toggle_style">css</button><button data-c="new_tab">+</button></div>'+
  '<div id="__xt_status" style="padding:0 4px;color:#999"></div>';
 document.documentElement.appendChild(bar);
 if(document.body)document.body.style.marginTop='64px';
 bar.addEventListener('click',function(e){
  var t=e.target,c=t.getAttribute('data-c'),id=t.getAttribute('data-tab');
  if(c)send(c);
  if(id)send(t.getAttribute('data-close')?'close_tab':'switch_tab',{id:+id});
 });
 document.getElementById('__xt_uri').addEventListener('keydown',function(e){
  if(e.key==='Enter'){send('navigate',{uri:e.target.value});e.target.blur();}
 });
}
window.__xt_update=function(s){
 build();
 var h='';
 s.tabs.forEach(function(t){
  var on=t.id===s.active;
  h+='<span style="padding:2px 6px;cursor:pointer;'+(on?'background:#444;color:#fff':'')+'" data-tab="'+t.id+'">'+
   (t.icon?'<img src="'+esc(t.icon)+'" style="width:12px;height:12px;vertical-align:middle"> ':'')+
   esc(t.title||t.uri||'(untitled)')+
   ' <b data-tab="'+t.id+'" data-close="1">x</b></span>';
 });
 document.getElementById('__xt_tabs').innerHTML=h;
 var u=document.getElementById('__xt_uri');
 if(document.activeElement!==u)u.value=s.uri||'';
 document.getElementById('__xt_status').textContent=s.status||'';
};
document.addEventListener('keydown',function(e){
 if(e.target&&(e.target.tagName==='INPUT'||e.target.tagName==='TEXTAREA'))return;
 if(e.ctrlKey&&e.key==='t'){send('new_tab');e.preventDefault();}
 else if(e.ctrlKey&&e.key==='w'){send('close_tab',{});e.preventDefault();}
 else if(e.ctrlKey&&e.key==='l'){var u=document.getElementById('__xt_uri');if(u){u.focus();u.select();}e.preventDefault();}
 else if(e.ctrlKey&&e.key==='PageDown'){send('next_tab');e.preventDefault();}
 else if(e.ctrlKey&&e.key==='PageUp'){send('prev_tab');e.preventDefault();}
 else if(e.ctrlKey&&e.shiftKey&&e.key==='I'){send('inspector',{action:'show'});e.preventDefault();}
 else if(e.ctrlKey&&e.shiftKey&&e.key==='K'){send('inspector',{action:'close'});e.preventDefault();}
});
function ready(){build();send('page_loaded',{uri:location.href,title:document.title});}
if(document.readyState==='loading')document.addEventListener('DOMContentLoaded',ready);else ready();
})();"#;

/// Removes plugin content now and whenever the page adds more.
const STRIP_PLUGINS_JS: &str = r#"(function(){
function strip(){document.querySelectorAll('embed,object,applet').forEach(function(e){e.remove();});}
strip();
if(window.__xt_plugins)return;
window.__xt_plugins=new MutationObserver(strip);
window.__xt_plugins.observe(document.documentElement,{childList:true,subtree:true});
})();"#;

/// Internal pages are loaded as HTML strings, where the initialization
/// script is not guaranteed to run; the toolbar goes in inline.
fn with_toolbar(html: &str) -> String {
    let script = format!("<script>{}</script>", TOOLBAR_JS);
    match html.rfind("</body>") {
        Some(i) => format!("{}{}{}", &html[..i], script, &html[i..]),
        None => format!("{}{}", html, script),
    }
}

fn build_chrome_update(app: &App) -> String {
    let tabs: Vec<serde_json::Value> = app
        .tab_manager
        .tabs()
        .map(|t| serde_json::json!({"id": t.id, "title": t.title, "uri": t.uri, "icon": t.icon}))
        .collect();
    let active = app.tab_manager.active_tab();
    let state = serde_json::json!({
        "tabs": tabs,
        "active": active.map(|t| t.id),
        "uri": active.map(|t| t.chrome.uri_entry.clone()),
        "status": active.and_then(|t| t.status.clone()),
    });
    format!("if(window.__xt_update)__xt_update({})", state)
}

fn chrome_actions(app: &App) -> Vec<Action> {
    let title = app
        .tab_manager
        .active_tab()
        .map(|t| format!("{} - xxxterm", t.title))
        .unwrap_or_else(|| "xxxterm".to_string());
    vec![Action::Eval(build_chrome_update(app)), Action::Title(title)]
}

/// The content of the active tab, as the view should show it.
fn show_active(app: &App) -> Vec<Action> {
    let mut out = match app.tab_manager.active_tab() {
        Some(t) => {
            let mut out = match &t.content {
                Some(html) => vec![Action::LoadHtml(with_toolbar(html))],
                None if !t.uri.is_empty() => vec![Action::Policy(t.policy), Action::LoadUrl(t.uri.clone())],
                None => Vec::new(),
            };
            out.push(Action::Inspector(t.inspector == InspectorState::Shown));
            out
        }
        None => Vec::new(),
    };
    out.extend(chrome_actions(app));
    out
}

// ─── IPC handler ───

fn msg_tab(msg: &serde_json::Value) -> Option<TabId> {
    msg.get("id").and_then(|v| v.as_u64()).map(|n| TabId(n as u32))
}

fn msg_str<'a>(msg: &'a serde_json::Value, key: &str) -> &'a str {
    msg.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn handle_ipc(state: &mut BrowserState, message: &str) -> Option<UserEvent> {
    let msg: serde_json::Value = serde_json::from_str(message).ok()?;
    let cmd = msg.get("cmd")?.as_str()?;
    let app = &mut state.app;
    let active = app.tab_manager.active_id();

    let result = match cmd {
        "new_tab" => {
            app.open_tab(None, true);
            Ok(())
        }

        "close_tab" => {
            let Some(id) = msg_tab(&msg).or(active) else {
                return None;
            };
            let closed = app.close_tab(id);
            if app.tab_manager.tab_count() == 0 {
                app.open_tab(None, true);
            }
            return closed.ok().map(|_| UserEvent::ShowActive);
        }

        "switch_tab" => {
            let id = msg_tab(&msg)?;
            return app.tab_manager.switch_tab(id).ok().map(|_| UserEvent::ShowActive);
        }

        "next_tab" => return app.tab_manager.next_tab().map(|_| UserEvent::ShowActive),
        "prev_tab" => return app.tab_manager.prev_tab().map(|_| UserEvent::ShowActive),

        "navigate" => app.navigate(active?, msg_str(&msg, "uri")),
        "back" => app.go_back(active?).map(|_| ()),
        "forward" => app.go_forward(active?).map(|_| ()),
        "reload" => app.reload(active?),
        "add_favorite" => app.add_favorite(active?).map(|_| ()),

        "page_loaded" => {
            let uri = msg_str(&msg, "uri");
            match app.page_loaded(active?, uri, msg_str(&msg, "title")) {
                Ok(()) if host_of(uri).is_some() => return Some(UserEvent::SyncCookies(uri.to_string())),
                other => other,
            }
        }

        "toggle_style" => app.toggle_style(active?).map(|_| ()),

        "inspector" => {
            let action = InspectorCmd::parse(msg_str(&msg, "action"))?;
            app.inspector(active?, action).map(|_| ())
        }

        "set_mark" => {
            let c = msg_str(&msg, "mark").chars().next()?;
            let pos = msg.get("position").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let tab = app.tab_manager.get_tab_mut(active?)?;
            tab.set_mark(c, pos).map_err(BrowserError::from)
        }

        "search" => {
            let forward = msg.get("forward").and_then(|v| v.as_bool()).unwrap_or(true);
            let tab = app.tab_manager.get_tab_mut(active?)?;
            tab.set_search(msg_str(&msg, "text"), forward);
            Ok(())
        }

        "set" => app.set_setting(msg_str(&msg, "key"), msg_str(&msg, "value")),

        other => {
            debug!("ipc: unknown command {:?}", other);
            return None;
        }
    };

    if let Err(e) = result {
        warn!("ipc {}: {}", cmd, e);
        if let Some(tab) = app.tab_manager.active_tab_mut() {
            tab.set_status(&e.to_string());
        }
    }
    Some(UserEvent::Chrome)
}

/// Apply one event to browser state and work out what the window must do.
fn apply_event(state: &mut BrowserState, event: UserEvent) -> Vec<Action> {
    let app = &mut state.app;
    let active = app.tab_manager.active_id();
    let is_active = |tab: TabId| active == Some(tab);

    match event {
        UserEvent::Load { tab, uri } if is_active(tab) => vec![Action::LoadUrl(uri)],
        UserEvent::Html { tab, html } if is_active(tab) => {
            let mut out = vec![Action::LoadHtml(with_toolbar(&html))];
            out.extend(chrome_actions(app));
            out
        }
        UserEvent::Reload(tab) if is_active(tab) => vec![Action::Reload],
        UserEvent::Stop(tab) if is_active(tab) => vec![Action::Eval("window.stop()".to_string())],
        UserEvent::Eval { tab, script } if is_active(tab) => vec![Action::Eval(script)],
        UserEvent::Policy { tab, policy } if is_active(tab) => vec![Action::Policy(policy)],
        UserEvent::Inspector { tab, visible } if is_active(tab) => vec![Action::Inspector(visible)],
        UserEvent::Load { .. }
        | UserEvent::Html { .. }
        | UserEvent::Reload(_)
        | UserEvent::Stop(_)
        | UserEvent::Eval { .. }
        | UserEvent::Policy { .. }
        | UserEvent::Inspector { .. } => Vec::new(),

        UserEvent::ShowActive => show_active(app),
        // The jar has already been synced by the event loop.
        UserEvent::Chrome | UserEvent::SyncCookies(_) => chrome_actions(app),

        UserEvent::Internal(uri) => {
            if let Some(tab) = active {
                if let Err(e) = app.navigate(tab, &uri) {
                    debug!("tab {}: {}: {}", tab, uri, e);
                }
            }
            chrome_actions(app)
        }

        UserEvent::TitleChanged(title) => {
            if let Some(tab) = active {
                let _ = app.title_changed(tab, &title);
            }
            chrome_actions(app)
        }

        UserEvent::DownloadStarted { uri, path } => {
            let id = app.start_download(&uri, Some(&path), active);
            if let Some(tab) = app.tab_manager.active_tab_mut() {
                tab.set_status(&format!("download {} started: {}", id, path.display()));
            }
            chrome_actions(app)
        }

        UserEvent::DownloadFinished { uri, success } => {
            if let Err(e) = app.download_completed_by_uri(&uri, success) {
                warn!("download {}: {}", uri, e);
            }
            Vec::new()
        }
    }
}

/// Turn page scripts on or off in the engine. Scripts the shell evaluates
/// itself keep running either way.
#[cfg(target_os = "linux")]
fn set_page_scripts(webview: &wry::WebView, enabled: bool) {
    use webkit2gtk::{SettingsExt, WebViewExt};
    use wry::WebViewExtUnix;
    match WebViewExt::settings(&webview.webview()) {
        Some(settings) => settings.set_enable_javascript_markup(enabled),
        None => warn!("webview: no settings object, script policy not applied"),
    }
}

#[cfg(not(target_os = "linux"))]
fn set_page_scripts(_webview: &wry::WebView, enabled: bool) {
    if !enabled {
        debug!("webview: page scripts cannot be switched off on this platform");
    }
}

fn perform(webview: &wry::WebView, window: &tao::window::Window, action: Action) {
    let result = match action {
        Action::LoadUrl(url) => webview.load_url(&url),
        Action::LoadHtml(html) => {
            // Internal pages carry the toolbar inline.
            set_page_scripts(webview, true);
            webview.load_html(&html)
        }
        Action::Reload => webview.reload(),
        Action::Eval(js) => webview.evaluate_script(&js),
        Action::Title(title) => {
            window.set_title(&title);
            Ok(())
        }
        Action::Policy(policy) => {
            set_page_scripts(webview, policy.scripts);
            if policy.plugins {
                Ok(())
            } else {
                webview.evaluate_script(STRIP_PLUGINS_JS)
            }
        }
        Action::Inspector(true) => {
            webview.open_devtools();
            Ok(())
        }
        Action::Inspector(false) => {
            webview.close_devtools();
            Ok(())
        }
    };
    if let Err(e) = result {
        warn!("webview: {}", e);
    }
}

// ─── Cookies ───

fn jar_cookie(c: &wry::cookie::Cookie<'_>, uri: &str) -> Cookie {
    let domain = c.domain().or_else(|| host_of(uri)).unwrap_or_default();
    let mut cookie = Cookie::new(c.name(), c.value(), domain);
    if let Some(path) = c.path() {
        cookie.path = path.to_string();
    }
    cookie.expires = c.expires_datetime().map(|t| t.unix_timestamp());
    cookie.secure = c.secure().unwrap_or(false);
    cookie.http_only = c.http_only().unwrap_or(false);
    cookie
}

/// Offer the engine's cookies for `uri` to the jar, then delete the ones it
/// rejected from the engine. The state lock is not held while the engine is
/// queried.
fn sync_cookies(webview: &wry::WebView, state: &Mutex<BrowserState>, uri: &str) {
    let engine = match webview.cookies_for_url(uri) {
        Ok(cookies) => cookies,
        Err(e) => {
            warn!("cookies for {}: {}", uri, e);
            return;
        }
    };
    let offered: Vec<Cookie> = engine.iter().map(|c| jar_cookie(c, uri)).collect();
    let rejected = match lock(state).app.sync_cookies(offered) {
        Ok(rejected) => rejected,
        Err(e) => {
            warn!("cookies for {}: {}", uri, e);
            return;
        }
    };
    for c in &engine {
        let key = jar_cookie(c, uri).key();
        if rejected.iter().any(|r| r.key() == key) {
            debug!("cookies: dropping {} from the engine", c.name());
            if let Err(e) = webview.delete_cookie(c) {
                warn!("cookies: {}: {}", c.name(), e);
            }
        }
    }
}

/// At most `max` bytes of `s`, cut on a character boundary.
fn log_excerpt(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let end = (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0);
    &s[..end]
}

// ─── Main entry point ───

pub fn run(rc_file: Option<String>, uris: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let event_loop: EventLoop<UserEvent> = EventLoopBuilder::with_user_event().build();
    let proxy = event_loop.create_proxy();

    let app = App::new(SettingsEngine::new(rc_file), ProxyView::factory(proxy.clone()))?;
    let state = Arc::new(Mutex::new(BrowserState { app }));
    lock(&state).app.startup(&uris);

    let window = WindowBuilder::new()
        .with_title("xxxterm")
        .with_inner_size(tao::dpi::LogicalSize::new(1024.0, 768.0))
        .build(&event_loop)?;

    let ipc_state = state.clone();
    let ipc_proxy = proxy.clone();
    let nav_proxy = proxy.clone();
    let title_proxy = proxy.clone();
    let dl_proxy = proxy.clone();
    let done_proxy = proxy.clone();

    let builder = WebViewBuilder::new()
        .with_initialization_script(TOOLBAR_JS)
        .with_html("")
        .with_ipc_handler(move |msg: wry::http::Request<String>| {
            let body = msg.body().as_str();
            debug!("ipc: {}", log_excerpt(body, 200));
            let event = handle_ipc(&mut lock(&ipc_state), body);
            if let Some(event) = event {
                let _ = ipc_proxy.send_event(event);
            }
        })
        .with_navigation_handler(move |uri: String| {
            // Loading an HTML string shows up as a navigation to about:blank.
            if uri == "about:blank" || uri.starts_with("data:") {
                return true;
            }
            if about::parse_internal_uri(&uri).is_some() {
                let _ = nav_proxy.send_event(UserEvent::Internal(uri));
                return false;
            }
            true
        })
        .with_document_title_changed_handler(move |title: String| {
            let _ = title_proxy.send_event(UserEvent::TitleChanged(title));
        })
        .with_download_started_handler(move |uri: String, path: &mut PathBuf| {
            if path.as_os_str().is_empty() || path.is_dir() {
                let dir = if path.is_dir() { path.clone() } else { platform::download_dir() };
                *path = dir.join(suggested_filename(&uri));
            }
            info!("download: {} -> {}", uri, path.display());
            let _ = dl_proxy.send_event(UserEvent::DownloadStarted { uri, path: path.clone() });
            true
        })
        .with_download_completed_handler(move |uri: String, _path: Option<PathBuf>, success: bool| {
            let _ = done_proxy.send_event(UserEvent::DownloadFinished { uri, success });
        })
        .with_devtools(true);

    #[cfg(target_os = "linux")]
    let webview = {
        use tao::platform::unix::WindowExtUnix;
        use wry::WebViewBuilderExtUnix;
        let vbox = window.default_vbox().ok_or("no GTK container in window")?;
        builder.build_gtk(vbox)?
    };

    #[cfg(not(target_os = "linux"))]
    let webview = builder.build(&window)?;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::WaitUntil(Instant::now() + POLL_INTERVAL);

        match event {
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => {
                lock(&state).app.shutdown();
                *control_flow = ControlFlow::Exit;
            }

            Event::NewEvents(StartCause::ResumeTimeReached { .. }) => {
                let actions = {
                    let mut s = lock(&state);
                    if s.app.poll_workers() > 0 {
                        chrome_actions(&s.app)
                    } else {
                        Vec::new()
                    }
                };
                for action in actions {
                    perform(&webview, &window, action);
                }
            }

            Event::UserEvent(user_event) => {
                if let UserEvent::SyncCookies(uri) = &user_event {
                    sync_cookies(&webview, &state, uri);
                }
                // The lock is released before touching the view: its handlers
                // may run synchronously.
                let actions = apply_event(&mut lock(&state), user_event);
                for action in actions {
                    perform(&webview, &window, action);
                }
            }

            _ => {}
        }
    });
}
