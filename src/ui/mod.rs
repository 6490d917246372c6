//! xxxterm UI layer.
//!
//! Uses `wry` for cross-platform WebView rendering:
//! - Linux: WebKitGTK
//! - macOS: WKWebView
//! - Windows: WebView2
//!
//! Tab strip and URI entry are HTML/JS injected into the page; commands come
//! back to Rust over wry IPC.

pub mod webview_app;
