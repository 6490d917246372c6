//! Shared chrome for synthesized pages.

use crate::types::about::AboutPage;

const STYLE: &str = "body{font-family:sans-serif;margin:1.5em;color:#222;background:#fafafa}\
h1{font-size:1.4em;border-bottom:1px solid #ccc;padding-bottom:.3em}\
table{border-collapse:collapse;width:100%}\
th,td{border:1px solid #ddd;padding:.3em .6em;text-align:left;vertical-align:top}\
th{background:#eee}tr:nth-child(even){background:#f3f3f3}\
.oops{color:#a00}.muted{color:#777}a.action{margin-right:.6em}";

/// Escape text for HTML element content and attribute values.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A complete page. `page` tags the body so each internal page can be told
/// apart; `None` is used for the oops page.
pub fn page(page: Option<AboutPage>, title: &str, body: &str, head: &str) -> String {
    let tag = page.map(AboutPage::name).unwrap_or("oops");
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"UTF-8\"><title>{title}</title>\
         <style>{STYLE}</style>{head}</head>\
         <body data-page=\"{tag}\"><h1>{title}</h1>{body}</body></html>",
        title = escape(title),
    )
}

/// A two-column table of `(key, value)` rows; values are escaped.
pub fn kv_table(rows: &[(String, String)]) -> String {
    let mut out = String::from("<table><tr><th>Name</th><th>Value</th></tr>");
    for (k, v) in rows {
        out.push_str(&format!("<tr><td>{}</td><td>{}</td></tr>", escape(k), escape(v)));
    }
    out.push_str("</table>");
    out
}
