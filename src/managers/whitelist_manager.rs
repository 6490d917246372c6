//! Domain whitelists for cookies, JavaScript and plugins.
//!
//! An entry starting with a dot (`.example.com`) covers the domain and every
//! subdomain; a bare entry (`example.com`) covers that host only.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Which policy a whitelist controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhitelistKind {
    Cookie,
    JavaScript,
    Plugin,
}

/// Trait defining whitelist operations.
pub trait WhitelistTrait {
    fn add(&mut self, domain: &str) -> bool;
    fn remove(&mut self, domain: &str) -> bool;
    fn allows(&self, host: &str) -> bool;
    fn entries(&self) -> Vec<&str>;
}

/// A set of whitelisted domains.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    domains: BTreeSet<String>,
}

impl Whitelist {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut wl = Self::default();
        for e in entries {
            wl.add(e.as_ref());
        }
        wl
    }

    fn normalize(domain: &str) -> String {
        domain.trim().trim_end_matches('.').to_ascii_lowercase()
    }
}

impl WhitelistTrait for Whitelist {
    fn add(&mut self, domain: &str) -> bool {
        let d = Self::normalize(domain);
        if d.is_empty() || d == "." {
            return false;
        }
        self.domains.insert(d)
    }

    fn remove(&mut self, domain: &str) -> bool {
        self.domains.remove(&Self::normalize(domain))
    }

    /// Walk up the host's labels looking for an exact or wildcard entry.
    fn allows(&self, host: &str) -> bool {
        let host = Self::normalize(host);
        let host = host.trim_start_matches('.');
        if host.is_empty() {
            return false;
        }
        if self.domains.contains(host) || self.domains.contains(&format!(".{}", host)) {
            return true;
        }
        let mut rest = host;
        while let Some(dot) = rest.find('.') {
            rest = &rest[dot + 1..];
            if self.domains.contains(&format!(".{}", rest)) {
                return true;
            }
        }
        false
    }

    fn entries(&self) -> Vec<&str> {
        self.domains.iter().map(String::as_str).collect()
    }
}

/// The three whitelists the browser keeps.
#[derive(Debug, Clone, Default)]
pub struct WhitelistManager {
    pub cookies: Whitelist,
    pub javascript: Whitelist,
    pub plugins: Whitelist,
}

impl WhitelistManager {
    pub fn new(cookie_wl: &[String], js_wl: &[String], pl_wl: &[String]) -> Self {
        Self {
            cookies: Whitelist::from_entries(cookie_wl),
            javascript: Whitelist::from_entries(js_wl),
            plugins: Whitelist::from_entries(pl_wl),
        }
    }

    pub fn get(&self, kind: WhitelistKind) -> &Whitelist {
        match kind {
            WhitelistKind::Cookie => &self.cookies,
            WhitelistKind::JavaScript => &self.javascript,
            WhitelistKind::Plugin => &self.plugins,
        }
    }
}

/// Host part of a URI: scheme, userinfo, port and path stripped.
pub fn host_of(uri: &str) -> Option<&str> {
    let rest = uri.split_once("://").map(|(_, r)| r)?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let authority = authority.rsplit('@').next()?;
    let host = match authority.strip_prefix('[') {
        Some(v6) => v6.split(']').next()?,
        None => authority.split(':').next()?,
    };
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}
