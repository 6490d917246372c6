use serde::{Deserialize, Serialize};

/// An HTTP cookie as stored in the session and persistent jars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// UNIX expiry time; `None` for session-only cookies.
    pub expires: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
}

/// Identity of a cookie inside a jar: `(domain, path, name)`.
pub type CookieKey = (String, String, String);

impl Cookie {
    pub fn new(name: &str, value: &str, domain: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.to_string(),
            path: "/".to_string(),
            expires: None,
            secure: false,
            http_only: false,
        }
    }

    pub fn key(&self) -> CookieKey {
        (self.domain.clone(), self.path.clone(), self.name.clone())
    }

    pub fn is_persistent(&self) -> bool {
        self.expires.is_some()
    }
}
