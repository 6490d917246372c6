//! Cookie jars.
//!
//! Two jars: the session jar lives in memory and is what pages see; the
//! persistent jar is a SQLite table holding cookies that carry an expiry.
//! Persistent cookies are copied into the session jar on start.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};
use rusqlite::params;

use crate::database::Database;
use crate::managers::whitelist_manager::{Whitelist, WhitelistTrait};
use crate::types::cookie::{Cookie, CookieKey};
use crate::types::errors::CookieError;

/// Trait defining cookie jar operations.
pub trait CookieManagerTrait {
    fn offer(&mut self, cookie: Cookie, whitelist: &Whitelist) -> Result<bool, CookieError>;
    fn cookies(&self) -> Vec<&Cookie>;
    fn persistent_cookies(&self) -> Result<Vec<Cookie>, CookieError>;
    fn remove_cookie(&mut self, index: usize) -> Result<Cookie, CookieError>;
    fn clear_session(&mut self);
    fn blocked_cookies(&self) -> u64;
    fn rejected(&self) -> Result<Vec<Cookie>, CookieError>;
}

/// Cookie policy knobs, taken from the privacy settings.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub enable_whitelist: bool,
    pub save_rejected: bool,
}

pub struct CookieManager {
    session: BTreeMap<CookieKey, Cookie>,
    db: Database,
    policy: CookiePolicy,
    blocked: u64,
}

impl CookieManager {
    /// Builds the jars and loads unexpired persistent cookies into the
    /// session jar.
    pub fn new(db: Database, policy: CookiePolicy) -> Result<Self, CookieError> {
        let mut mgr = Self {
            session: BTreeMap::new(),
            db,
            policy,
            blocked: 0,
        };
        let now = Self::now();
        for c in mgr.persistent_cookies()? {
            if c.expires.map_or(true, |e| e > now) {
                mgr.session.insert(c.key(), c);
            }
        }
        info!("cookie jar: {} persistent cookies loaded", mgr.session.len());
        Ok(mgr)
    }

    pub fn set_policy(&mut self, policy: CookiePolicy) {
        self.policy = policy;
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    fn persist(&self, c: &Cookie) -> Result<(), CookieError> {
        self.db.connection().execute(
            "INSERT OR REPLACE INTO cookies (domain, path, name, value, expires, secure, http_only) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![c.domain, c.path, c.name, c.value, c.expires, c.secure, c.http_only],
        )?;
        Ok(())
    }

    fn unpersist(&self, c: &Cookie) -> Result<(), CookieError> {
        self.db.connection().execute(
            "DELETE FROM cookies WHERE domain = ?1 AND path = ?2 AND name = ?3",
            params![c.domain, c.path, c.name],
        )?;
        Ok(())
    }

    fn save_rejected(&self, c: &Cookie) -> Result<(), CookieError> {
        self.db.connection().execute(
            "INSERT INTO rejected_cookies (domain, path, name, value, rejected_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![c.domain, c.path, c.name, c.value, Self::now()],
        )?;
        Ok(())
    }
}

impl CookieManagerTrait for CookieManager {
    /// Offer a cookie set by a page. Returns whether it was accepted.
    ///
    /// Accepted cookies land in the session jar; the ones with an expiry
    /// also go to the persistent jar. An expiry in the past deletes.
    fn offer(&mut self, cookie: Cookie, whitelist: &Whitelist) -> Result<bool, CookieError> {
        if self.policy.enable_whitelist && !whitelist.allows(&cookie.domain) {
            self.blocked += 1;
            debug!("cookie rejected: {} for {}", cookie.name, cookie.domain);
            if self.policy.save_rejected {
                self.save_rejected(&cookie)?;
            }
            return Ok(false);
        }

        if cookie.expires.is_some_and(|e| e <= Self::now()) {
            self.session.remove(&cookie.key());
            self.unpersist(&cookie)?;
            return Ok(true);
        }

        if cookie.is_persistent() {
            self.persist(&cookie)?;
        }
        self.session.insert(cookie.key(), cookie);
        Ok(true)
    }

    /// Session jar contents in `(domain, path, name)` order.
    fn cookies(&self) -> Vec<&Cookie> {
        self.session.values().collect()
    }

    fn persistent_cookies(&self) -> Result<Vec<Cookie>, CookieError> {
        let mut stmt = self.db.connection().prepare(
            "SELECT name, value, domain, path, expires, secure, http_only FROM cookies ORDER BY domain, path, name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Cookie {
                name: row.get(0)?,
                value: row.get(1)?,
                domain: row.get(2)?,
                path: row.get(3)?,
                expires: row.get(4)?,
                secure: row.get(5)?,
                http_only: row.get(6)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Delete the `index`-th cookie of the session listing from both jars.
    fn remove_cookie(&mut self, index: usize) -> Result<Cookie, CookieError> {
        let key = self
            .session
            .keys()
            .nth(index)
            .cloned()
            .ok_or(CookieError::NotFound(index))?;
        let cookie = self
            .session
            .remove(&key)
            .ok_or(CookieError::NotFound(index))?;
        self.unpersist(&cookie)?;
        info!("cookie removed: {} for {}", cookie.name, cookie.domain);
        Ok(cookie)
    }

    /// Forget session-only cookies; persistent ones stay.
    fn clear_session(&mut self) {
        self.session.retain(|_, c| c.is_persistent());
    }

    fn blocked_cookies(&self) -> u64 {
        self.blocked
    }

    fn rejected(&self) -> Result<Vec<Cookie>, CookieError> {
        let mut stmt = self.db.connection().prepare(
            "SELECT name, value, domain, path FROM rejected_cookies ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            let mut c = Cookie::new(
                &row.get::<_, String>(0)?,
                &row.get::<_, String>(1)?,
                &row.get::<_, String>(2)?,
            );
            c.path = row.get(3)?;
            Ok(c)
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
