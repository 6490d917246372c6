//! `xxxt://` command URLs.
//!
//! Internal pages link to `xxxt://<class>/<key>/<cmd>[/<arg>]`. Each page
//! class gets a random session key at start; a URL is only honoured when it
//! carries the key of its class, so ordinary web pages cannot drive the
//! browser by linking to `xxxt://`.

use ring::rand::{SecureRandom, SystemRandom};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::types::errors::XtpError;

pub const XTP_SCHEME: &str = "xxxt://";

const KEY_LEN: usize = 32;

/// Page classes that accept commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XtpClass {
    Downloads = 1,
    History = 2,
    Cookies = 3,
    Favorites = 4,
}

impl XtpClass {
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(XtpClass::Downloads),
            2 => Some(XtpClass::History),
            3 => Some(XtpClass::Cookies),
            4 => Some(XtpClass::Favorites),
            _ => None,
        }
    }

    fn slot(self) -> usize {
        self as usize - 1
    }
}

/// A command carried by an `xxxt://` URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XtpCommand {
    List,
    Remove(usize),
    /// Downloads only.
    Cancel(u32),
    /// Downloads only: drop every inactive download.
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XtpRequest {
    pub class: XtpClass,
    pub command: XtpCommand,
}

/// Per-class session keys, wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct XtpKeys {
    keys: [[u8; KEY_LEN]; 4],
}

impl XtpKeys {
    /// Fresh random keys for every class.
    pub fn generate() -> Result<Self, XtpError> {
        let rng = SystemRandom::new();
        let mut keys = [[0u8; KEY_LEN]; 4];
        for k in keys.iter_mut() {
            rng.fill(k).map_err(|_| XtpError::KeyGeneration)?;
        }
        Ok(Self { keys })
    }

    pub fn key_hex(&self, class: XtpClass) -> String {
        self.keys[class.slot()].iter().map(|b| format!("{:02x}", b)).collect()
    }

    fn verify(&self, class: XtpClass, presented: &str) -> bool {
        let expected = self.key_hex(class);
        if expected.len() != presented.len() {
            return false;
        }
        expected
            .bytes()
            .zip(presented.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    /// Build a command link for an internal page.
    pub fn link(&self, class: XtpClass, command: XtpCommand) -> String {
        let (cmd, arg) = match command {
            XtpCommand::List => ("list", None),
            XtpCommand::Remove(i) => ("remove", Some(i.to_string())),
            XtpCommand::Cancel(id) => ("cancel", Some(id.to_string())),
            XtpCommand::Clear => ("clear", None),
        };
        let mut out = format!("{}{}/{}/{}", XTP_SCHEME, class as u8, self.key_hex(class), cmd);
        if let Some(a) = arg {
            out.push('/');
            out.push_str(&a);
        }
        out
    }

    /// Parse and authenticate a command URL.
    pub fn parse(&self, uri: &str) -> Result<XtpRequest, XtpError> {
        let rest = uri
            .strip_prefix(XTP_SCHEME)
            .ok_or_else(|| XtpError::Malformed(uri.to_string()))?;
        let mut parts = rest.trim_end_matches('/').split('/');

        let class_str = parts.next().unwrap_or("");
        let class = class_str
            .parse::<u8>()
            .ok()
            .and_then(XtpClass::from_number)
            .ok_or_else(|| XtpError::UnknownClass(class_str.to_string()))?;

        let key = parts.next().ok_or_else(|| XtpError::Malformed(uri.to_string()))?;
        if !self.verify(class, key) {
            return Err(XtpError::BadKey(class as u8));
        }

        let cmd = parts.next().ok_or_else(|| XtpError::Malformed(uri.to_string()))?;
        let arg = parts.next();
        if parts.next().is_some() {
            return Err(XtpError::Malformed(uri.to_string()));
        }

        let number = |a: Option<&str>| -> Result<usize, XtpError> {
            let a = a.ok_or_else(|| XtpError::BadArgument(format!("{} needs an argument", cmd)))?;
            a.parse::<usize>().map_err(|_| XtpError::BadArgument(a.to_string()))
        };

        let command = match (cmd, class) {
            ("list", _) => XtpCommand::List,
            ("remove", _) => XtpCommand::Remove(number(arg)?),
            ("cancel", XtpClass::Downloads) => {
                let id = number(arg)?;
                XtpCommand::Cancel(u32::try_from(id).map_err(|_| XtpError::BadArgument(id.to_string()))?)
            }
            ("clear", XtpClass::Downloads) => XtpCommand::Clear,
            (other, _) => return Err(XtpError::UnknownCommand(other.to_string())),
        };
        Ok(XtpRequest { class, command })
    }
}
