use serde::{Deserialize, Serialize};

/// Internal pages reachable through `about:` or `xxxt://`.
///
/// The discriminants are the positions in the about table, which is also the
/// value stored in a tab's meaning tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AboutPage {
    About = 0,
    Blank = 1,
    Certs = 2,
    CookieWhitelist = 3,
    CookieJar = 4,
    Downloads = 5,
    Favorites = 6,
    Help = 7,
    History = 8,
    JsWhitelist = 9,
    PluginWhitelist = 10,
    Set = 11,
    Stats = 12,
    Marco = 13,
    StartPage = 14,
}

impl AboutPage {
    /// Position of this page in the about table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The `about:` name for this page.
    pub fn name(self) -> &'static str {
        match self {
            AboutPage::About => "about",
            AboutPage::Blank => "blank",
            AboutPage::Certs => "certs",
            AboutPage::CookieWhitelist => "cookiewl",
            AboutPage::CookieJar => "cookiejar",
            AboutPage::Downloads => "downloads",
            AboutPage::Favorites => "favorites",
            AboutPage::Help => "help",
            AboutPage::History => "history",
            AboutPage::JsWhitelist => "jswl",
            AboutPage::PluginWhitelist => "plwl",
            AboutPage::Set => "set",
            AboutPage::Stats => "stats",
            AboutPage::Marco => "marco",
            AboutPage::StartPage => "startpage",
        }
    }

    /// The canonical `about:` URI for this page.
    pub fn uri(self) -> String {
        format!("about:{}", self.name())
    }
}

/// Argument passed to about-page handlers and tab commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Karg {
    pub i: i32,
    pub s: Option<String>,
    pub precount: i32,
}

impl Karg {
    pub fn with_str(s: impl Into<String>) -> Self {
        Self {
            s: Some(s.into()),
            ..Self::default()
        }
    }
}
