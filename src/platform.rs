// xxxterm platform paths
// Working directory, rc file and resource directory resolution.
//
// The working directory holds the favorites file, the cookie database and
// downloads. `XXXTERM_HOME` overrides it; otherwise `$XDG_DATA_HOME/xxxterm`
// is used when set, falling back to `~/.xxxterm`.

use std::env;
use std::path::PathBuf;

/// Name of the favorites file inside the working directory.
pub const FAVORITES_FILE: &str = "favorites";
/// Name of the persistent cookie database inside the working directory.
pub const COOKIE_DB_FILE: &str = "cookies.db";
/// User stylesheet inside the resource directory.
pub const STYLESHEET_FILE: &str = "style.css";

/// The user's home directory, `/tmp` when it cannot be determined.
pub fn home_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    let var = "USERPROFILE";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";
    PathBuf::from(env::var(var).unwrap_or_else(|_| String::from("/tmp")))
}

pub fn work_dir() -> PathBuf {
    if let Ok(dir) = env::var("XXXTERM_HOME") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("xxxterm");
    }
    home_dir().join(".xxxterm")
}

/// Path of the rc file holding the JSON settings.
pub fn rc_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("xxxterm").join("xxxterm.json");
    }
    home_dir().join(".xxxterm.json")
}

/// Directory with static resources (icons, user stylesheet).
pub fn resource_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/usr/share/xxxterm")
    }
    #[cfg(target_os = "macos")]
    {
        PathBuf::from("/Library/Application Support/xxxterm")
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        work_dir().join("resources")
    }
}

pub fn download_dir() -> PathBuf {
    home_dir().join("Downloads")
}
