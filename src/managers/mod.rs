// xxxterm state managers
// Tabs, downloads, history, favorites, cookie jars and whitelists.

pub mod cookie_manager;
pub mod download_manager;
pub mod favorites_manager;
pub mod history_manager;
pub mod tab_manager;
pub mod whitelist_manager;
