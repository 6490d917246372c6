// xxxterm shared type definitions
// Each submodule defines types used across the browser.

pub mod about;
pub mod cookie;
pub mod download;
pub mod errors;
pub mod favorite;
pub mod history;
pub mod settings;
pub mod tab;
