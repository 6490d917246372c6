//! xxxterm: a minimalist, keyboard-driven web browser shell.
//!
//! The rendering engine only draws pages. Tabs, downloads, history, cookie
//! jars and the internal `about:` pages live here, so this library crate
//! exposes all modules for use by the binary and integration tests.

pub mod about;
pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod services;
pub mod types;
pub mod view;

#[cfg(feature = "gui")]
pub mod ui;
