// xxxterm services
// Settings persistence and per-tab background workers.

pub mod settings_engine;
pub mod tab_workers;
