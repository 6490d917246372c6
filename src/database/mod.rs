//! Storage for the persistent cookie jar.
//!
//! ```no_run
//! use xxxterm::database::Database;
//!
//! let db = Database::open("cookies.db").expect("failed to open database");
//! let conn = db.connection();
//! # let _ = conn;
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
