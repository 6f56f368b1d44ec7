//! Database utilities for connections and schema migrations.
//!
//! This module provides:
//! - SQLite connection helpers: [`connection::connect_sqlite`] applies WAL, foreign_keys=ON,
//!   and a 5000ms busy_timeout.
//! - Embedded Diesel migrations and runners: [`migrate::run_sqlite`] and [`migrate::run_all`],
//!   which accepts bare paths, `sqlite:` / `sqlite://` URLs and `:memory:`.
//!
//! Example:
//! ```no_run
//! use registration_stats::db::{connection, migrate};
//!
//! let db_path = std::env::temp_dir().join("registration_stats_example.db");
//! migrate::run_all(db_path.to_str().unwrap()).expect("migrations");
//!
//! let _conn = connection::connect_sqlite(db_path.to_str().unwrap()).expect("connect");
//! ```

pub mod connection;
pub mod migrate;

/// Strip an optional `sqlite:` / `sqlite://` scheme so the remainder can be handed to SQLite.
///
/// Returns `None` for PostgreSQL URLs, which this crate does not support.
pub fn sqlite_path(database_url: &str) -> Option<&str> {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        return None;
    }
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    Some(path)
}
