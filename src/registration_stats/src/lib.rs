//! Vehicle registration statistics.
//!
//! Monthly registration counts per region, vehicle category and manufacturer are kept
//! in SQLite ([`store`]); filter selections from a UI are translated into store
//! queries ([`filters`]); growth, share, trend and summary tables are computed in
//! memory ([`analytics`]). [`service::AnalyticsService`] ties the three together
//! behind a fail-soft API.

#![deny(missing_docs)]

pub mod analytics;
pub mod column;
pub mod config;
pub mod db;
pub mod filters;
pub mod models;
pub mod period;
/// Diesel table definitions (generated).
#[allow(missing_docs)]
pub mod schema;
pub mod service;
pub mod store;
