//! Registration record store (SQLite).
//!
//! [`RecordStore`] is the query surface the analytics service and the CLI talk to;
//! the Diesel-backed implementation lives in `sqlite.rs`. Every method takes the
//! connection explicitly, so callers decide how connections are opened and shared.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;
use diesel::SqliteConnection;
use indexmap::IndexMap;
use serde::Serialize;

use crate::column::{Column, ColumnValue};
use crate::models::RegistrationRecord;

pub mod sqlite;

pub use sqlite::SqliteStore;

#[derive(thiserror::Error, Debug)]
/// Errors raised by the record store.
pub enum StoreError {
    #[error("invalid column: {0}")]
    /// The column name is not part of the allow-list. Raised before any SQL is built.
    InvalidColumn(String),

    #[error("group-by column list must not be empty")]
    /// An aggregate query was requested without grouping columns.
    EmptyGroupBy,

    #[error("invalid record: {0}")]
    /// A record could not be mapped between storage and the domain model.
    InvalidRecord(String),

    #[error("invalid path: {0}")]
    /// A filesystem path that SQLite cannot accept (e.g. not valid UTF-8).
    InvalidPath(String),

    #[error("storage error: {0}")]
    /// Query or transaction failure at the persistence layer.
    Storage(#[from] diesel::result::Error),
}

/// Result type used throughout the record store.
pub type StoreResult<T> = Result<T, StoreError>;

/// Inclusive `[min, max]` of stored dates; both `None` when the store is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    /// Earliest stored date.
    pub min: Option<NaiveDate>,
    /// Latest stored date.
    pub max: Option<NaiveDate>,
}

/// Headline counters over the whole store. All zero when empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryStats {
    /// Number of stored rows.
    pub record_count: i64,
    /// Sum of `registrations` over all rows.
    pub total_registrations: i64,
    /// Distinct manufacturers.
    pub unique_manufacturers: i64,
    /// Distinct region codes.
    pub unique_regions: i64,
}

/// Conjunctive record filter. Empty sets and `None` bounds impose no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Inclusive lower date bound.
    pub start: Option<NaiveDate>,
    /// Inclusive upper date bound.
    pub end: Option<NaiveDate>,
    /// Allowed vehicle categories.
    pub categories: BTreeSet<String>,
    /// Allowed manufacturers.
    pub manufacturers: BTreeSet<String>,
    /// Allowed region codes.
    pub region_codes: BTreeSet<String>,
}

impl RecordFilter {
    /// Whether `record` passes every restriction of this filter.
    pub fn matches(&self, record: &RegistrationRecord) -> bool {
        self.start.is_none_or(|s| record.date >= s)
            && self.end.is_none_or(|e| record.date <= e)
            && (self.categories.is_empty() || self.categories.contains(&record.vehicle_category))
            && (self.manufacturers.is_empty() || self.manufacturers.contains(&record.manufacturer))
            && (self.region_codes.is_empty() || self.region_codes.contains(&record.region_code))
    }
}

/// One group of an aggregate query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    /// Group-by column values, in the requested column order.
    #[serde(flatten)]
    pub group: IndexMap<Column, ColumnValue>,
    /// Sum of `registrations` in the group.
    pub total_registrations: i64,
    /// Number of rows in the group.
    pub record_count: i64,
    /// Mean of `registrations` in the group.
    pub avg_registrations: f64,
}

/// Query surface over stored registration records.
pub trait RecordStore {
    /// All distinct values of a column, ascending.
    ///
    /// `column` is untrusted text; anything outside [`Column`] fails with
    /// [`StoreError::InvalidColumn`].
    fn distinct_values(
        &self,
        conn: &mut SqliteConnection,
        column: &str,
    ) -> StoreResult<Vec<ColumnValue>>;

    /// Earliest and latest stored dates.
    fn date_range(&self, conn: &mut SqliteConnection) -> StoreResult<DateRange>;

    /// Row count, total registrations, and distinct manufacturer/region counts.
    fn summary_stats(&self, conn: &mut SqliteConnection) -> StoreResult<SummaryStats>;

    /// Records passing `filter`, ordered by (date, region_code, vehicle_category, manufacturer).
    fn filtered_query(
        &self,
        conn: &mut SqliteConnection,
        filter: &RecordFilter,
    ) -> StoreResult<Vec<RegistrationRecord>>;

    /// Sum/count/mean of registrations grouped and ordered by `group_by`.
    fn aggregated_query(
        &self,
        conn: &mut SqliteConnection,
        group_by: &[Column],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> StoreResult<Vec<AggregateRow>>;

    /// Distinct `(region_code, region_name)` pairs ordered by code.
    fn region_pairs(&self, conn: &mut SqliteConnection) -> StoreResult<Vec<(String, String)>>;

    /// Replace the whole table with `records` in one immediate transaction.
    ///
    /// Returns the number of inserted rows. Nothing is written if any record is
    /// rejected.
    fn replace_all(
        &self,
        conn: &mut SqliteConnection,
        records: &[RegistrationRecord],
    ) -> StoreResult<usize>;

    /// Write a consistent copy of the database to `path`.
    fn backup_to(&self, conn: &mut SqliteConnection, path: &Path) -> StoreResult<()>;
}
