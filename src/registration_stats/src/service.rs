//! Analytics service: the boundary the presentation side calls.
//!
//! [`AnalyticsService`] owns one SQLite connection and a [`RecordStore`]. Every read
//! takes the caller's [`FilterSelection`] explicitly; nothing is cached between calls.
//!
//! Two flavours of each operation:
//! - `try_*` returns the [`ServiceError`] so callers can react to it;
//! - the plain method is fail-soft: the error is logged and an empty or neutral value
//!   (empty list, zeroed stats, empty trend) is returned instead.

use std::path::Path;

use anyhow::Context;
use diesel::SqliteConnection;
use serde::Serialize;

use crate::analytics::{
    self, GrowthRow, PerformerLevel, PeriodSummaryRow, ShareRow, TopPerformer, TrendSummary,
};
use crate::column::{Column, ColumnValue};
use crate::db::{connection::connect_sqlite, migrate};
use crate::filters::{FilterError, FilterSelection, RegionMap};
use crate::models::RegistrationRecord;
use crate::period::Granularity;
use crate::store::{
    AggregateRow, DateRange, RecordStore, SqliteStore, StoreError, SummaryStats,
};

/// Errors surfaced by the `try_*` service methods.
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    /// Storage-level failure, including invalid column names.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The filter selection could not be translated.
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Choices available to a filter UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    /// Distinct vehicle categories, ascending.
    pub categories: Vec<String>,
    /// Distinct manufacturers, ascending.
    pub manufacturers: Vec<String>,
    /// Region display names, ordered by region code.
    pub regions: Vec<String>,
    /// Stored date range.
    pub date_range: DateRange,
}

/// Log a failed operation and substitute a neutral value.
fn soft<T: Default>(operation: &str, result: Result<T, ServiceError>) -> T {
    match result {
        Ok(value) => value,
        Err(ServiceError::Filter(e)) => {
            tracing::warn!(operation, error = %e, "rejected filter selection");
            T::default()
        }
        Err(ServiceError::Store(e)) => {
            tracing::error!(operation, error = %e, "registration store query failed");
            T::default()
        }
    }
}

fn texts(values: Vec<ColumnValue>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|v| v.as_text().map(str::to_string))
        .collect()
}

/// Query and analytics facade over one database connection.
pub struct AnalyticsService<S = SqliteStore> {
    conn: SqliteConnection,
    store: S,
}

impl AnalyticsService<SqliteStore> {
    /// Connect to `database_url` and bring its schema up to date.
    ///
    /// `:memory:` works too; the database then lives as long as the service.
    pub fn open(database_url: &str) -> anyhow::Result<Self> {
        let mut conn = connect_sqlite(database_url)?;
        migrate::run_on(&mut conn)
            .with_context(|| format!("migrate database {database_url}"))?;
        Ok(Self::new(conn, SqliteStore::new()))
    }
}

impl<S: RecordStore> AnalyticsService<S> {
    /// Wrap an already-migrated connection.
    pub fn new(conn: SqliteConnection, store: S) -> Self {
        Self { conn, store }
    }

    /// Mutable access to the underlying connection.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Region name ↔ code mapping as currently stored.
    pub fn try_region_map(&mut self) -> Result<RegionMap, ServiceError> {
        let pairs = self.store.region_pairs(&mut self.conn)?;
        Ok(RegionMap::from_pairs(pairs))
    }

    /// Distinct categories, manufacturers, region names, and the date range.
    pub fn try_filter_options(&mut self) -> Result<FilterOptions, ServiceError> {
        let categories = texts(
            self.store
                .distinct_values(&mut self.conn, Column::VehicleCategory.as_sql())?,
        );
        let manufacturers = texts(
            self.store
                .distinct_values(&mut self.conn, Column::Manufacturer.as_sql())?,
        );
        let regions = self.try_region_map()?.names().map(str::to_string).collect();
        let date_range = self.store.date_range(&mut self.conn)?;
        Ok(FilterOptions {
            categories,
            manufacturers,
            regions,
            date_range,
        })
    }

    /// Fail-soft [`Self::try_filter_options`].
    pub fn filter_options(&mut self) -> FilterOptions {
        soft("filter_options", self.try_filter_options())
    }

    /// Headline counters over the whole store.
    pub fn try_summary_stats(&mut self) -> Result<SummaryStats, ServiceError> {
        Ok(self.store.summary_stats(&mut self.conn)?)
    }

    /// Fail-soft [`Self::try_summary_stats`].
    pub fn summary_stats(&mut self) -> SummaryStats {
        soft("summary_stats", self.try_summary_stats())
    }

    /// Earliest and latest stored dates.
    pub fn try_date_range(&mut self) -> Result<DateRange, ServiceError> {
        Ok(self.store.date_range(&mut self.conn)?)
    }

    /// Fail-soft [`Self::try_date_range`].
    pub fn date_range(&mut self) -> DateRange {
        soft("date_range", self.try_date_range())
    }

    /// Aggregate over group-by column names (untrusted text), optionally date-bounded.
    ///
    /// Dates in `selection` bound the aggregate; its set filters do not apply.
    pub fn try_aggregated(
        &mut self,
        group_by: &[&str],
        selection: &FilterSelection,
    ) -> Result<Vec<AggregateRow>, ServiceError> {
        let columns = group_by
            .iter()
            .map(|name| name.parse::<Column>())
            .collect::<Result<Vec<_>, _>>()?;
        let filter = selection.translate(&RegionMap::default())?;
        Ok(self
            .store
            .aggregated_query(&mut self.conn, &columns, filter.start, filter.end)?)
    }

    /// Fail-soft [`Self::try_aggregated`].
    pub fn aggregated(&mut self, group_by: &[&str], selection: &FilterSelection) -> Vec<AggregateRow> {
        soft("aggregated", self.try_aggregated(group_by, selection))
    }

    /// Records matching `selection`, ordered by (date, region, category, manufacturer).
    pub fn try_records(
        &mut self,
        selection: &FilterSelection,
    ) -> Result<Vec<RegistrationRecord>, ServiceError> {
        let regions = if selection.regions.is_empty() {
            RegionMap::default()
        } else {
            self.try_region_map()?
        };
        let filter = selection.translate(&regions)?;
        Ok(self.store.filtered_query(&mut self.conn, &filter)?)
    }

    /// Fail-soft [`Self::try_records`].
    pub fn records(&mut self, selection: &FilterSelection) -> Vec<RegistrationRecord> {
        soft("records", self.try_records(selection))
    }

    /// Year-over-year growth of the selected records.
    pub fn try_yoy(&mut self, selection: &FilterSelection) -> Result<Vec<GrowthRow>, ServiceError> {
        Ok(analytics::yoy_growth(&self.try_records(selection)?))
    }

    /// Fail-soft [`Self::try_yoy`].
    pub fn yoy(&mut self, selection: &FilterSelection) -> Vec<GrowthRow> {
        soft("yoy", self.try_yoy(selection))
    }

    /// Quarter-over-quarter growth of the selected records.
    pub fn try_qoq(&mut self, selection: &FilterSelection) -> Result<Vec<GrowthRow>, ServiceError> {
        Ok(analytics::qoq_growth(&self.try_records(selection)?))
    }

    /// Fail-soft [`Self::try_qoq`].
    pub fn qoq(&mut self, selection: &FilterSelection) -> Vec<GrowthRow> {
        soft("qoq", self.try_qoq(selection))
    }

    /// Monthly market share of the selected records.
    pub fn try_market_share(
        &mut self,
        selection: &FilterSelection,
    ) -> Result<Vec<ShareRow>, ServiceError> {
        Ok(analytics::market_share(&self.try_records(selection)?))
    }

    /// Fail-soft [`Self::try_market_share`].
    pub fn market_share(&mut self, selection: &FilterSelection) -> Vec<ShareRow> {
        soft("market_share", self.try_market_share(selection))
    }

    /// Monthly trend of the selected records, narrowed to one category and/or manufacturer.
    pub fn try_trend(
        &mut self,
        selection: &FilterSelection,
        category: Option<&str>,
        manufacturer: Option<&str>,
    ) -> Result<TrendSummary, ServiceError> {
        let records = self.try_records(selection)?;
        Ok(analytics::trend_summary(&records, category, manufacturer))
    }

    /// Fail-soft [`Self::try_trend`].
    pub fn trend(
        &mut self,
        selection: &FilterSelection,
        category: Option<&str>,
        manufacturer: Option<&str>,
    ) -> TrendSummary {
        soft("trend", self.try_trend(selection, category, manufacturer))
    }

    /// Per-period category summary of the selected records.
    pub fn try_category_summary(
        &mut self,
        selection: &FilterSelection,
        granularity: Granularity,
    ) -> Result<Vec<PeriodSummaryRow>, ServiceError> {
        let records = self.try_records(selection)?;
        Ok(analytics::category_summary(&records, granularity))
    }

    /// Fail-soft [`Self::try_category_summary`].
    pub fn category_summary(
        &mut self,
        selection: &FilterSelection,
        granularity: Granularity,
    ) -> Vec<PeriodSummaryRow> {
        soft(
            "category_summary",
            self.try_category_summary(selection, granularity),
        )
    }

    /// Per-period manufacturer summary of the selected records.
    pub fn try_manufacturer_summary(
        &mut self,
        selection: &FilterSelection,
        granularity: Granularity,
    ) -> Result<Vec<PeriodSummaryRow>, ServiceError> {
        let records = self.try_records(selection)?;
        Ok(analytics::manufacturer_summary(&records, granularity))
    }

    /// Fail-soft [`Self::try_manufacturer_summary`].
    pub fn manufacturer_summary(
        &mut self,
        selection: &FilterSelection,
        granularity: Granularity,
    ) -> Vec<PeriodSummaryRow> {
        soft(
            "manufacturer_summary",
            self.try_manufacturer_summary(selection, granularity),
        )
    }

    /// Top `n` manufacturers or categories in the latest period of the selection.
    pub fn try_top_performers(
        &mut self,
        selection: &FilterSelection,
        by: PerformerLevel,
        granularity: Granularity,
        n: usize,
    ) -> Result<Vec<TopPerformer>, ServiceError> {
        let records = self.try_records(selection)?;
        Ok(analytics::top_performers(&records, by, granularity, n))
    }

    /// Fail-soft [`Self::try_top_performers`].
    pub fn top_performers(
        &mut self,
        selection: &FilterSelection,
        by: PerformerLevel,
        granularity: Granularity,
        n: usize,
    ) -> Vec<TopPerformer> {
        soft(
            "top_performers",
            self.try_top_performers(selection, by, granularity, n),
        )
    }

    /// Replace the stored dataset with `records` atomically.
    pub fn try_refresh(&mut self, records: &[RegistrationRecord]) -> Result<usize, ServiceError> {
        Ok(self.store.replace_all(&mut self.conn, records)?)
    }

    /// Fail-soft [`Self::try_refresh`]; returns 0 when nothing was written.
    pub fn refresh(&mut self, records: &[RegistrationRecord]) -> usize {
        soft("refresh", self.try_refresh(records))
    }

    /// Write a consistent copy of the database to `path`.
    pub fn try_backup(&mut self, path: &Path) -> Result<(), ServiceError> {
        Ok(self.store.backup_to(&mut self.conn, path)?)
    }
}
