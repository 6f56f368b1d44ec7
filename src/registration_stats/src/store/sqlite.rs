//! Diesel/SQLite implementation of [`RecordStore`].

use std::path::Path;

use chrono::NaiveDate;
use diesel::dsl::{count, max, min, sum};
use diesel::expression_methods::AggregateExpressionMethods;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Date, Double, Text};
use diesel::sqlite::Sqlite;
use indexmap::{IndexMap, IndexSet};

use crate::{
    column::{Column, ColumnValue},
    models::{RegistrationRecord, RegistrationRow},
    store::{
        AggregateRow, DateRange, RecordFilter, RecordStore, StoreError, StoreResult, SummaryStats,
    },
};

use crate::schema::vehicle_registrations::dsl as vr;

/// Rows per multi-row INSERT; 9 bound columns each stays under SQLite's 999 variable cap.
const INSERT_CHUNK: usize = 100;

/// Record store backed by the `vehicle_registrations` table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteStore;

impl SqliteStore {
    /// Create a store handle. Stateless; the connection is passed per call.
    pub fn new() -> Self {
        Self
    }
}

#[derive(QueryableByName)]
struct AggregateSqlRow {
    #[diesel(sql_type = Text)]
    group_key: String,
    #[diesel(sql_type = BigInt)]
    total_registrations: i64,
    #[diesel(sql_type = BigInt)]
    record_count: i64,
    #[diesel(sql_type = Double)]
    avg_registrations: f64,
}

macro_rules! load_distinct {
    ($conn:expr, $col:expr, $ty:ty, $wrap:expr) => {
        vr::vehicle_registrations
            .select($col)
            .distinct()
            .order($col.asc())
            .load::<$ty>($conn)?
            .into_iter()
            .map($wrap)
            .collect()
    };
}

// ---- helpers ----

fn column_list(columns: &[Column]) -> String {
    columns
        .iter()
        .copied()
        .map(Column::as_sql)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `json_array(a, b, ...)` over the validated column list.
fn group_key_sql(columns: &[Column]) -> String {
    format!("json_array({})", column_list(columns))
}

fn decode_group_key(
    columns: &[Column],
    key: &str,
) -> StoreResult<IndexMap<Column, ColumnValue>> {
    let parts: Vec<serde_json::Value> = serde_json::from_str(key)
        .map_err(|e| StoreError::InvalidRecord(format!("group key {key:?}: {e}")))?;
    if parts.len() != columns.len() {
        return Err(StoreError::InvalidRecord(format!(
            "group key {key:?} does not match {} columns",
            columns.len()
        )));
    }
    columns
        .iter()
        .zip(parts)
        .map(|(&c, part)| {
            let value = match part {
                serde_json::Value::String(raw) => c.parse_value(&raw)?,
                serde_json::Value::Number(n) => c.parse_value(&n.to_string())?,
                other => {
                    return Err(StoreError::InvalidRecord(format!(
                        "{c}: unexpected group value {other}"
                    )));
                }
            };
            Ok((c, value))
        })
        .collect()
}

/// Both directions of `region_code ↔ region_name` must stay one-to-one.
fn check_region_bijection(records: &[RegistrationRecord]) -> StoreResult<()> {
    let mut by_code: IndexMap<&str, &str> = IndexMap::new();
    let mut by_name: IndexMap<&str, &str> = IndexMap::new();
    for r in records {
        let name = *by_code
            .entry(r.region_code.as_str())
            .or_insert(r.region_name.as_str());
        if name != r.region_name {
            return Err(StoreError::InvalidRecord(format!(
                "region code {} maps to both {name:?} and {:?}",
                r.region_code, r.region_name
            )));
        }
        let code = *by_name
            .entry(r.region_name.as_str())
            .or_insert(r.region_code.as_str());
        if code != r.region_code {
            return Err(StoreError::InvalidRecord(format!(
                "region name {:?} maps to both {code} and {}",
                r.region_name, r.region_code
            )));
        }
    }
    Ok(())
}

impl RecordStore for SqliteStore {
    fn distinct_values(
        &self,
        conn: &mut SqliteConnection,
        column: &str,
    ) -> StoreResult<Vec<ColumnValue>> {
        let column: Column = column.parse()?;

        let values: Vec<ColumnValue> = match column {
            Column::Date => load_distinct!(conn, vr::date, NaiveDate, ColumnValue::Date),
            Column::Year => load_distinct!(conn, vr::year, i32, |v| ColumnValue::Integer(v.into())),
            Column::Quarter => load_distinct!(conn, vr::quarter, String, ColumnValue::Text),
            Column::Month => {
                load_distinct!(conn, vr::month, i32, |v| ColumnValue::Integer(v.into()))
            }
            Column::RegionCode => load_distinct!(conn, vr::region_code, String, ColumnValue::Text),
            Column::RegionName => load_distinct!(conn, vr::region_name, String, ColumnValue::Text),
            Column::VehicleCategory => {
                load_distinct!(conn, vr::vehicle_category, String, ColumnValue::Text)
            }
            Column::Manufacturer => {
                load_distinct!(conn, vr::manufacturer, String, ColumnValue::Text)
            }
            Column::Registrations => {
                load_distinct!(conn, vr::registrations, i32, |v| ColumnValue::Integer(v.into()))
            }
        };
        Ok(values)
    }

    fn date_range(&self, conn: &mut SqliteConnection) -> StoreResult<DateRange> {
        let (lo, hi) = vr::vehicle_registrations
            .select((min(vr::date), max(vr::date)))
            .first::<(Option<NaiveDate>, Option<NaiveDate>)>(conn)?;
        Ok(DateRange { min: lo, max: hi })
    }

    fn summary_stats(&self, conn: &mut SqliteConnection) -> StoreResult<SummaryStats> {
        // One read transaction so the four counters describe the same snapshot.
        conn.transaction::<_, StoreError, _>(|conn| {
            let record_count: i64 = vr::vehicle_registrations.count().get_result(conn)?;
            let total: Option<i64> = vr::vehicle_registrations
                .select(sum(vr::registrations))
                .first(conn)?;
            let unique_manufacturers: i64 = vr::vehicle_registrations
                .select(count(vr::manufacturer).aggregate_distinct())
                .first(conn)?;
            let unique_regions: i64 = vr::vehicle_registrations
                .select(count(vr::region_code).aggregate_distinct())
                .first(conn)?;

            Ok(SummaryStats {
                record_count,
                total_registrations: total.unwrap_or(0),
                unique_manufacturers,
                unique_regions,
            })
        })
    }

    fn filtered_query(
        &self,
        conn: &mut SqliteConnection,
        filter: &RecordFilter,
    ) -> StoreResult<Vec<RegistrationRecord>> {
        let mut query = vr::vehicle_registrations
            .select(RegistrationRow::as_select())
            .into_boxed();

        if let Some(start) = filter.start {
            query = query.filter(vr::date.ge(start));
        }
        if let Some(end) = filter.end {
            query = query.filter(vr::date.le(end));
        }
        if !filter.categories.is_empty() {
            let wanted: Vec<&str> = filter.categories.iter().map(String::as_str).collect();
            query = query.filter(vr::vehicle_category.eq_any(wanted));
        }
        if !filter.manufacturers.is_empty() {
            let wanted: Vec<&str> = filter.manufacturers.iter().map(String::as_str).collect();
            query = query.filter(vr::manufacturer.eq_any(wanted));
        }
        if !filter.region_codes.is_empty() {
            let wanted: Vec<&str> = filter.region_codes.iter().map(String::as_str).collect();
            query = query.filter(vr::region_code.eq_any(wanted));
        }

        let rows = query
            .order((
                vr::date.asc(),
                vr::region_code.asc(),
                vr::vehicle_category.asc(),
                vr::manufacturer.asc(),
            ))
            .load::<RegistrationRow>(conn)?;

        tracing::debug!(rows = rows.len(), "filtered query");
        rows.into_iter().map(RegistrationRecord::try_from).collect()
    }

    fn aggregated_query(
        &self,
        conn: &mut SqliteConnection,
        group_by: &[Column],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> StoreResult<Vec<AggregateRow>> {
        // Repeated columns collapse to their first occurrence.
        let columns: Vec<Column> = group_by
            .iter()
            .copied()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        if columns.is_empty() {
            return Err(StoreError::EmptyGroupBy);
        }

        let list = column_list(&columns);

        let mut sql = format!(
            "SELECT {} AS group_key, \
                    SUM(registrations) AS total_registrations, \
                    COUNT(*) AS record_count, \
                    AVG(registrations) AS avg_registrations \
             FROM vehicle_registrations WHERE 1=1",
            group_key_sql(&columns)
        );
        if start.is_some() {
            sql.push_str(" AND date >= ?");
        }
        if end.is_some() {
            sql.push_str(" AND date <= ?");
        }
        sql.push_str(&format!(" GROUP BY {list} ORDER BY {list}"));

        let mut query = diesel::sql_query(sql).into_boxed::<Sqlite>();
        if let Some(start) = start {
            query = query.bind::<Date, _>(start);
        }
        if let Some(end) = end {
            query = query.bind::<Date, _>(end);
        }

        let rows = query.load::<AggregateSqlRow>(conn)?;
        rows.into_iter()
            .map(|row| {
                Ok(AggregateRow {
                    group: decode_group_key(&columns, &row.group_key)?,
                    total_registrations: row.total_registrations,
                    record_count: row.record_count,
                    avg_registrations: row.avg_registrations,
                })
            })
            .collect()
    }

    fn region_pairs(&self, conn: &mut SqliteConnection) -> StoreResult<Vec<(String, String)>> {
        let pairs = vr::vehicle_registrations
            .select((vr::region_code, vr::region_name))
            .distinct()
            .order((vr::region_code.asc(), vr::region_name.asc()))
            .load::<(String, String)>(conn)?;
        Ok(pairs)
    }

    fn replace_all(
        &self,
        conn: &mut SqliteConnection,
        records: &[RegistrationRecord],
    ) -> StoreResult<usize> {
        check_region_bijection(records)?;
        let rows = records
            .iter()
            .map(RegistrationRecord::as_insertable)
            .collect::<StoreResult<Vec<_>>>()?;

        let inserted = conn.immediate_transaction::<_, StoreError, _>(|conn| {
            let removed = diesel::delete(vr::vehicle_registrations).execute(conn)?;
            let mut inserted = 0;
            for chunk in rows.chunks(INSERT_CHUNK) {
                inserted += diesel::insert_into(vr::vehicle_registrations)
                    .values(chunk)
                    .execute(conn)?;
            }
            tracing::info!(removed, inserted, "replaced registration records");
            Ok(inserted)
        })?;
        Ok(inserted)
    }

    fn backup_to(&self, conn: &mut SqliteConnection, path: &Path) -> StoreResult<()> {
        let target = path
            .to_str()
            .ok_or_else(|| StoreError::InvalidPath(path.display().to_string()))?;
        diesel::sql_query("VACUUM INTO ?")
            .bind::<Text, _>(target)
            .execute(conn)?;
        tracing::info!(target, "database backed up");
        Ok(())
    }
}
