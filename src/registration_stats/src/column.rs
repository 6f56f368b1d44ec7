//! Closed set of queryable columns.
//!
//! Every column name that reaches a SQL string comes from [`Column::as_sql`], a
//! `&'static str`. Untrusted names are parsed with [`FromStr`] and rejected with
//! [`StoreError::InvalidColumn`] before any query is assembled.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// A column of `vehicle_registrations` that may be listed or grouped on.
///
/// `id` and `created_at` are bookkeeping and not listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    /// Record date (`YYYY-MM-DD`).
    Date,
    /// Calendar year.
    Year,
    /// Calendar quarter (`Q1`..`Q4`).
    Quarter,
    /// Month of year.
    Month,
    /// Canonical region code.
    RegionCode,
    /// Region display name.
    RegionName,
    /// Vehicle category (e.g. `2W`).
    VehicleCategory,
    /// Manufacturer name.
    Manufacturer,
    /// Registration count.
    Registrations,
}

/// How a column's values are typed in SQLite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// TEXT column.
    Text,
    /// INTEGER column.
    Integer,
    /// TEXT column holding an ISO date.
    Date,
}

impl Column {
    /// Every allowed column, in table order.
    pub const ALL: [Column; 9] = [
        Column::Date,
        Column::Year,
        Column::Quarter,
        Column::Month,
        Column::RegionCode,
        Column::RegionName,
        Column::VehicleCategory,
        Column::Manufacturer,
        Column::Registrations,
    ];

    /// SQL identifier of the column.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Year => "year",
            Column::Quarter => "quarter",
            Column::Month => "month",
            Column::RegionCode => "region_code",
            Column::RegionName => "region_name",
            Column::VehicleCategory => "vehicle_category",
            Column::Manufacturer => "manufacturer",
            Column::Registrations => "registrations",
        }
    }

    /// Storage type of the column.
    pub const fn kind(self) -> ColumnKind {
        match self {
            Column::Date => ColumnKind::Date,
            Column::Year | Column::Month | Column::Registrations => ColumnKind::Integer,
            Column::Quarter
            | Column::RegionCode
            | Column::RegionName
            | Column::VehicleCategory
            | Column::Manufacturer => ColumnKind::Text,
        }
    }

    /// Convert a raw text cell (as produced by `CAST(col AS TEXT)`) into a typed value.
    pub fn parse_value(self, raw: &str) -> Result<ColumnValue, StoreError> {
        match self.kind() {
            ColumnKind::Text => Ok(ColumnValue::Text(raw.to_string())),
            ColumnKind::Integer => raw.parse::<i64>().map(ColumnValue::Integer).map_err(|_| {
                StoreError::InvalidRecord(format!("{self}: expected integer, got {raw:?}"))
            }),
            ColumnKind::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(ColumnValue::Date)
                .map_err(|_| StoreError::InvalidRecord(format!("{self}: bad date {raw:?}"))),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Column {
    type Err = StoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .into_iter()
            .find(|c| c.as_sql() == s)
            .ok_or_else(|| StoreError::InvalidColumn(s.to_string()))
    }
}

/// A single typed cell returned by distinct-value and aggregate queries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    /// Text cell.
    Text(String),
    /// Integer cell.
    Integer(i64),
    /// Date cell.
    Date(NaiveDate),
}

impl ColumnValue {
    /// Borrow the text payload, if this is a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Text(s) => f.write_str(s),
            ColumnValue::Integer(n) => write!(f, "{n}"),
            ColumnValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_allowed_name() {
        for c in Column::ALL {
            assert_eq!(c.as_sql().parse::<Column>().unwrap(), c);
        }
    }

    #[test]
    fn rejects_unknown_and_injected_names() {
        for bad in [
            "nonexistent_col",
            "id",
            "created_at",
            "manufacturer; DROP TABLE vehicle_registrations",
            "Manufacturer",
            "",
        ] {
            match bad.parse::<Column>() {
                Err(StoreError::InvalidColumn(name)) => assert_eq!(name, bad),
                other => panic!("expected InvalidColumn for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn parse_value_follows_column_kind() {
        assert_eq!(
            Column::Year.parse_value("2024").unwrap(),
            ColumnValue::Integer(2024)
        );
        assert_eq!(
            Column::Date.parse_value("2024-02-01").unwrap(),
            ColumnValue::Date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
        );
        assert_eq!(
            Column::Manufacturer.parse_value("Hero").unwrap(),
            ColumnValue::Text("Hero".into())
        );
        assert!(Column::Month.parse_value("March").is_err());
    }
}
