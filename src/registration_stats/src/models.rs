//! Diesel models mapping to the database schema, plus the domain record.
//!
//! [`RegistrationRow`] and [`NewRegistration`] mirror
//! [`crate::schema::vehicle_registrations`] for Diesel's Queryable/Insertable APIs.
//! [`RegistrationRecord`] is what the rest of the crate works with: its calendar
//! fields are derived from `date` at construction, so they cannot drift apart.

use chrono::{Datelike, NaiveDate};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::period::Quarter;
use crate::schema::vehicle_registrations;
use crate::store::StoreError;

/// A row in [`crate::schema::vehicle_registrations`].
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = vehicle_registrations, check_for_backend(diesel::sqlite::Sqlite))]
pub struct RegistrationRow {
    /// Database primary key. Populated by the DB.
    pub id: i32,
    /// First day of the reporting month.
    pub date: NaiveDate,
    /// Calendar year of `date`.
    pub year: i32,
    /// Quarter of `date` (`"Q1"`..`"Q4"`).
    pub quarter: String,
    /// Month of `date`, 1..=12.
    pub month: i32,
    /// Canonical region code (e.g. "DL").
    pub region_code: String,
    /// Region display name (e.g. "Delhi").
    pub region_name: String,
    /// Vehicle category (e.g. "2W").
    pub vehicle_category: String,
    /// Manufacturer name.
    pub manufacturer: String,
    /// Registration count, never negative (CHECK constraint).
    pub registrations: i32,
    /// Row creation timestamp (SQLite `CURRENT_TIMESTAMP`, UTC).
    pub created_at: String,
}

/// Insertable form of [`RegistrationRow`].
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = vehicle_registrations)]
pub struct NewRegistration<'a> {
    /// Record date.
    pub date: NaiveDate,
    /// Calendar year.
    pub year: i32,
    /// Quarter text.
    pub quarter: &'a str,
    /// Month of year.
    pub month: i32,
    /// Canonical region code.
    pub region_code: &'a str,
    /// Region display name.
    pub region_name: &'a str,
    /// Vehicle category.
    pub vehicle_category: &'a str,
    /// Manufacturer name.
    pub manufacturer: &'a str,
    /// Registration count.
    pub registrations: i32,
}

/// One registration fact: a count for (date, region, category, manufacturer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    /// Record date; the 1st of a month in generated data.
    pub date: NaiveDate,
    /// Calendar year of `date`.
    pub year: i32,
    /// Quarter of `date`.
    pub quarter: Quarter,
    /// Month of `date`, 1..=12.
    pub month: u32,
    /// Canonical region code.
    pub region_code: String,
    /// Region display name.
    pub region_name: String,
    /// Vehicle category.
    pub vehicle_category: String,
    /// Manufacturer name.
    pub manufacturer: String,
    /// Registration count.
    pub registrations: u32,
}

impl RegistrationRecord {
    /// Build a record, deriving `year`, `quarter` and `month` from `date`.
    pub fn new(
        date: NaiveDate,
        region_code: impl Into<String>,
        region_name: impl Into<String>,
        vehicle_category: impl Into<String>,
        manufacturer: impl Into<String>,
        registrations: u32,
    ) -> Self {
        Self {
            date,
            year: date.year(),
            quarter: Quarter::from_month(date.month()),
            month: date.month(),
            region_code: region_code.into(),
            region_name: region_name.into(),
            vehicle_category: vehicle_category.into(),
            manufacturer: manufacturer.into(),
            registrations,
        }
    }

    /// Borrowing insertable view of this record.
    pub fn as_insertable(&self) -> Result<NewRegistration<'_>, StoreError> {
        let registrations = i32::try_from(self.registrations).map_err(|_| {
            StoreError::InvalidRecord(format!(
                "registrations {} exceeds storage range",
                self.registrations
            ))
        })?;
        Ok(NewRegistration {
            date: self.date,
            year: self.year,
            quarter: self.quarter.as_str(),
            month: self.month as i32,
            region_code: &self.region_code,
            region_name: &self.region_name,
            vehicle_category: &self.vehicle_category,
            manufacturer: &self.manufacturer,
            registrations,
        })
    }
}

impl TryFrom<RegistrationRow> for RegistrationRecord {
    type Error = StoreError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        let quarter: Quarter = row
            .quarter
            .parse()
            .map_err(|e| StoreError::InvalidRecord(format!("row {}: {e}", row.id)))?;
        let month = u32::try_from(row.month)
            .ok()
            .filter(|m| (1..=12).contains(m))
            .ok_or_else(|| {
                StoreError::InvalidRecord(format!("row {}: month {} out of range", row.id, row.month))
            })?;
        let registrations = u32::try_from(row.registrations).map_err(|_| {
            StoreError::InvalidRecord(format!(
                "row {}: negative registrations {}",
                row.id, row.registrations
            ))
        })?;
        Ok(Self {
            date: row.date,
            year: row.year,
            quarter,
            month,
            region_code: row.region_code,
            region_name: row.region_name,
            vehicle_category: row.vehicle_category,
            manufacturer: row.manufacturer,
            registrations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_derives_calendar_fields() {
        let r = RegistrationRecord::new(
            NaiveDate::from_ymd_opt(2023, 8, 1).unwrap(),
            "KA",
            "Karnataka",
            "4W",
            "Hyundai",
            2000,
        );
        assert_eq!(r.year, 2023);
        assert_eq!(r.month, 8);
        assert_eq!(r.quarter, Quarter::Q3);
    }

    #[test]
    fn row_with_bad_quarter_is_rejected() {
        let row = RegistrationRow {
            id: 7,
            date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            year: 2023,
            quarter: "first".into(),
            month: 1,
            region_code: "DL".into(),
            region_name: "Delhi".into(),
            vehicle_category: "2W".into(),
            manufacturer: "Hero".into(),
            registrations: 5,
            created_at: "2024-01-01 00:00:00".into(),
        };
        let err = RegistrationRecord::try_from(row).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(msg) if msg.contains("row 7")));
    }

    #[test]
    fn oversized_count_cannot_be_inserted() {
        let r = RegistrationRecord::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            "DL",
            "Delhi",
            "2W",
            "Hero",
            u32::MAX,
        );
        assert!(matches!(r.as_insertable(), Err(StoreError::InvalidRecord(_))));
    }
}
