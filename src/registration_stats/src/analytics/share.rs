//! Manufacturer market share within a vehicle category, per month.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analytics::sum_by;
use crate::models::RegistrationRecord;
use crate::period::{Granularity, Period};

/// Share of one manufacturer within its category for one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareRow {
    /// Month bucket.
    pub period: Period,
    /// Vehicle category.
    pub vehicle_category: String,
    /// Manufacturer.
    pub manufacturer: String,
    /// Manufacturer registrations in the bucket.
    pub registrations: i64,
    /// All registrations of the category in the bucket.
    pub category_total: i64,
    /// `100 * registrations / category_total`; `None` when the category total is zero.
    pub share_pct: Option<f64>,
}

/// Market share per `(month, category, manufacturer)`.
///
/// Rows are ordered by period, category, then manufacturer.
pub fn market_share(records: &[RegistrationRecord]) -> Vec<ShareRow> {
    let by_manufacturer = sum_by(records, |r| {
        (
            Period::of(r.date, Granularity::Monthly),
            r.vehicle_category.clone(),
            r.manufacturer.clone(),
        )
    });

    let mut category_totals: BTreeMap<(Period, &str), i64> = BTreeMap::new();
    for ((period, cat, _), total) in &by_manufacturer {
        *category_totals.entry((*period, cat.as_str())).or_insert(0) += total;
    }

    let rows: Vec<ShareRow> = by_manufacturer
        .iter()
        .map(|((period, cat, mfr), &registrations)| {
            let category_total = category_totals
                .get(&(*period, cat.as_str()))
                .copied()
                .unwrap_or(0);
            let share_pct = (category_total != 0)
                .then(|| registrations as f64 / category_total as f64 * 100.0);
            ShareRow {
                period: *period,
                vehicle_category: cat.clone(),
                manufacturer: mfr.clone(),
                registrations,
                category_total,
                share_pct,
            }
        })
        .collect();
    tracing::debug!(rows = rows.len(), "computed market share");
    rows
}
