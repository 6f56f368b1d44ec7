//! Period-over-period growth.
//!
//! Records are bucketed by `(period, vehicle_category, manufacturer)`; each
//! `(category, manufacturer)` series is compared against the bucket exactly `lag`
//! periods earlier. "Earlier" is calendar arithmetic on [`Period::index`], so a gap in
//! the data yields `None` rather than comparing against whatever row happens to sit
//! `lag` positions back.

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use serde::Serialize;

use crate::analytics::sum_by;
use crate::models::RegistrationRecord;
use crate::period::{Granularity, Period};

/// Year-over-year lag on monthly buckets.
pub const YOY_LAG: NonZeroU32 = match NonZeroU32::new(12) {
    Some(nz) => nz,
    None => unreachable!(),
};

/// Quarter-over-quarter lag on quarterly buckets.
pub const QOQ_LAG: NonZeroU32 = match NonZeroU32::new(1) {
    Some(nz) => nz,
    None => unreachable!(),
};

/// One bucket of a growth series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthRow {
    /// Bucket.
    pub period: Period,
    /// Vehicle category of the series.
    pub vehicle_category: String,
    /// Manufacturer of the series.
    pub manufacturer: String,
    /// Registrations summed over the bucket (all regions).
    pub registrations: i64,
    /// Percent change against the bucket `lag` periods earlier.
    pub growth_pct: Option<f64>,
}

/// `(current - prior) / prior * 100`, or `None` for a zero baseline.
pub fn percent_change(current: i64, prior: i64) -> Option<f64> {
    if prior == 0 {
        None
    } else {
        Some((current - prior) as f64 / prior as f64 * 100.0)
    }
}

/// Growth of every `(category, manufacturer)` series at `granularity` against `lag`
/// periods earlier.
///
/// Rows are ordered by category, manufacturer, then period ascending.
pub fn period_growth(
    records: &[RegistrationRecord],
    granularity: Granularity,
    lag: NonZeroU32,
) -> Vec<GrowthRow> {
    let buckets = sum_by(records, |r| {
        (
            r.vehicle_category.clone(),
            r.manufacturer.clone(),
            Period::of(r.date, granularity),
        )
    });

    // (category, manufacturer) -> period -> total; BTreeMap keeps each series chronological.
    let mut series: BTreeMap<(String, String), BTreeMap<Period, i64>> = BTreeMap::new();
    for ((cat, mfr, period), total) in buckets {
        series.entry((cat, mfr)).or_default().insert(period, total);
    }

    let lag = i64::from(lag.get());
    let mut out = Vec::new();
    for ((cat, mfr), points) in series {
        for (&period, &registrations) in &points {
            let growth_pct = points
                .get(&period.back(lag))
                .and_then(|&prior| percent_change(registrations, prior));
            out.push(GrowthRow {
                period,
                vehicle_category: cat.clone(),
                manufacturer: mfr.clone(),
                registrations,
                growth_pct,
            });
        }
    }
    tracing::debug!(rows = out.len(), %granularity, lag, "computed period growth");
    out
}

/// Year-over-year growth: monthly buckets, lag 12.
pub fn yoy_growth(records: &[RegistrationRecord]) -> Vec<GrowthRow> {
    period_growth(records, Granularity::Monthly, YOY_LAG)
}

/// Quarter-over-quarter growth: quarterly buckets, lag 1.
pub fn qoq_growth(records: &[RegistrationRecord]) -> Vec<GrowthRow> {
    period_growth(records, Granularity::Quarterly, QOQ_LAG)
}
