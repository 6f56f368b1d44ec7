//! Per-period category and manufacturer summaries, and top performers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analytics::sum_by;
use crate::models::RegistrationRecord;
use crate::period::{Granularity, Period};

/// Sum, mean and count of registrations for one summary bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummaryRow {
    /// Bucket.
    pub period: Period,
    /// Vehicle category.
    pub vehicle_category: String,
    /// Manufacturer; absent in category summaries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Sum of registrations.
    pub total_registrations: i64,
    /// Mean registrations per record.
    pub mean_registrations: f64,
    /// Number of records in the bucket.
    pub record_count: i64,
}

#[derive(Default)]
struct Acc {
    total: i64,
    count: i64,
}

fn summarize(
    records: &[RegistrationRecord],
    granularity: Granularity,
    with_manufacturer: bool,
) -> Vec<PeriodSummaryRow> {
    let mut buckets: BTreeMap<(Period, &str, Option<&str>), Acc> = BTreeMap::new();
    for r in records {
        let key = (
            Period::of(r.date, granularity),
            r.vehicle_category.as_str(),
            with_manufacturer.then_some(r.manufacturer.as_str()),
        );
        let acc = buckets.entry(key).or_default();
        acc.total += i64::from(r.registrations);
        acc.count += 1;
    }
    buckets
        .into_iter()
        .map(|((period, cat, mfr), acc)| PeriodSummaryRow {
            period,
            vehicle_category: cat.to_string(),
            manufacturer: mfr.map(str::to_string),
            total_registrations: acc.total,
            mean_registrations: acc.total as f64 / acc.count as f64,
            record_count: acc.count,
        })
        .collect()
}

/// Summary per `(period, category)`, ordered by period then category.
pub fn category_summary(
    records: &[RegistrationRecord],
    granularity: Granularity,
) -> Vec<PeriodSummaryRow> {
    summarize(records, granularity, false)
}

/// Summary per `(period, category, manufacturer)`, ordered by those keys.
pub fn manufacturer_summary(
    records: &[RegistrationRecord],
    granularity: Granularity,
) -> Vec<PeriodSummaryRow> {
    summarize(records, granularity, true)
}

/// What a top-performer ranking is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformerLevel {
    /// Rank `(category, manufacturer)` pairs.
    Manufacturer,
    /// Rank categories.
    Category,
}

impl FromStr for PerformerLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manufacturer" => Ok(Self::Manufacturer),
            "category" => Ok(Self::Category),
            other => anyhow::bail!("unknown performer level: {other}"),
        }
    }
}

impl fmt::Display for PerformerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Manufacturer => "manufacturer",
            Self::Category => "category",
        })
    }
}

/// One ranked entry in the latest period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopPerformer {
    /// The latest period present in the data.
    pub period: Period,
    /// Vehicle category.
    pub vehicle_category: String,
    /// Manufacturer; absent when ranking categories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Registrations in the period.
    pub registrations: i64,
}

/// Top `n` entries by registrations within the latest period at `granularity`.
///
/// Ties break by category ascending, then manufacturer ascending.
pub fn top_performers(
    records: &[RegistrationRecord],
    by: PerformerLevel,
    granularity: Granularity,
    n: usize,
) -> Vec<TopPerformer> {
    let Some(latest) = records.iter().map(|r| Period::of(r.date, granularity)).max() else {
        return Vec::new();
    };
    let in_latest: Vec<RegistrationRecord> = records
        .iter()
        .filter(|r| Period::of(r.date, granularity) == latest)
        .cloned()
        .collect();

    let totals = sum_by(&in_latest, |r| {
        (
            r.vehicle_category.clone(),
            (by == PerformerLevel::Manufacturer).then(|| r.manufacturer.clone()),
        )
    });

    // BTreeMap order is already (category, manufacturer) ascending; a stable sort keeps it for ties.
    let mut ranked: Vec<_> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(n);

    tracing::debug!(%latest, %by, n, "ranked top performers");
    ranked
        .into_iter()
        .map(|((vehicle_category, manufacturer), registrations)| TopPerformer {
            period: latest,
            vehicle_category,
            manufacturer,
            registrations,
        })
        .collect()
}
