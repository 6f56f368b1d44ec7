//! Monthly trend of one (optionally filtered) slice of the dataset.

use serde::Serialize;

use crate::analytics::{percent_change, sum_by};
use crate::models::RegistrationRecord;
use crate::period::{Granularity, Period};

/// One month of a trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    /// Month bucket.
    pub period: Period,
    /// Registrations in the month.
    pub registrations: i64,
}

/// Headline numbers of a monthly trend. The default is the empty-series value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSummary {
    /// Sum over the series.
    pub total_registrations: i64,
    /// Mean over months that have data; `0.0` for an empty series.
    pub avg_monthly_registrations: f64,
    /// First-to-last percent change. Zero for fewer than two points or a zero start.
    pub overall_growth_rate: f64,
    /// Sample standard deviation of the monthly totals; `None` below two points.
    pub volatility: Option<f64>,
    /// Monthly totals, chronological.
    pub series: Vec<TrendPoint>,
}

/// Sample standard deviation (n - 1 denominator).
fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

/// Trend of the records matching `category` and `manufacturer` (each optional).
pub fn trend_summary(
    records: &[RegistrationRecord],
    category: Option<&str>,
    manufacturer: Option<&str>,
) -> TrendSummary {
    let selected: Vec<RegistrationRecord> = records
        .iter()
        .filter(|r| category.is_none_or(|c| r.vehicle_category == c))
        .filter(|r| manufacturer.is_none_or(|m| r.manufacturer == m))
        .cloned()
        .collect();

    let series: Vec<TrendPoint> = sum_by(&selected, |r| Period::of(r.date, Granularity::Monthly))
        .into_iter()
        .map(|(period, registrations)| TrendPoint {
            period,
            registrations,
        })
        .collect();

    let total_registrations: i64 = series.iter().map(|p| p.registrations).sum();
    let avg_monthly_registrations = if series.is_empty() {
        0.0
    } else {
        total_registrations as f64 / series.len() as f64
    };
    let overall_growth_rate = match (series.first(), series.last()) {
        (Some(first), Some(last)) if series.len() >= 2 => {
            percent_change(last.registrations, first.registrations).unwrap_or(0.0)
        }
        _ => 0.0,
    };
    let values: Vec<f64> = series.iter().map(|p| p.registrations as f64).collect();

    TrendSummary {
        total_registrations,
        avg_monthly_registrations,
        overall_growth_rate,
        volatility: sample_std_dev(&values),
        series,
    }
}
