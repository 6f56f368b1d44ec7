//! Growth, share, trend and summary computations over an in-memory dataset.
//!
//! Everything here is a pure function of a `&[RegistrationRecord]` slice: no storage
//! access, no mutation of the input. Results are fresh row vectors that serialize
//! straight to JSON for the presentation side.
//!
//! Soft conditions are data, not errors:
//! - a growth value with no bucket at the required lag, or a zero baseline, is `None`;
//! - a market share whose category total is zero is `None` (the row is kept).

use std::collections::BTreeMap;

use crate::models::RegistrationRecord;

pub mod growth;
pub mod share;
pub mod summary;
pub mod trend;

pub use growth::{GrowthRow, QOQ_LAG, YOY_LAG, percent_change, period_growth, qoq_growth, yoy_growth};
pub use share::{ShareRow, market_share};
pub use summary::{
    PerformerLevel, PeriodSummaryRow, TopPerformer, category_summary, manufacturer_summary,
    top_performers,
};
pub use trend::{TrendPoint, TrendSummary, trend_summary};

/// Sum `registrations` per key. Keys come out in ascending order.
pub(crate) fn sum_by<K, F>(records: &[RegistrationRecord], key: F) -> BTreeMap<K, i64>
where
    K: Ord,
    F: Fn(&RegistrationRecord) -> K,
{
    let mut out = BTreeMap::new();
    for r in records {
        *out.entry(key(r)).or_insert(0) += i64::from(r.registrations);
    }
    out
}
