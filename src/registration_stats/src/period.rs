//! Calendar period buckets.
//!
//! - One stable epoch: 1970 (month 1970-01, quarter 1970-Q1, year 1970 all have index 0).
//! - Month: linear (year, month) indexing, the same arithmetic for quarters and years.
//! - "N periods earlier" is plain index subtraction, so lag lookups never depend on
//!   how many rows happen to sit between two buckets.
//!
//! Text forms: `2024-03`, `2024-Q1`, `2024`.

use std::{fmt, str::FromStr};

use anyhow::bail;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};

/// First year of the linear index.
const EPOCH_YEAR: i64 = 1970;

/// Calendar quarter of a registration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    /// January to March.
    Q1,
    /// April to June.
    Q2,
    /// July to September.
    Q3,
    /// October to December.
    Q4,
}

impl Quarter {
    /// Quarter containing the given month (1..=12).
    pub fn from_month(month: u32) -> Self {
        match month {
            1..=3 => Quarter::Q1,
            4..=6 => Quarter::Q2,
            7..=9 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }

    /// Zero-based position within the year.
    pub const fn ordinal0(self) -> u32 {
        match self {
            Quarter::Q1 => 0,
            Quarter::Q2 => 1,
            Quarter::Q3 => 2,
            Quarter::Q4 => 3,
        }
    }

    /// Stored text form (`"Q1"`..`"Q4"`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }

    fn from_ordinal0(n: u32) -> Self {
        match n {
            0 => Quarter::Q1,
            1 => Quarter::Q2,
            2 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quarter {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Q1" => Ok(Quarter::Q1),
            "Q2" => Ok(Quarter::Q2),
            "Q3" => Ok(Quarter::Q3),
            "Q4" => Ok(Quarter::Q4),
            other => bail!("unknown quarter: {other}"),
        }
    }
}

/// Bucket width used by growth and summary computations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Calendar month.
    Monthly,
    /// Calendar quarter.
    Quarterly,
    /// Calendar year.
    Yearly,
}

/// Parse for CLI ergonomics (`monthly`, `quarterly`, `yearly`, or `M` / `Q` / `Y`).
impl FromStr for Granularity {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "M" | "m" | "month" | "monthly" => Ok(Granularity::Monthly),
            "Q" | "q" | "quarter" | "quarterly" => Ok(Granularity::Quarterly),
            "Y" | "y" | "year" | "yearly" => Ok(Granularity::Yearly),
            other => bail!("unknown period granularity: {other}"),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Granularity::Monthly => "monthly",
            Granularity::Quarterly => "quarterly",
            Granularity::Yearly => "yearly",
        })
    }
}

/// A calendar bucket. Ordering within one granularity is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Period {
    /// A calendar month.
    Month {
        /// Calendar year.
        year: i32,
        /// Month of year, 1..=12.
        month: u32,
    },
    /// A calendar quarter.
    Quarter {
        /// Calendar year.
        year: i32,
        /// Quarter of year.
        quarter: Quarter,
    },
    /// A calendar year.
    Year(i32),
}

impl Period {
    /// Bucket containing `date` at the given granularity.
    pub fn of(date: NaiveDate, granularity: Granularity) -> Self {
        match granularity {
            Granularity::Monthly => Period::Month {
                year: date.year(),
                month: date.month(),
            },
            Granularity::Quarterly => Period::Quarter {
                year: date.year(),
                quarter: Quarter::from_month(date.month()),
            },
            Granularity::Yearly => Period::Year(date.year()),
        }
    }

    /// Granularity of this bucket.
    pub const fn granularity(&self) -> Granularity {
        match self {
            Period::Month { .. } => Granularity::Monthly,
            Period::Quarter { .. } => Granularity::Quarterly,
            Period::Year(_) => Granularity::Yearly,
        }
    }

    /// Linear index relative to 1970 at this bucket's granularity.
    pub fn index(&self) -> i64 {
        match *self {
            Period::Month { year, month } => (year as i64 - EPOCH_YEAR) * 12 + (month as i64 - 1),
            Period::Quarter { year, quarter } => {
                (year as i64 - EPOCH_YEAR) * 4 + quarter.ordinal0() as i64
            }
            Period::Year(year) => year as i64 - EPOCH_YEAR,
        }
    }

    /// Inverse of [`Period::index`].
    pub fn from_index(index: i64, granularity: Granularity) -> Self {
        match granularity {
            Granularity::Monthly => Period::Month {
                year: (EPOCH_YEAR + index.div_euclid(12)) as i32,
                month: (index.rem_euclid(12) + 1) as u32,
            },
            Granularity::Quarterly => Period::Quarter {
                year: (EPOCH_YEAR + index.div_euclid(4)) as i32,
                quarter: Quarter::from_ordinal0(index.rem_euclid(4) as u32),
            },
            Granularity::Yearly => Period::Year((EPOCH_YEAR + index) as i32),
        }
    }

    /// The bucket `n` periods before this one.
    pub fn back(&self, n: i64) -> Self {
        Self::from_index(self.index() - n, self.granularity())
    }

    /// First day of the bucket.
    pub fn start_date(&self) -> Option<NaiveDate> {
        match *self {
            Period::Month { year, month } => NaiveDate::from_ymd_opt(year, month, 1),
            Period::Quarter { year, quarter } => {
                NaiveDate::from_ymd_opt(year, quarter.ordinal0() * 3 + 1, 1)
            }
            Period::Year(year) => NaiveDate::from_ymd_opt(year, 1, 1),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            Period::Quarter { year, quarter } => write!(f, "{year:04}-{quarter}"),
            Period::Year(year) => write!(f, "{year:04}"),
        }
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
