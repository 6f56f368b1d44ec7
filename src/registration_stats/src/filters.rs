//! Filter translation: UI selections → store filter.
//!
//! The presentation side works in region display names and raw date strings;
//! the store filters on region codes and typed dates. [`FilterSelection`] carries the
//! raw selection, [`RegionMap`] carries the `code ↔ name` mapping obtained from the
//! store, and [`FilterSelection::translate`] produces a [`RecordFilter`].
//!
//! Unknown region names are dropped rather than rejected: filtering is best effort.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use indexmap::{IndexMap, map::Entry};
use serde::{Deserialize, Serialize};

use crate::store::RecordFilter;

/// Errors raised while translating a selection.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    /// A date string is not `YYYY-MM-DD`.
    #[error("invalid date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The start date lies after the end date.
    #[error("start date {start} is after end date {end}")]
    InvertedDateRange {
        /// Requested start.
        start: NaiveDate,
        /// Requested end.
        end: NaiveDate,
    },
}

/// Region display-name → code mapping built from distinct `(code, name)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionMap {
    by_name: IndexMap<String, String>,
}

impl RegionMap {
    /// Build from `(code, name)` pairs as returned by the store.
    ///
    /// A code seen with a second name keeps its first name; the conflict is logged.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut by_code: IndexMap<String, String> = IndexMap::new();
        for (code, name) in pairs {
            match by_code.entry(code) {
                Entry::Occupied(seen) if *seen.get() != name => {
                    tracing::warn!(
                        code = %seen.key(),
                        existing = %seen.get(),
                        conflicting = %name,
                        "region code has two names"
                    );
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(name);
                }
            }
        }
        let by_name = by_code.into_iter().map(|(code, name)| (name, code)).collect();
        Self { by_name }
    }

    /// Code for a display name.
    pub fn code_for(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    /// Display names in mapping order (ascending by code when built from the store).
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// Number of mapped regions.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Resolve display names to codes. Names without a mapping entry are dropped.
pub fn region_codes_for_names<'a, I>(names: I, map: &RegionMap) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    names
        .into_iter()
        .filter_map(|name| {
            let code = map.code_for(name);
            if code.is_none() {
                tracing::debug!(%name, "dropping unknown region name");
            }
            code.map(str::to_string)
        })
        .collect()
}

/// Raw filter selection as chosen in the UI. Passed explicitly per request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    /// Inclusive start date, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive end date, `YYYY-MM-DD`.
    pub end_date: Option<String>,
    /// Selected vehicle categories.
    #[serde(default)]
    pub categories: BTreeSet<String>,
    /// Selected manufacturers.
    #[serde(default)]
    pub manufacturers: BTreeSet<String>,
    /// Selected region display names.
    #[serde(default)]
    pub regions: BTreeSet<String>,
}

fn parse_date(raw: &str) -> Result<NaiveDate, FilterError> {
    let trimmed = raw.trim();
    // chrono's %m/%d also take unpadded fields.
    if trimmed.len() != 10 {
        return Err(FilterError::InvalidDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| FilterError::InvalidDate(raw.to_string()))
}

impl FilterSelection {
    /// Validate dates and resolve region names against `regions`.
    ///
    /// Blank date strings count as "no bound".
    pub fn translate(&self, regions: &RegionMap) -> Result<RecordFilter, FilterError> {
        let start = self
            .start_date
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(parse_date)
            .transpose()?;
        let end = self
            .end_date
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(parse_date)
            .transpose()?;
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(FilterError::InvertedDateRange { start, end });
            }
        }

        Ok(RecordFilter {
            start,
            end,
            categories: self.categories.clone(),
            manufacturers: self.manufacturers.clone(),
            region_codes: region_codes_for_names(&self.regions, regions),
        })
    }
}
