//! Month-level partition keys and the rolling recent window.
//!
//! Every row of a dataset maps to exactly one [`PartitionKey`] derived from
//! its date column. Keys render as `YYYY.MM` and order chronologically, so a
//! reverse-sorted key list is newest-first.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};

use crate::contract::PriceRow;
use crate::errors::MirrorError;

/// A calendar month a dataset slice belongs to. Renders as `YYYY.MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey {
    year: i32,
    month: u32,
}

impl PartitionKey {
    pub fn new(year: i32, month: u32) -> Self {
        debug_assert!((1..=12).contains(&month));
        PartitionKey { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        PartitionKey {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Derives the key from a raw date value as delivered by the source.
    ///
    /// Accepts plain `YYYY-MM-DD` dates as well as RFC 3339 timestamps.
    /// Any value that parses to the same calendar month yields an identical
    /// key.
    pub fn from_raw_date(raw: &str) -> Result<Self, MirrorError> {
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Ok(Self::from_date(date));
        }
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
            return Ok(Self::from_date(dt.date_naive()));
        }
        Err(MirrorError::MalformedDate {
            value: raw.to_string(),
        })
    }

    /// The immediately preceding calendar month.
    pub fn prev(self) -> Self {
        if self.month == 1 {
            PartitionKey {
                year: self.year - 1,
                month: 12,
            }
        } else {
            PartitionKey {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}.{:02}", self.year, self.month)
    }
}

/// Groups rows by partition key. Fails on the first row whose date cannot be
/// parsed: a dataset that cannot be partitioned consistently must not be
/// partially mirrored.
pub fn partition_rows(
    rows: Vec<PriceRow>,
) -> Result<BTreeMap<PartitionKey, Vec<PriceRow>>, MirrorError> {
    let mut partitions: BTreeMap<PartitionKey, Vec<PriceRow>> = BTreeMap::new();
    for row in rows {
        let key = PartitionKey::from_raw_date(&row.date)?;
        partitions.entry(key).or_default().push(row);
    }
    Ok(partitions)
}

/// The current month plus the `len - 1` preceding months, newest first.
///
/// These months are treated as potentially mutable at the source and are
/// always refreshed by the staged policy, regardless of what is cached.
pub fn recent_window(today: NaiveDate, len: usize) -> Vec<PartitionKey> {
    let mut window = Vec::with_capacity(len);
    let mut key = PartitionKey::from_date(today);
    for _ in 0..len {
        window.push(key);
        key = key.prev();
    }
    window
}

/// Months always force-refreshed by the staged policy.
pub const RECENT_WINDOW_MONTHS: usize = 6;
