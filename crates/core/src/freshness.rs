//! Staleness rules for cached content.
//!
//! All comparisons happen in UTC so a deployment's local timezone can never
//! flip an entry between fresh and stale.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::content::CacheEntry;

/// When a stored value must be refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StalenessRule {
    /// Stale once the UTC calendar date moves past the stored date.
    DailyRollover,
    /// Stale once the ISO week number, or the calendar year, moves past the stored one.
    ///
    /// A value stored in the first days of January that still belong to the
    /// previous ISO year (week 52 or 53) stays fresh until that week number
    /// comes round again or the calendar year changes.
    WeeklyRollover,
    /// Stale once more than `seconds` have elapsed since the value was stored.
    MaxAge { seconds: u64 },
}

impl StalenessRule {
    /// Whether a value stored at `stored_at` is stale as of `now`.
    pub fn is_stale_at(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match *self {
            StalenessRule::DailyRollover => now.date_naive() > stored_at.date_naive(),
            StalenessRule::WeeklyRollover => {
                now.iso_week().week() > stored_at.iso_week().week() || now.year() > stored_at.year()
            }
            StalenessRule::MaxAge { seconds } => {
                let age = now.signed_duration_since(stored_at).num_seconds();
                age > i64::try_from(seconds).unwrap_or(i64::MAX)
            }
        }
    }
}

/// Decide whether `entry` must be refreshed. An absent entry is always stale.
pub fn is_stale(entry: Option<&CacheEntry>, rule: &StalenessRule, now: DateTime<Utc>) -> bool {
    match entry {
        Some(entry) => rule.is_stale_at(entry.stored_at, now),
        None => true,
    }
}
