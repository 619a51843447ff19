pub mod decode;
pub mod http;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Weekday};
#[cfg(test)]
use mockall::automock;

/// State of a single weekday inside a record: whether its half-hour block was worked and under
/// which category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayMark {
    pub worked: bool,
    pub category: Option<String>,
}

/// One scheduling slot of the remote tracker, decoded into a fixed shape. Fields the store
/// doesn't carry become defaults during decode instead of leaking into the aggregation logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBlockRecord {
    pub id: String,
    /// Per-day marks ordered Monday through Sunday.
    pub days: [DayMark; 7],
    /// Week-start date shared by every record of the current tracking period.
    pub week_start: Option<NaiveDate>,
}

impl TimeBlockRecord {
    pub fn mark(&self, day: Weekday) -> &DayMark {
        &self.days[day.num_days_from_monday() as usize]
    }

    /// True once every per-day marker has been cleared. Used by the reset reconciliation pass.
    pub fn is_cleared(&self) -> bool {
        self.days
            .iter()
            .all(|mark| !mark.worked && mark.category.is_none())
    }
}

/// The 7-day tracking window anchored at the shared week-start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    pub start: NaiveDate,
}

impl WeekWindow {
    pub const LENGTH_DAYS: i64 = 7;

    pub fn next_start(&self) -> NaiveDate {
        self.start + Duration::days(Self::LENGTH_DAYS)
    }

    pub fn elapsed_by(&self, date: NaiveDate) -> bool {
        date >= self.next_start()
    }
}

/// The mutation applied to every record during weekly reset: all seven worked markers cleared,
/// all categories unset, and the shared week start moved to this date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetPatch {
    pub week_start: NaiveDate,
}

/// Access to the remote record store. Fetching must exhaust pagination before returning;
/// partial record sets would corrupt the tally.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecordSource: Sync + Send {
    async fn fetch_all(&self) -> Result<Vec<TimeBlockRecord>>;

    async fn patch_record(&self, id: &str, patch: &ResetPatch) -> Result<()>;
}
