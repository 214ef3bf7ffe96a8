//! Date range and record-count selection.
//!
//! The caller picks one of four range modes. Before fetching, the selection
//! is resolved into a [`FetchQuery`]: an optional inclusive day range and an
//! optional cap on the number of most recent records.

use crate::format::DisplayZone;
use crate::{Error, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;

/// Range mode as offered to the user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRangeOption {
    LastXDays,
    LastXRecords,
    SpecificDateRange,
    AllRecords,
}

impl DateRangeOption {
    pub const ALL: [DateRangeOption; 4] = [
        DateRangeOption::LastXDays,
        DateRangeOption::LastXRecords,
        DateRangeOption::SpecificDateRange,
        DateRangeOption::AllRecords,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            DateRangeOption::LastXDays => "Last X Days",
            DateRangeOption::LastXRecords => "Last X Records",
            DateRangeOption::SpecificDateRange => "Specific Date Range",
            DateRangeOption::AllRecords => "All Records",
        }
    }

    /// Exact, case-sensitive lookup by display name
    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.display_name() == name)
    }
}

impl fmt::Display for DateRangeOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A concrete range selection with its parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DateRangeSelection {
    LastDays { days: u32 },
    LastRecords { count: usize },
    Between { start: NaiveDate, end: NaiveDate },
    #[default]
    All,
}

impl DateRangeSelection {
    pub fn option(&self) -> DateRangeOption {
        match self {
            DateRangeSelection::LastDays { .. } => DateRangeOption::LastXDays,
            DateRangeSelection::LastRecords { .. } => DateRangeOption::LastXRecords,
            DateRangeSelection::Between { .. } => DateRangeOption::SpecificDateRange,
            DateRangeSelection::All => DateRangeOption::AllRecords,
        }
    }

    /// Resolve against the current time.
    ///
    /// `LastDays { days: n }` covers today and the `n - 1` days before it.
    pub fn resolve(&self, now: &DateTime<Utc>, zone: DisplayZone) -> Result<FetchQuery> {
        match *self {
            DateRangeSelection::LastDays { days } => {
                if days == 0 {
                    return Err(Error::InvalidDateRange(
                        "number of days must be at least 1".into(),
                    ));
                }
                let end = zone.date_of(now);
                let start = end
                    .checked_sub_days(Days::new(u64::from(days - 1)))
                    .ok_or_else(|| {
                        Error::InvalidDateRange(format!("{} days reaches before year 0", days))
                    })?;
                Ok(FetchQuery {
                    range: Some(DayRange::new(start, end)?),
                    limit: None,
                })
            }
            DateRangeSelection::LastRecords { count } => {
                let limit = NonZeroUsize::new(count).ok_or_else(|| {
                    Error::InvalidDateRange("number of records must be at least 1".into())
                })?;
                Ok(FetchQuery {
                    range: None,
                    limit: Some(limit),
                })
            }
            DateRangeSelection::Between { start, end } => Ok(FetchQuery {
                range: Some(DayRange::new(start, end)?),
                limit: None,
            }),
            DateRangeSelection::All => Ok(FetchQuery::default()),
        }
    }
}

/// Inclusive range of calendar days
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DayRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidDateRange(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Half-open instant bounds: start of the first day up to, but not
    /// including, the start of the day after `end`.
    pub fn bounds(&self, zone: DisplayZone) -> (DateTime<Utc>, DateTime<Utc>) {
        let from = zone.start_of_day(self.start);
        let until = match self.end.succ_opt() {
            Some(next) => zone.start_of_day(next),
            None => DateTime::<Utc>::MAX_UTC,
        };
        (from, until)
    }
}

/// What the data source is asked for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchQuery {
    pub range: Option<DayRange>,
    /// Keep only this many of the most recent records
    pub limit: Option<NonZeroUsize>,
}

impl FetchQuery {
    /// Whether `at` falls inside the day range (always true when unbounded)
    pub fn contains(&self, at: &DateTime<Utc>, zone: DisplayZone) -> bool {
        match self.range {
            Some(range) => {
                let (from, until) = range.bounds(zone);
                *at >= from && *at < until
            }
            None => true,
        }
    }

    /// Apply the record limit to an already newest-first list
    pub fn truncate<T>(&self, items: &mut Vec<T>) {
        if let Some(limit) = self.limit {
            items.truncate(limit.get());
        }
    }
}
