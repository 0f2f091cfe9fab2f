//! Common types used across the platform

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Money in the smallest currency unit (rupiah has no minor unit)
pub type Amount = i64;

/// Half-open UTC time window `[start, end)` covering one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn for_day(day: NaiveDate) -> Self {
        let start = day.and_time(chrono::NaiveTime::MIN).and_utc();
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    /// Window for the current UTC day
    pub fn today() -> Self {
        Self::for_day(Utc::now().date_naive())
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}
