use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

/// Activity window, inclusive on both ends the way the GraphQL `since`
/// filter is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        assert!(since <= until, "window start must not be after its end");
        Self { since, until }
    }

    /// The trailing 24 hours.
    pub fn trailing_day(now: DateTime<Utc>) -> Self {
        Self::new(now - Duration::hours(24), now)
    }

    /// From the first instant of the current calendar month until now.
    pub fn month_to_date(now: DateTime<Utc>) -> Self {
        let start = Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .unwrap_or(now);
        Self::new(start, now)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.since && instant <= self.until
    }

    /// Smallest window covering both inputs. Used as the fetch horizon so
    /// each history is queried once; shortly after midnight on the 1st the
    /// daily window starts before the monthly one.
    pub fn union(&self, other: &Self) -> Self {
        Self::new(
            self.since.min(other.since),
            self.until.max(other.until),
        )
    }
}
