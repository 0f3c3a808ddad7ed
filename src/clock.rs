use std::sync::RwLock;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Noon UTC on `date`.
    pub fn at_date(date: NaiveDate) -> Self {
        let noon = date
            .and_hms_opt(12, 0, 0)
            .expect("noon is a valid time of day")
            .and_utc();
        Self::new(noon)
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The calendar date an instant belongs to, as seen from `offset`.
///
/// Every "today" in the core goes through here; callers never truncate
/// timestamps themselves.
pub fn operative_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};

    use super::operative_date;

    #[test]
    fn utc_offset_keeps_calendar_date() {
        let now = Utc.with_ymd_and_hms(2026, 1, 21, 23, 30, 0).unwrap();
        let offset = FixedOffset::east_opt(0).unwrap();
        assert_eq!(
            operative_date(now, offset),
            NaiveDate::from_ymd_opt(2026, 1, 21).unwrap()
        );
    }

    #[test]
    fn positive_offset_rolls_into_next_day() {
        let now = Utc.with_ymd_and_hms(2026, 1, 21, 23, 30, 0).unwrap();
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            operative_date(now, offset),
            NaiveDate::from_ymd_opt(2026, 1, 22).unwrap()
        );
    }

    #[test]
    fn negative_offset_stays_on_previous_day() {
        let now = Utc.with_ymd_and_hms(2026, 1, 21, 3, 0, 0).unwrap();
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(
            operative_date(now, offset),
            NaiveDate::from_ymd_opt(2026, 1, 20).unwrap()
        );
    }
}
