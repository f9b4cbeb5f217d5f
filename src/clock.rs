use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};
use std::sync::{Arc, RwLock};

/// Source of "today" and "now", both resolved in one fixed timezone.
///
/// The ledger never reads the system clock itself; everything goes through
/// this trait so a test can pin the calendar.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;

    fn now(&self) -> NaiveTime;

    fn timestamp(&self) -> NaiveDateTime {
        self.today().and_time(self.now())
    }
}

/// Wall clock shifted to a fixed UTC offset
#[derive(Debug, Clone, Copy)]
pub struct FixedOffsetClock {
    offset: FixedOffset,
}

impl FixedOffsetClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// Returns `None` when the offset is a day or more away from UTC.
    pub fn from_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    fn local(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }
}

impl Clock for FixedOffsetClock {
    fn today(&self) -> NaiveDate {
        self.local().date()
    }

    fn now(&self) -> NaiveTime {
        self.local().time()
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.local()
    }
}

/// Clock whose reading only changes when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<RwLock<NaiveDateTime>>,
}

impl ManualClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self {
            current: Arc::new(RwLock::new(at)),
        }
    }

    pub fn set(&self, at: NaiveDateTime) {
        if let Ok(mut current) = self.current.write() {
            *current = at;
        }
    }

    pub fn set_date(&self, date: NaiveDate) {
        let time = self.now();
        self.set(date.and_time(time));
    }

    pub fn set_time(&self, time: NaiveTime) {
        let date = self.today();
        self.set(date.and_time(time));
    }

    fn read(&self) -> NaiveDateTime {
        match self.current.read() {
            Ok(current) => *current,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        self.read().date()
    }

    fn now(&self) -> NaiveTime {
        self.read().time()
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_when_set() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.timestamp(), start);

        clock.set_time(NaiveTime::from_hms_opt(7, 15, 0).unwrap());
        assert_eq!(clock.today(), start.date());
        assert_eq!(clock.now(), NaiveTime::from_hms_opt(7, 15, 0).unwrap());

        clock.set_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(clock.now(), NaiveTime::from_hms_opt(7, 15, 0).unwrap());
    }

    #[test]
    fn manual_clock_clones_share_the_reading() {
        let clock = ManualClock::new(
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(6, 0, 0)
                .unwrap(),
        );
        let handle = clock.clone();
        handle.set_date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
    }

    #[test]
    fn fixed_offset_clock_validates_offset() {
        let ist = FixedOffsetClock::from_minutes(330).unwrap();
        assert_eq!(ist.offset().local_minus_utc(), 330 * 60);
        assert!(FixedOffsetClock::from_minutes(24 * 60).is_none());
    }

    #[test]
    fn fixed_offset_clock_agrees_with_utc_shift() {
        let clock = FixedOffsetClock::from_minutes(0).unwrap();
        let utc_today = Utc::now().date_naive();
        let today = clock.today();
        // allow for the test straddling midnight
        assert!(today == utc_today || today == utc_today.succ_opt().unwrap());
    }
}
