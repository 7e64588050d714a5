use chrono::{Days, Local, NaiveDate};

/// Source of "today" for the service, in the service's local timezone.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;

    fn tomorrow(&self) -> NaiveDate {
        let today = self.today();
        // Only fails on NaiveDate::MAX; saturate there instead of panicking.
        today.checked_add_days(Days::new(1)).unwrap_or(today)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to one day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
