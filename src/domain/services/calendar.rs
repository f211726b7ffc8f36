use chrono::{DateTime, NaiveDate, Utc};

/// Source of "today" for workflows that stamp dates.
pub trait Calendar: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub struct SystemCalendar;

impl Calendar for SystemCalendar {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Calendar pinned to one day, for tests and back-office replays.
pub struct FixedCalendar {
    today: NaiveDate,
}

impl FixedCalendar {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }
}

impl Calendar for FixedCalendar {
    fn now(&self) -> DateTime<Utc> {
        self.today
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now)
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}
