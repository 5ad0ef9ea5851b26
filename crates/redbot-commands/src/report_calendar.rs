//! Calendar-date conversions for staleness tags, due dates and report periods.

use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Zone in which "today" and tracker timestamps are turned into calendar dates.
pub enum ReportTimezone {
    #[default]
    Local,
    Named(Tz),
}

impl ReportTimezone {
    /// Parses an IANA zone name; blank input selects the host's local zone.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::Local);
        }
        trimmed
            .parse::<Tz>()
            .map(Self::Named)
            .map_err(|_| format!("unknown time zone '{trimmed}'"))
    }

    pub fn local_date(&self, timestamp: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Local => timestamp.with_timezone(&Local).date_naive(),
            Self::Named(tz) => timestamp.with_timezone(tz).date_naive(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.local_date(Utc::now())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Fixed "today" reference captured once per dispatched command.
pub struct CalendarContext {
    pub today: NaiveDate,
    pub timezone: ReportTimezone,
}

impl CalendarContext {
    pub fn new(today: NaiveDate, timezone: ReportTimezone) -> Self {
        Self { today, timezone }
    }

    pub fn now(timezone: ReportTimezone) -> Self {
        Self::new(timezone.today(), timezone)
    }

    pub fn local_date(&self, timestamp: DateTime<Utc>) -> NaiveDate {
        self.timezone.local_date(timestamp)
    }

    /// First day of the trailing window of `days` days ending today.
    pub fn trailing_start(&self, days: u64) -> NaiveDate {
        self.today
            .checked_sub_days(Days::new(days.saturating_sub(1)))
            .unwrap_or(self.today)
    }
}
