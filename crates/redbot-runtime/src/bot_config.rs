//! Immutable operation configuration built once at startup.

use redbot_commands::{CalendarContext, ReportTimezone, StatusTable};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Settings every tracker operation reads; passed by reference, never global.
pub struct BotConfig {
    /// Browser-facing tracker host used in issue links.
    pub tracker_external_base: String,
    pub statuses: StatusTable,
    pub default_project: Option<String>,
    pub tracker_id: Option<u64>,
    pub top5_project: Option<String>,
    pub activity_id: Option<u64>,
    pub timezone: ReportTimezone,
}

impl BotConfig {
    pub fn new(tracker_external_base: impl Into<String>, statuses: StatusTable) -> Self {
        Self {
            tracker_external_base: tracker_external_base
                .into()
                .trim_end_matches('/')
                .to_string(),
            statuses,
            default_project: None,
            tracker_id: None,
            top5_project: None,
            activity_id: None,
            timezone: ReportTimezone::Local,
        }
    }

    /// "Today" for one dispatched command.
    pub fn calendar(&self) -> CalendarContext {
        CalendarContext::now(self.timezone)
    }
}
