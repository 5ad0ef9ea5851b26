//! Issue detail lines: staleness and rank tags, time/percent summary, links.

use chrono::{DateTime, Utc};

use crate::chat_markup::{issue_subject_link, quote_comment};
use crate::issue_status::IssueRank;
use crate::report_calendar::CalendarContext;
use crate::tracker_types::Issue;

pub const TAG_CREATED_TODAY: &str = ":new:";
pub const TAG_UPDATED_TODAY: &str = ":sunny:";
pub const TAG_UPDATED_1_DAY: &str = ":mostly_sunny:";
pub const TAG_UPDATED_2_DAYS: &str = ":partly_sunny:";
pub const TAG_UPDATED_3_DAYS: &str = ":cloud:";
pub const TAG_UPDATED_THIS_WEEK: &str = ":rain_cloud:";
pub const TAG_STALE: &str = ":snowflake:";
pub const TAG_UNKNOWN_AGE: &str = ":grey_question:";

const RANK_TAGS: [&str; 5] = [":one:", ":two:", ":three:", ":four:", ":five:"];
pub const TAG_UNKNOWN_RANK: &str = ":heavy_minus_sign:";

const NO_ESTIMATE: &str = "[--]";
const NO_DATE: &str = "?";

/// Freshness tag from creation and last-update dates relative to today.
pub fn staleness_tag(
    created_on: DateTime<Utc>,
    updated_on: DateTime<Utc>,
    calendar: &CalendarContext,
) -> &'static str {
    let created = calendar.local_date(created_on);
    let updated = calendar.local_date(updated_on);
    if created == calendar.today {
        return TAG_CREATED_TODAY;
    }
    if created > calendar.today || updated > calendar.today {
        return TAG_UNKNOWN_AGE;
    }
    match (calendar.today - updated).num_days() {
        0 => TAG_UPDATED_TODAY,
        1 => TAG_UPDATED_1_DAY,
        2 => TAG_UPDATED_2_DAYS,
        3 => TAG_UPDATED_3_DAYS,
        4..=7 => TAG_UPDATED_THIS_WEEK,
        _ => TAG_STALE,
    }
}

pub fn rank_tag_for(rank: Option<IssueRank>) -> &'static str {
    rank.and_then(|rank| RANK_TAGS.get(usize::from(rank.value()) - 1).copied())
        .unwrap_or(TAG_UNKNOWN_RANK)
}

/// Rank glyph for a tracker priority id.
pub fn rank_tag(priority_id: u64) -> &'static str {
    rank_tag_for(IssueRank::from_priority(priority_id))
}

/// Hours with at most two decimals and no trailing zeros.
pub fn format_hours(hours: f64) -> String {
    let rounded = (hours * 100.0).round() / 100.0;
    format!("{rounded}h")
}

/// `` `pct%` [est/spent] (start → due) `` summary.
pub fn render_time_summary(issue: &Issue) -> String {
    let hours = match issue.estimated_hours {
        Some(estimate) => format!(
            "[{}/{}]",
            format_hours(estimate),
            format_hours(issue.spent_hours.unwrap_or(0.0))
        ),
        None => NO_ESTIMATE.to_string(),
    };
    let start = issue
        .start_date
        .map(|date| date.to_string())
        .unwrap_or_else(|| NO_DATE.to_string());
    let due = issue
        .due_date
        .map(|date| date.to_string())
        .unwrap_or_else(|| NO_DATE.to_string());
    format!("`{}%` {hours} ({start} → {due})", issue.done_ratio)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueLineOptions {
    pub summary: bool,
    pub assignee: bool,
    pub description: bool,
}

impl IssueLineOptions {
    pub const PLAIN: Self = Self {
        summary: false,
        assignee: false,
        description: false,
    };
    pub const SUMMARY: Self = Self {
        summary: true,
        assignee: false,
        description: false,
    };
    pub const SUMMARY_WITH_ASSIGNEE: Self = Self {
        summary: true,
        assignee: true,
        description: false,
    };
    pub const DETAILED: Self = Self {
        summary: true,
        assignee: true,
        description: true,
    };
}

pub fn render_assignee(issue: &Issue) -> String {
    match &issue.assigned_to {
        Some(assignee) => format!(":bust_in_silhouette: {}", assignee.name),
        None => ":bust_in_silhouette: _unassigned_".to_string(),
    }
}

/// One chat line for an issue, optionally followed by its quoted description.
pub fn render_issue_line(
    issue: &Issue,
    external_base: &str,
    calendar: &CalendarContext,
    options: IssueLineOptions,
) -> String {
    let mut line = format!(
        "{} {} *{}*",
        staleness_tag(issue.created_on, issue.updated_on, calendar),
        rank_tag(issue.priority.id),
        issue.project.name
    );
    if let Some(version) = &issue.fixed_version {
        line.push_str(&format!(" _({})_", version.name));
    }
    line.push(' ');
    line.push_str(&issue_subject_link(external_base, issue.id, &issue.subject));
    if options.summary {
        line.push(' ');
        line.push_str(&render_time_summary(issue));
    }
    if options.assignee {
        line.push(' ');
        line.push_str(&render_assignee(issue));
    }
    if options.description {
        if let Some(description) = issue
            .description
            .as_deref()
            .filter(|text| !text.trim().is_empty())
        {
            line.push('\n');
            line.push_str(&quote_comment(description.trim_end()));
        }
    }
    line
}
