//! Report assembly: issue lists, status-grouped scrum/EOD/EOW reports, the
//! period hour ledger, and the ranked top-5 list.

use std::collections::{BTreeMap, BTreeSet};

use crate::chat_markup::issue_link;
use crate::issue_render::{format_hours, render_issue_line, IssueLineOptions};
use crate::issue_status::{IssueRank, MAX_RANK, MIN_RANK};
use crate::report_calendar::CalendarContext;
use crate::tracker_types::{Issue, TimeEntry};

/// A titled group of issues inside a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub title: String,
    pub issues: Vec<Issue>,
}

impl ReportSection {
    pub fn new(title: impl Into<String>, issues: Vec<Issue>) -> Self {
        Self {
            title: title.into(),
            issues,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Hours logged by one user in a report period.
pub struct PeriodHours {
    pub per_issue: BTreeMap<u64, f64>,
    pub without_issue: BTreeMap<String, f64>,
}

impl PeriodHours {
    pub fn from_entries(entries: &[TimeEntry]) -> Self {
        let mut hours = Self::default();
        for entry in entries {
            match &entry.issue {
                Some(issue) => {
                    *hours.per_issue.entry(issue.id).or_insert(0.0) += entry.hours;
                }
                None => {
                    *hours
                        .without_issue
                        .entry(entry.project.name.clone())
                        .or_insert(0.0) += entry.hours;
                }
            }
        }
        hours
    }

    pub fn total(&self) -> f64 {
        self.per_issue.values().sum::<f64>() + self.without_issue.values().sum::<f64>()
    }

    /// Issue hours not claimed by any of the `rendered` issue ids.
    pub fn remainder(&self, rendered: &BTreeSet<u64>) -> BTreeMap<u64, f64> {
        self.per_issue
            .iter()
            .filter(|(issue_id, _)| !rendered.contains(issue_id))
            .map(|(issue_id, hours)| (*issue_id, *hours))
            .collect()
    }
}

/// Ids of every issue rendered across `sections`.
pub fn rendered_issue_ids(sections: &[ReportSection]) -> BTreeSet<u64> {
    sections
        .iter()
        .flat_map(|section| section.issues.iter().map(|issue| issue.id))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
/// Hours logged against an issue outside the user's own report sections.
pub struct Contribution {
    pub issue_id: u64,
    pub issue: Option<Issue>,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub title: String,
    pub sections: Vec<ReportSection>,
    pub hours: Option<PeriodHours>,
    pub contributions: Vec<Contribution>,
}

fn render_section(
    section: &ReportSection,
    hours: Option<&PeriodHours>,
    claimed: &mut BTreeSet<u64>,
    external_base: &str,
    calendar: &CalendarContext,
) -> String {
    let mut lines = vec![format!("*{}* ({})", section.title, section.issues.len())];
    for issue in &section.issues {
        let mut line = render_issue_line(issue, external_base, calendar, IssueLineOptions::SUMMARY);
        let logged = hours.and_then(|hours| hours.per_issue.get(&issue.id));
        if let Some(logged) = logged {
            if claimed.insert(issue.id) {
                line.push_str(&format!(" :stopwatch: {}", format_hours(*logged)));
            }
        }
        lines.push(line);
    }
    lines.join("\n")
}

fn render_contributions(
    report: &StatusReport,
    external_base: &str,
    calendar: &CalendarContext,
) -> Option<String> {
    let without_issue = report
        .hours
        .as_ref()
        .map(|hours| &hours.without_issue)
        .filter(|entries| !entries.is_empty());
    if report.contributions.is_empty() && without_issue.is_none() {
        return None;
    }
    let mut lines = vec!["*Contributions to other issues*".to_string()];
    for contribution in &report.contributions {
        let rendered = match &contribution.issue {
            Some(issue) => {
                render_issue_line(issue, external_base, calendar, IssueLineOptions::PLAIN)
            }
            None => issue_link(external_base, contribution.issue_id),
        };
        lines.push(format!(
            "{rendered} :stopwatch: {}",
            format_hours(contribution.hours)
        ));
    }
    for (project, hours) in without_issue.into_iter().flatten() {
        lines.push(format!(
            "*{project}* _(no issue)_ :stopwatch: {}",
            format_hours(*hours)
        ));
    }
    Some(lines.join("\n"))
}

/// Renders a scrum/EOD/EOW report; empty sections are omitted.
pub fn render_status_report(
    report: &StatusReport,
    external_base: &str,
    calendar: &CalendarContext,
) -> String {
    let mut blocks = vec![report.title.clone()];
    let mut claimed = BTreeSet::new();
    for section in report.sections.iter().filter(|s| !s.issues.is_empty()) {
        blocks.push(render_section(
            section,
            report.hours.as_ref(),
            &mut claimed,
            external_base,
            calendar,
        ));
    }
    if let Some(contributions) = render_contributions(report, external_base, calendar) {
        blocks.push(contributions);
    }
    if let Some(hours) = &report.hours {
        blocks.push(format!("*Total:* {}", format_hours(hours.total())));
    } else if blocks.len() == 1 {
        blocks.push("_Nothing to report._".to_string());
    }
    blocks.join("\n\n")
}

/// Renders a flat issue list with a header, or `empty_message` when empty.
pub fn render_issue_list(
    header: &str,
    empty_message: &str,
    issues: &[Issue],
    external_base: &str,
    calendar: &CalendarContext,
    options: IssueLineOptions,
) -> String {
    if issues.is_empty() {
        return empty_message.to_string();
    }
    let mut lines = vec![header.to_string()];
    lines.extend(
        issues
            .iter()
            .map(|issue| render_issue_line(issue, external_base, calendar, options)),
    );
    lines.join("\n")
}

/// Numbers top-5 issues rank 1 through 5; ties share a rank as `r.n`.
pub fn top5_labels(issues: &[Issue]) -> Vec<(String, &Issue)> {
    let mut labelled = Vec::new();
    for rank_value in MIN_RANK..=MAX_RANK {
        let Some(rank) = IssueRank::new(rank_value) else {
            continue;
        };
        let tied = issues
            .iter()
            .filter(|issue| issue.priority.id == rank.to_priority())
            .collect::<Vec<_>>();
        if tied.len() == 1 {
            labelled.push((rank_value.to_string(), tied[0]));
        } else {
            labelled.extend(
                tied.into_iter()
                    .enumerate()
                    .map(|(index, issue)| (format!("{rank_value}.{}", index + 1), issue)),
            );
        }
    }
    labelled.extend(
        issues
            .iter()
            .filter(|issue| IssueRank::from_priority(issue.priority.id).is_none())
            .map(|issue| ("-".to_string(), issue)),
    );
    labelled
}

pub fn render_top5(
    owner_name: &str,
    issues: &[Issue],
    external_base: &str,
    calendar: &CalendarContext,
) -> String {
    if issues.is_empty() {
        return format!(":thumbsup: No top 5 items for {owner_name}");
    }
    let mut lines = vec![format!(":trophy: Top 5 for {owner_name}:")];
    lines.extend(top5_labels(issues).into_iter().map(|(label, issue)| {
        format!(
            "*{label}.* {}",
            render_issue_line(issue, external_base, calendar, IssueLineOptions::SUMMARY)
        )
    }));
    lines.join("\n")
}
