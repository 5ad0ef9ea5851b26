//! Change-history (journal) rendering.

use std::collections::{BTreeMap, BTreeSet};

use crate::chat_markup::quote_comment;
use crate::issue_render::rank_tag;
use crate::issue_status::StatusTable;
use crate::report_calendar::CalendarContext;
use crate::tracker_types::{Journal, JournalDetail};

const ATTRIBUTE_PROPERTY: &str = "attr";

/// Display names used to resolve id-valued journal fields.
pub struct HistoryNames<'a> {
    pub statuses: &'a StatusTable,
    pub projects: &'a BTreeMap<u64, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Plain,
    Status,
    Project,
    Priority,
    LongText,
}

fn attribute_field(name: &str) -> Option<(&'static str, FieldKind)> {
    let field = match name {
        "status_id" => ("Status", FieldKind::Status),
        "project_id" => ("Project", FieldKind::Project),
        "priority_id" => ("Rank", FieldKind::Priority),
        "assigned_to_id" => ("Assignee", FieldKind::Plain),
        "subject" => ("Subject", FieldKind::Plain),
        "description" => ("Description", FieldKind::LongText),
        "done_ratio" => ("% Done", FieldKind::Plain),
        "estimated_hours" => ("Estimated time", FieldKind::Plain),
        "start_date" => ("Start date", FieldKind::Plain),
        "due_date" => ("Due date", FieldKind::Plain),
        "fixed_version_id" => ("Target version", FieldKind::Plain),
        "tracker_id" => ("Tracker", FieldKind::Plain),
        "category_id" => ("Category", FieldKind::Plain),
        "parent_id" => ("Parent task", FieldKind::Plain),
        _ => return None,
    };
    Some(field)
}

fn detail_field(detail: &JournalDetail) -> (String, FieldKind) {
    match detail.property.as_str() {
        ATTRIBUTE_PROPERTY => attribute_field(&detail.name)
            .map(|(label, kind)| (label.to_string(), kind))
            .unwrap_or_else(|| (detail.name.clone(), FieldKind::Plain)),
        "cf" => (format!("Custom field {}", detail.name), FieldKind::Plain),
        "attachment" => ("File".to_string(), FieldKind::Plain),
        "relation" => (format!("Relation {}", detail.name), FieldKind::Plain),
        _ => (detail.name.clone(), FieldKind::Plain),
    }
}

fn resolve_value(raw: &str, kind: FieldKind, names: &HistoryNames<'_>) -> String {
    let parsed_id = raw.trim().parse::<u64>().ok();
    match (kind, parsed_id) {
        (FieldKind::Status, Some(id)) => names
            .statuses
            .status_for_id(id)
            .map(|status| status.display_name().to_string())
            .unwrap_or_else(|| raw.to_string()),
        (FieldKind::Project, Some(id)) => names
            .projects
            .get(&id)
            .cloned()
            .unwrap_or_else(|| raw.to_string()),
        (FieldKind::Priority, Some(id)) => rank_tag(id).to_string(),
        _ => raw.to_string(),
    }
}

/// Renders one field change as a bullet line.
pub fn render_journal_detail(detail: &JournalDetail, names: &HistoryNames<'_>) -> String {
    let (label, kind) = detail_field(detail);
    if kind == FieldKind::LongText {
        return format!("• {label} updated");
    }
    let old_value = detail
        .old_value
        .as_deref()
        .filter(|value| !value.is_empty())
        .map(|value| resolve_value(value, kind, names));
    let new_value = detail
        .new_value
        .as_deref()
        .filter(|value| !value.is_empty())
        .map(|value| resolve_value(value, kind, names));
    match (old_value, new_value) {
        (Some(old), Some(new)) => format!("• {label} changed from `{old}` to `{new}`"),
        (None, Some(new)) => format!("• {label} set to `{new}`"),
        (Some(old), None) => format!("• {label} `{old}` deleted"),
        (None, None) => format!("• {label} cleared"),
    }
}

/// Renders every journal: author and date, field changes, then quoted notes.
pub fn render_journals(
    journals: &[Journal],
    names: &HistoryNames<'_>,
    calendar: &CalendarContext,
) -> String {
    let mut blocks = Vec::new();
    for journal in journals {
        let author = journal
            .user
            .as_ref()
            .map(|user| user.name.as_str())
            .unwrap_or("unknown");
        let mut lines = vec![format!(
            "*{}* on {}:",
            author,
            calendar.local_date(journal.created_on)
        )];
        lines.extend(
            journal
                .details
                .iter()
                .map(|detail| render_journal_detail(detail, names)),
        );
        if let Some(notes) = journal
            .notes
            .as_deref()
            .filter(|notes| !notes.trim().is_empty())
        {
            lines.push(quote_comment(notes.trim_end()));
        }
        blocks.push(lines.join("\n"));
    }
    blocks.join("\n")
}

/// Project ids referenced by `project_id` changes, for name prefetching.
pub fn referenced_project_ids(journals: &[Journal]) -> BTreeSet<u64> {
    journals
        .iter()
        .flat_map(|journal| journal.details.iter())
        .filter(|detail| detail.property == ATTRIBUTE_PROPERTY && detail.name == "project_id")
        .flat_map(|detail| [detail.old_value.as_deref(), detail.new_value.as_deref()])
        .flatten()
        .filter_map(|value| value.trim().parse::<u64>().ok())
        .collect()
}
