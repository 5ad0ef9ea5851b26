//! Verb table mapping tokenized commands onto operation descriptors.
//!
//! Matching is case-insensitive on the verb and gated by a minimum argument
//! count per verb; anything else is reported as unknown rather than raised.

use crate::command_tokens::{tokenize, CommandTokens};
use crate::issue_status::StatusTable;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Whose issues or identity an operation acts on.
pub enum UserRef {
    Requester,
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Action descriptor produced by the grammar; executed by the runtime.
pub enum BotCommand {
    Help,
    Statuses,
    LinkIssue {
        issue_id: u64,
    },
    ShowIssue {
        issue: String,
    },
    CreateIssue {
        assignee: UserRef,
        project: Option<String>,
        version: Option<String>,
        text: String,
    },
    UpdateIssue {
        issue: String,
        comment: String,
    },
    StatusIssue {
        issue: String,
        status: String,
        comment: String,
    },
    CloseIssue {
        issue: String,
        comment: String,
    },
    RejectIssue {
        issue: String,
        comment: String,
    },
    AssignIssue {
        issue: String,
        assignee: String,
        comment: String,
    },
    RankIssue {
        issue: String,
        rank: String,
        comment: String,
    },
    ListIssues {
        user: UserRef,
        project: Option<String>,
    },
    ListAllIssues {
        project: Option<String>,
    },
    ListUnassignedIssues {
        project: Option<String>,
    },
    DailyScrum {
        user: UserRef,
    },
    DailyEod {
        user: UserRef,
    },
    WeeklyEow {
        user: UserRef,
    },
    ListTop5 {
        user: UserRef,
    },
    CreateTop5 {
        rank: String,
        text: String,
    },
    RankTop5 {
        issue: String,
        rank: String,
    },
}

impl BotCommand {
    /// Stable operation name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Statuses => "statuses",
            Self::LinkIssue { .. } => "link_issue",
            Self::ShowIssue { .. } => "show_issue",
            Self::CreateIssue { .. } => "create_issue",
            Self::UpdateIssue { .. } => "update_issue",
            Self::StatusIssue { .. } => "status_issue",
            Self::CloseIssue { .. } => "close_issue",
            Self::RejectIssue { .. } => "reject_issue",
            Self::AssignIssue { .. } => "assign_issue",
            Self::RankIssue { .. } => "rank_issue",
            Self::ListIssues { .. } => "list_issues",
            Self::ListAllIssues { .. } => "list_all_issues",
            Self::ListUnassignedIssues { .. } => "list_unassigned_issues",
            Self::DailyScrum { .. } => "daily_scrum",
            Self::DailyEod { .. } => "daily_eod",
            Self::WeeklyEow { .. } => "weekly_eow",
            Self::ListTop5 { .. } => "list_top5",
            Self::CreateTop5 { .. } => "create_top5",
            Self::RankTop5 { .. } => "rank_top5",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedBotCommand {
    Command(BotCommand),
    Unknown { verb: String },
}

/// One row of the verb table.
pub struct CommandSpec {
    pub verb: &'static str,
    pub min_args: usize,
    pub usage: &'static str,
    pub summary: &'static str,
    build: fn(&CommandTokens) -> BotCommand,
}

fn arg(tokens: &CommandTokens, index: usize) -> String {
    tokens.arg(index).unwrap_or_default().to_string()
}

fn optional_tail(tokens: &CommandTokens, start: usize) -> Option<String> {
    let tail = tokens.tail(start);
    (!tail.is_empty()).then_some(tail)
}

pub const COMMAND_TABLE: &[CommandSpec] = &[
    CommandSpec {
        verb: "help",
        min_args: 0,
        usage: "help",
        summary: "shows this list",
        build: |_| BotCommand::Help,
    },
    CommandSpec {
        verb: "statuses",
        min_args: 0,
        usage: "statuses",
        summary: "lists the status keywords",
        build: |_| BotCommand::Statuses,
    },
    CommandSpec {
        verb: "show",
        min_args: 1,
        usage: "show <issue #>",
        summary: "shows an issue with its description and history",
        build: |t| BotCommand::ShowIssue { issue: arg(t, 0) },
    },
    CommandSpec {
        verb: "issue",
        min_args: 1,
        usage: "issue <subject>",
        summary: "creates new issue and assigns it to you",
        build: |t| BotCommand::CreateIssue {
            assignee: UserRef::Requester,
            project: None,
            version: None,
            text: t.tail(0),
        },
    },
    CommandSpec {
        verb: "issueto",
        min_args: 2,
        usage: "issueto <name> <subject>",
        summary: "creates new issue and assigns it to `<name>`",
        build: |t| BotCommand::CreateIssue {
            assignee: UserRef::Named(arg(t, 0)),
            project: None,
            version: None,
            text: t.tail(1),
        },
    },
    CommandSpec {
        verb: "issuein",
        min_args: 2,
        usage: "issuein <project> <subject>",
        summary: "creates new issue in `<project>` and assigns it to you",
        build: |t| BotCommand::CreateIssue {
            assignee: UserRef::Requester,
            project: Some(arg(t, 0)),
            version: None,
            text: t.tail(1),
        },
    },
    CommandSpec {
        verb: "issuetoin",
        min_args: 3,
        usage: "issuetoin <name> <project> <subject>",
        summary: "creates new issue in `<project>` and assigns it to `<name>`",
        build: |t| BotCommand::CreateIssue {
            assignee: UserRef::Named(arg(t, 0)),
            project: Some(arg(t, 1)),
            version: None,
            text: t.tail(2),
        },
    },
    CommandSpec {
        verb: "issuever",
        min_args: 3,
        usage: "issuever <project> <version> <subject>",
        summary: "creates new issue in `<project>` for `<version>`",
        build: |t| BotCommand::CreateIssue {
            assignee: UserRef::Requester,
            project: Some(arg(t, 0)),
            version: Some(arg(t, 1)),
            text: t.tail(2),
        },
    },
    CommandSpec {
        verb: "update",
        min_args: 2,
        usage: "update <issue #> <comment>",
        summary: "updates an issue with the following `<comment>`",
        build: |t| BotCommand::UpdateIssue {
            issue: arg(t, 0),
            comment: t.tail(1),
        },
    },
    CommandSpec {
        verb: "status",
        min_args: 3,
        usage: "status <issue #> <status> <comment>",
        summary: "changes the status of an issue",
        build: |t| BotCommand::StatusIssue {
            issue: arg(t, 0),
            status: arg(t, 1),
            comment: t.tail(2),
        },
    },
    CommandSpec {
        verb: "close",
        min_args: 2,
        usage: "close <issue #> <comment>",
        summary: "closes an issue with the following comment",
        build: |t| BotCommand::CloseIssue {
            issue: arg(t, 0),
            comment: t.tail(1),
        },
    },
    CommandSpec {
        verb: "reject",
        min_args: 2,
        usage: "reject <issue #> <comment>",
        summary: "rejects an issue with the following comment",
        build: |t| BotCommand::RejectIssue {
            issue: arg(t, 0),
            comment: t.tail(1),
        },
    },
    CommandSpec {
        verb: "assign",
        min_args: 2,
        usage: "assign <issue #> <name> [comment]",
        summary: "assigns an issue to `<name>`",
        build: |t| BotCommand::AssignIssue {
            issue: arg(t, 0),
            assignee: arg(t, 1),
            comment: t.tail(2),
        },
    },
    CommandSpec {
        verb: "rank",
        min_args: 2,
        usage: "rank <issue #> <1-5> [comment]",
        summary: "sets the rank of an issue, 1 is the most important",
        build: |t| BotCommand::RankIssue {
            issue: arg(t, 0),
            rank: arg(t, 1),
            comment: t.tail(2),
        },
    },
    CommandSpec {
        verb: "list",
        min_args: 0,
        usage: "list [project]",
        summary: "lists all open issues assigned to you",
        build: |t| BotCommand::ListIssues {
            user: UserRef::Requester,
            project: optional_tail(t, 0),
        },
    },
    CommandSpec {
        verb: "listfor",
        min_args: 1,
        usage: "listfor <name> [project]",
        summary: "lists all open issues assigned to `<name>`",
        build: |t| BotCommand::ListIssues {
            user: UserRef::Named(arg(t, 0)),
            project: optional_tail(t, 1),
        },
    },
    CommandSpec {
        verb: "listall",
        min_args: 0,
        usage: "listall [project]",
        summary: "lists all open issues",
        build: |t| BotCommand::ListAllIssues {
            project: optional_tail(t, 0),
        },
    },
    CommandSpec {
        verb: "listun",
        min_args: 0,
        usage: "listun [project]",
        summary: "lists all open unassigned issues",
        build: |t| BotCommand::ListUnassignedIssues {
            project: optional_tail(t, 0),
        },
    },
    CommandSpec {
        verb: "scrum",
        min_args: 0,
        usage: "scrum",
        summary: "daily scrum report of your issues",
        build: |_| BotCommand::DailyScrum {
            user: UserRef::Requester,
        },
    },
    CommandSpec {
        verb: "scrumfor",
        min_args: 1,
        usage: "scrumfor <name>",
        summary: "daily scrum report for `<name>`",
        build: |t| BotCommand::DailyScrum {
            user: UserRef::Named(arg(t, 0)),
        },
    },
    CommandSpec {
        verb: "eod",
        min_args: 0,
        usage: "eod",
        summary: "end of day report with today's hours",
        build: |_| BotCommand::DailyEod {
            user: UserRef::Requester,
        },
    },
    CommandSpec {
        verb: "eodfor",
        min_args: 1,
        usage: "eodfor <name>",
        summary: "end of day report for `<name>`",
        build: |t| BotCommand::DailyEod {
            user: UserRef::Named(arg(t, 0)),
        },
    },
    CommandSpec {
        verb: "eow",
        min_args: 0,
        usage: "eow",
        summary: "end of week report with the last 7 days of hours",
        build: |_| BotCommand::WeeklyEow {
            user: UserRef::Requester,
        },
    },
    CommandSpec {
        verb: "eowfor",
        min_args: 1,
        usage: "eowfor <name>",
        summary: "end of week report for `<name>`",
        build: |t| BotCommand::WeeklyEow {
            user: UserRef::Named(arg(t, 0)),
        },
    },
    CommandSpec {
        verb: "top5",
        min_args: 0,
        usage: "top5",
        summary: "lists your top 5",
        build: |_| BotCommand::ListTop5 {
            user: UserRef::Requester,
        },
    },
    CommandSpec {
        verb: "top5for",
        min_args: 1,
        usage: "top5for <name>",
        summary: "lists the top 5 of `<name>`",
        build: |t| BotCommand::ListTop5 {
            user: UserRef::Named(arg(t, 0)),
        },
    },
    CommandSpec {
        verb: "top5add",
        min_args: 2,
        usage: "top5add <1-5> <subject>",
        summary: "adds an item to your top 5 at the given rank",
        build: |t| BotCommand::CreateTop5 {
            rank: arg(t, 0),
            text: t.tail(1),
        },
    },
    CommandSpec {
        verb: "top5rank",
        min_args: 2,
        usage: "top5rank <issue #> <1-5>",
        summary: "re-ranks a top 5 item",
        build: |t| BotCommand::RankTop5 {
            issue: arg(t, 0),
            rank: arg(t, 1),
        },
    },
];

/// Returns the issue id when the whole command is one positive integer.
pub fn implicit_issue_shortcut(tokens: &CommandTokens) -> Option<u64> {
    if !tokens.args.is_empty() {
        return None;
    }
    tokens.verb.parse::<u64>().ok().filter(|id| *id > 0)
}

pub fn find_command_spec(verb: &str) -> Option<&'static CommandSpec> {
    let normalized = verb.to_lowercase();
    COMMAND_TABLE.iter().find(|spec| spec.verb == normalized)
}

/// Maps a tokenized command onto a descriptor, or reports it as unknown.
pub fn parse_tokens(tokens: &CommandTokens) -> ParsedBotCommand {
    if tokens.is_empty() {
        return ParsedBotCommand::Command(BotCommand::Help);
    }
    if let Some(issue_id) = implicit_issue_shortcut(tokens) {
        return ParsedBotCommand::Command(BotCommand::LinkIssue { issue_id });
    }
    match find_command_spec(&tokens.verb) {
        Some(spec) if tokens.args.len() >= spec.min_args => {
            ParsedBotCommand::Command((spec.build)(tokens))
        }
        _ => ParsedBotCommand::Unknown {
            verb: tokens.verb.clone(),
        },
    }
}

pub fn parse_bot_command(raw: &str) -> ParsedBotCommand {
    parse_tokens(&tokenize(raw))
}

pub const UNKNOWN_COMMAND_MESSAGE: &str =
    ":question: Unknown/invalid command - Try `help` for a list of supported commands";

/// Help text listing every verb in table order.
pub fn render_help_text(statuses: &StatusTable) -> String {
    let mut lines = vec![":hammer_and_wrench: *List of supported commands:*".to_string()];
    lines.push("`<issue #>` - links the issue".to_string());
    for spec in COMMAND_TABLE {
        lines.push(format!("`{}` - {}", spec.usage, spec.summary));
        if spec.verb == "status" {
            lines.push(format!(
                "\t`<status>` must be one of the following: {}",
                statuses.keyword_list()
            ));
        }
    }
    lines.push("Comment keywords: `$<n>h` estimate, `!<n>h` record time, `%<n>` percent done".to_string());
    lines.join("\n")
}
