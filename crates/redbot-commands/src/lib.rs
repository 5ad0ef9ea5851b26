//! Pure command interpretation and reply formatting for the Redmine chat bot.
//!
//! Tokenizes directed chat messages, maps them onto the fixed verb table,
//! extracts inline keyword tokens, and renders tracker entities back into chat
//! markup. Nothing in this crate performs I/O; the runtime crate supplies the
//! tracker and chat collaborators.

pub mod chat_markup;
pub mod command_grammar;
pub mod command_tokens;
pub mod issue_render;
pub mod issue_status;
pub mod journal_render;
pub mod keyword_tokens;
pub mod report_calendar;
pub mod report_render;
pub mod tracker_types;

pub use chat_markup::{
    issue_link, issue_subject_link, quote_comment, resolve_mentions, rewrite_chat_links,
    LinkMode,
};
pub use command_grammar::{parse_bot_command, render_help_text, BotCommand, ParsedBotCommand};
pub use command_tokens::{tokenize, CommandTokens};
pub use issue_status::{IssueRank, IssueStatus, StatusTable};
pub use keyword_tokens::{extract_keywords, strip_estimate_token, KeywordTokens};
pub use report_calendar::{CalendarContext, ReportTimezone};
