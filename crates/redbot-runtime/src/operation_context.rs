//! Per-command collaborators and the lookup steps shared by every operation.

use redbot_commands::command_grammar::UserRef;
use redbot_commands::tracker_types::{Issue, Project, TrackerUser};
use redbot_commands::{rewrite_chat_links, strip_estimate_token, CalendarContext, LinkMode};

use crate::bot_config::BotConfig;
use crate::chat_directory::ChatDirectory;
use crate::command_error::{CommandError, FailedOperation, FailureContext};
use crate::identity_resolution::{render_comment_text, resolve_requester, resolve_user_argument};
use crate::tracker_client::TrackerClient;

/// Everything one dispatched command may touch; built fresh per message.
pub struct OperationContext<'a> {
    pub config: &'a BotConfig,
    pub tracker: &'a dyn TrackerClient,
    pub directory: &'a dyn ChatDirectory,
    pub chat_user_id: &'a str,
    pub calendar: CalendarContext,
}

/// Accepts `42` and `#42`.
pub fn parse_issue_id(raw: &str) -> Result<u64, CommandError> {
    raw.trim()
        .trim_start_matches('#')
        .parse::<u64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| CommandError::InvalidIssueId(raw.to_string()))
}

/// Subject as persisted: estimate token removed, links reduced to labels,
/// whitespace collapsed.
pub fn prepare_subject(text: &str) -> Result<(Option<f64>, String), CommandError> {
    let (estimate, stripped) = strip_estimate_token(text);
    let subject = rewrite_chat_links(&stripped, LinkMode::LabelOnly)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if subject.is_empty() {
        return Err(CommandError::EmptySubject);
    }
    Ok((estimate, subject))
}

impl OperationContext<'_> {
    pub fn external_base(&self) -> &str {
        &self.config.tracker_external_base
    }

    pub async fn requester(&self) -> Result<TrackerUser, CommandError> {
        resolve_requester(self.tracker, self.directory, self.chat_user_id).await
    }

    pub async fn user(&self, user: &UserRef) -> Result<TrackerUser, CommandError> {
        match user {
            UserRef::Requester => self.requester().await,
            UserRef::Named(name) => resolve_user_argument(self.tracker, self.directory, name).await,
        }
    }

    pub async fn project(
        &self,
        key: &str,
        operation: FailedOperation,
    ) -> Result<Project, CommandError> {
        self.tracker
            .find_project(key)
            .await
            .or_failed(operation)?
            .ok_or_else(|| CommandError::ProjectNotFound(key.to_string()))
    }

    /// Optional project filter; validated so typos surface as lookup errors.
    pub async fn project_filter(
        &self,
        key: Option<&str>,
        operation: FailedOperation,
    ) -> Result<Option<Project>, CommandError> {
        match key {
            Some(key) => Ok(Some(self.project(key, operation).await?)),
            None => Ok(None),
        }
    }

    pub async fn issue(
        &self,
        raw_id: &str,
        operation: FailedOperation,
    ) -> Result<Issue, CommandError> {
        let issue_id = parse_issue_id(raw_id)?;
        self.issue_by_id(issue_id, operation).await
    }

    pub async fn issue_by_id(
        &self,
        issue_id: u64,
        operation: FailedOperation,
    ) -> Result<Issue, CommandError> {
        self.tracker
            .find_issue(issue_id)
            .await
            .or_failed(operation)?
            .ok_or(CommandError::IssueNotFound(issue_id))
    }

    pub async fn comment_text(&self, text: &str) -> String {
        render_comment_text(self.directory, text).await
    }
}
