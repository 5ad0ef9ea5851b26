//! Typed failures of the operations layer and their one-line chat rendering.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Operation whose collaborator call failed; selects the generic reply text.
pub enum FailedOperation {
    UserLookup,
    IssueLookup,
    CreateIssue,
    UpdateIssue,
    StatusIssue,
    CloseIssue,
    RejectIssue,
    AssignIssue,
    RankIssue,
    TimeEntry,
    ListIssues,
    Report,
}

impl FailedOperation {
    pub fn message(self) -> &'static str {
        match self {
            Self::UserLookup => "User lookup failed",
            Self::IssueLookup => "Issue lookup failed",
            Self::CreateIssue => "Issue creation failed",
            Self::UpdateIssue => "Issue update failed",
            Self::StatusIssue => "Issue status update failed",
            Self::CloseIssue => "Issue closing failed",
            Self::RejectIssue => "Issue rejection failed",
            Self::AssignIssue => "Issue assignment failed",
            Self::RankIssue => "Issue rank update failed",
            Self::TimeEntry => "Time entry creation failed",
            Self::ListIssues => "List operation failed",
            Self::Report => "Report generation failed",
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Could not find you in the tracker (tried {candidates})")]
    RequesterNotFound { candidates: String },
    #[error("User `{0}` not found")]
    UserNotFound(String),
    #[error("Project `{0}` not found")]
    ProjectNotFound(String),
    #[error("Version `{version}` not found in project `{project}`")]
    VersionNotFound { project: String, version: String },
    #[error("Issue `#{0}` not found")]
    IssueNotFound(u64),
    #[error("Invalid issue number `{0}`")]
    InvalidIssueId(String),
    #[error("Unknown status `{status}`, use one of: {allowed}")]
    UnknownStatus { status: String, allowed: String },
    #[error("Status `{0}` is not configured")]
    StatusNotConfigured(&'static str),
    #[error("Invalid rank `{0}`, use a number from 1 to 5")]
    InvalidRank(String),
    #[error("Issue subject is empty")]
    EmptySubject,
    #[error("No default project is configured, use `issuein`")]
    DefaultProjectNotConfigured,
    #[error("No top 5 project is configured")]
    Top5NotConfigured,
    #[error("Issue `#{0}` is not a top 5 item")]
    NotInTop5(u64),
    #[error("{}", .operation.message())]
    Failed {
        operation: FailedOperation,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl CommandError {
    pub fn failed(operation: FailedOperation, source: anyhow::Error) -> Self {
        Self::Failed {
            operation,
            source: source.into(),
        }
    }

    /// Single chat line shown to the requester; transport detail stays in logs.
    pub fn user_message(&self) -> String {
        format!(":x: {self}")
    }
}

/// Maps a collaborator failure onto the generic per-operation failure.
pub trait FailureContext<T> {
    fn or_failed(self, operation: FailedOperation) -> Result<T, CommandError>;
}

impl<T> FailureContext<T> for anyhow::Result<T> {
    fn or_failed(self, operation: FailedOperation) -> Result<T, CommandError> {
        self.map_err(|source| CommandError::failed(operation, source))
    }
}

/// Renders an error and every source below it on one line.
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
