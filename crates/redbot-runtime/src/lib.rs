//! Tracker operations, collaborator clients and the Slack transport for the
//! Redmine chat bot.
//!
//! Exposes the command dispatcher, the Redmine and Slack REST clients behind
//! their collaborator traits, and the Socket Mode bridge loop.

pub mod bot_config;
pub mod chat_directory;
pub mod command_dispatch;
pub mod command_error;
pub mod identity_resolution;
mod issue_operations;
pub mod operation_context;
pub mod redmine_api_client;
mod report_operations;
pub mod slack_api_client;
pub mod slack_bridge;
mod top5_operations;
pub mod tracker_client;
mod transport_helpers;

#[cfg(test)]
mod test_support;

pub use bot_config::BotConfig;
pub use chat_directory::{ChatDirectory, ChatUserProfile};
pub use command_dispatch::CommandDispatcher;
pub use command_error::{CommandError, FailedOperation};
pub use operation_context::OperationContext;
pub use redmine_api_client::RedmineApiClient;
pub use slack_api_client::SlackApiClient;
pub use slack_bridge::{run_slack_bridge, SlackBridgeConfig};
pub use tracker_client::{
    AssigneeFilter, Impersonation, IssueQuery, IssueUpdate, NewIssue, NewTimeEntry, StatusFilter,
    TimeEntryQuery, TrackerClient,
};
