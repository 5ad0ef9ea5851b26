//! Single entry point from a directed chat message to exactly one reply.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use redbot_commands::chat_markup::mention;
use redbot_commands::command_grammar::UNKNOWN_COMMAND_MESSAGE;
use redbot_commands::{
    parse_bot_command, render_help_text, BotCommand, CalendarContext, ParsedBotCommand,
};

use crate::bot_config::BotConfig;
use crate::chat_directory::ChatDirectory;
use crate::command_error::{error_chain, CommandError};
use crate::operation_context::OperationContext;
use crate::tracker_client::TrackerClient;

const INTERNAL_FAILURE_MESSAGE: &str = ":x: Internal error while handling the command";

#[derive(Clone)]
/// Stateless command executor shared by every inbound event.
pub struct CommandDispatcher {
    config: Arc<BotConfig>,
    tracker: Arc<dyn TrackerClient>,
    directory: Arc<dyn ChatDirectory>,
}

impl CommandDispatcher {
    pub fn new(
        config: Arc<BotConfig>,
        tracker: Arc<dyn TrackerClient>,
        directory: Arc<dyn ChatDirectory>,
    ) -> Self {
        Self {
            config,
            tracker,
            directory,
        }
    }

    /// Runs `text` for `chat_user_id`; "today" is taken from the configured zone.
    pub async fn dispatch(&self, chat_user_id: &str, text: &str) -> String {
        self.dispatch_at(chat_user_id, text, self.config.calendar())
            .await
    }

    /// Like [`Self::dispatch`] with a fixed calendar.
    pub async fn dispatch_at(
        &self,
        chat_user_id: &str,
        text: &str,
        calendar: CalendarContext,
    ) -> String {
        let body = match parse_bot_command(text) {
            ParsedBotCommand::Unknown { verb } => {
                tracing::info!(user = chat_user_id, verb = verb.as_str(), "unknown command");
                format!(
                    "{UNKNOWN_COMMAND_MESSAGE}\n{}",
                    render_help_text(&self.config.statuses)
                )
            }
            ParsedBotCommand::Command(command) => {
                let context = OperationContext {
                    config: &self.config,
                    tracker: self.tracker.as_ref(),
                    directory: self.directory.as_ref(),
                    chat_user_id,
                    calendar,
                };
                run_guarded(&context, command).await
            }
        };
        format!("{} {body}", mention(chat_user_id))
    }
}

/// Executes one command; errors and panics both become reply text.
async fn run_guarded(context: &OperationContext<'_>, command: BotCommand) -> String {
    let operation = command.name();
    tracing::info!(user = context.chat_user_id, operation, "dispatching command");
    let outcome = AssertUnwindSafe(execute_command(context, command))
        .catch_unwind()
        .await;
    match outcome {
        Ok(Ok(reply)) => reply,
        Ok(Err(error)) => {
            tracing::warn!(
                user = context.chat_user_id,
                operation,
                error = %error_chain(&error),
                "command failed"
            );
            error.user_message()
        }
        Err(_) => {
            tracing::error!(
                user = context.chat_user_id,
                operation,
                "command handler panicked"
            );
            INTERNAL_FAILURE_MESSAGE.to_string()
        }
    }
}

async fn execute_command(
    context: &OperationContext<'_>,
    command: BotCommand,
) -> Result<String, CommandError> {
    match command {
        BotCommand::Help => Ok(render_help_text(&context.config.statuses)),
        BotCommand::Statuses => Ok(context.statuses_reply()),
        BotCommand::LinkIssue { issue_id } => context.link_issue(issue_id).await,
        BotCommand::ShowIssue { issue } => context.show_issue(&issue).await,
        BotCommand::CreateIssue {
            assignee,
            project,
            version,
            text,
        } => {
            context
                .create_issue(&assignee, project.as_deref(), version.as_deref(), &text)
                .await
        }
        BotCommand::UpdateIssue { issue, comment } => context.update_issue(&issue, &comment).await,
        BotCommand::StatusIssue {
            issue,
            status,
            comment,
        } => context.change_issue_status(&issue, &status, &comment).await,
        BotCommand::CloseIssue { issue, comment } => context.close_issue(&issue, &comment).await,
        BotCommand::RejectIssue { issue, comment } => {
            context.reject_issue(&issue, &comment).await
        }
        BotCommand::AssignIssue {
            issue,
            assignee,
            comment,
        } => context.assign_issue(&issue, &assignee, &comment).await,
        BotCommand::RankIssue {
            issue,
            rank,
            comment,
        } => context.rank_issue(&issue, &rank, &comment).await,
        BotCommand::ListIssues { user, project } => {
            context.list_issues(&user, project.as_deref()).await
        }
        BotCommand::ListAllIssues { project } => context.list_all_issues(project.as_deref()).await,
        BotCommand::ListUnassignedIssues { project } => {
            context.list_unassigned_issues(project.as_deref()).await
        }
        BotCommand::DailyScrum { user } => context.daily_scrum(&user).await,
        BotCommand::DailyEod { user } => context.daily_eod(&user).await,
        BotCommand::WeeklyEow { user } => context.weekly_eow(&user).await,
        BotCommand::ListTop5 { user } => context.list_top5(&user).await,
        BotCommand::CreateTop5 { rank, text } => context.create_top5(&rank, &text).await,
        BotCommand::RankTop5 { issue, rank } => context.rank_top5(&issue, &rank).await,
    }
}
