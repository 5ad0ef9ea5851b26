use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use redbot_commands::{IssueStatus, ReportTimezone, StatusTable};
use redbot_runtime::{BotConfig, RedmineApiClient, SlackBridgeConfig};

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "redbot",
    about = "Slack bot that drives Redmine issues from chat commands",
    version
)]
pub struct Cli {
    #[arg(
        long = "redmine-host",
        env = "REDMINE_HOST",
        help = "Redmine REST API base URL"
    )]
    pub redmine_host: String,

    #[arg(
        long = "redmine-ext-host",
        env = "REDMINE_EXT_HOST",
        help = "Browser-facing Redmine URL used in issue links; defaults to --redmine-host"
    )]
    pub redmine_ext_host: Option<String>,

    #[arg(
        long = "redmine-token",
        env = "REDMINE_TOKEN",
        hide_env_values = true,
        help = "Redmine API key of an administrator allowed to switch users"
    )]
    pub redmine_token: String,

    #[arg(long = "redmine-new-id", env = "REDMINE_NEW_ID", value_parser = parse_positive_u64)]
    pub new_status_id: Option<u64>,

    #[arg(
        long = "redmine-inprogress-id",
        env = "REDMINE_INPROGRESS_ID",
        value_parser = parse_positive_u64
    )]
    pub in_progress_status_id: Option<u64>,

    #[arg(
        long = "redmine-feedback-id",
        env = "REDMINE_FEEDBACK_ID",
        value_parser = parse_positive_u64
    )]
    pub feedback_status_id: Option<u64>,

    #[arg(
        long = "redmine-resolved-id",
        env = "REDMINE_RESOLVED_ID",
        value_parser = parse_positive_u64
    )]
    pub resolved_status_id: Option<u64>,

    #[arg(
        long = "redmine-closed-id",
        env = "REDMINE_CLOSED_ID",
        value_parser = parse_positive_u64
    )]
    pub closed_status_id: Option<u64>,

    #[arg(
        long = "redmine-rejected-id",
        env = "REDMINE_REJECTED_ID",
        value_parser = parse_positive_u64
    )]
    pub rejected_status_id: Option<u64>,

    #[arg(long = "redmine-hold-id", env = "REDMINE_HOLD_ID", value_parser = parse_positive_u64)]
    pub hold_status_id: Option<u64>,

    #[arg(
        long = "redmine-project",
        env = "REDMINE_PROJECT",
        help = "Project used by `issue` and `issueto` when none is given"
    )]
    pub default_project: Option<String>,

    #[arg(
        long = "redmine-tracker-id",
        env = "REDMINE_TRACKER_ID",
        value_parser = parse_positive_u64,
        help = "Tracker id set on created issues"
    )]
    pub tracker_id: Option<u64>,

    #[arg(
        long = "redmine-top5-project",
        env = "REDMINE_TOP5_PROJECT",
        help = "Project holding the personal top 5 backlogs"
    )]
    pub top5_project: Option<String>,

    #[arg(
        long = "redmine-activity-id",
        env = "REDMINE_ACTIVITY_ID",
        value_parser = parse_positive_u64,
        help = "Time entry activity id used for recorded hours"
    )]
    pub activity_id: Option<u64>,

    #[arg(
        long = "timezone",
        env = "REDBOT_TIMEZONE",
        value_parser = ReportTimezone::parse,
        help = "IANA zone used for \"today\" in reports and due dates; host zone when unset"
    )]
    pub timezone: Option<ReportTimezone>,

    #[arg(
        long = "slack-api-base",
        env = "SLACK_API_BASE",
        default_value = "https://slack.com/api",
        help = "Slack Web API base URL"
    )]
    pub slack_api_base: String,

    #[arg(
        long = "slack-app-token",
        env = "SLACK_APP_TOKEN",
        hide_env_values = true,
        help = "Slack app-level token used to open Socket Mode connections"
    )]
    pub slack_app_token: String,

    #[arg(
        long = "slack-bot-token",
        env = "SLACK_BOT_TOKEN",
        hide_env_values = true,
        help = "Slack bot token used for Web API calls"
    )]
    pub slack_bot_token: String,

    #[arg(
        long = "bot-id",
        env = "BOT_ID",
        help = "Slack user id of the bot; resolved through auth.test when unset"
    )]
    pub bot_user_id: Option<String>,

    #[arg(
        long = "request-timeout-ms",
        env = "REDBOT_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "reconnect-delay-ms",
        env = "REDBOT_RECONNECT_DELAY_MS",
        default_value_t = 5_000,
        value_parser = parse_positive_u64
    )]
    pub reconnect_delay_ms: u64,

    #[arg(
        long = "max-event-age-seconds",
        env = "REDBOT_MAX_EVENT_AGE_SECONDS",
        default_value_t = 300,
        help = "Drop Slack events older than this; 0 disables the check"
    )]
    pub max_event_age_seconds: u64,

    #[arg(
        long = "processed-event-cap",
        env = "REDBOT_PROCESSED_EVENT_CAP",
        default_value_t = 1_024,
        value_parser = parse_positive_usize
    )]
    pub processed_event_cap: usize,
}

impl Cli {
    pub fn status_table(&self) -> StatusTable {
        StatusTable::new(
            [
                (IssueStatus::New, self.new_status_id),
                (IssueStatus::InProgress, self.in_progress_status_id),
                (IssueStatus::Feedback, self.feedback_status_id),
                (IssueStatus::Resolved, self.resolved_status_id),
                (IssueStatus::Closed, self.closed_status_id),
                (IssueStatus::Rejected, self.rejected_status_id),
                (IssueStatus::Hold, self.hold_status_id),
            ]
            .into_iter()
            .filter_map(|(status, id)| id.map(|id| (status, id))),
        )
    }

    pub fn bot_config(&self) -> BotConfig {
        let external_base = self
            .redmine_ext_host
            .as_deref()
            .filter(|host| !host.trim().is_empty())
            .unwrap_or(self.redmine_host.as_str());
        let mut config = BotConfig::new(external_base.trim(), self.status_table());
        config.default_project = self.default_project.clone();
        config.tracker_id = self.tracker_id;
        config.top5_project = self.top5_project.clone();
        config.activity_id = self.activity_id;
        config.timezone = self.timezone.unwrap_or_default();
        config
    }

    pub fn slack_bridge_config(&self) -> SlackBridgeConfig {
        SlackBridgeConfig {
            api_base: self.slack_api_base.clone(),
            app_token: self.slack_app_token.clone(),
            bot_token: self.slack_bot_token.clone(),
            bot_user_id: self.bot_user_id.clone(),
            request_timeout_ms: self.request_timeout_ms,
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            max_event_age_seconds: self.max_event_age_seconds,
            processed_event_cap: self.processed_event_cap,
        }
    }

    pub fn redmine_client(&self) -> Result<RedmineApiClient> {
        RedmineApiClient::new(
            self.redmine_host.clone(),
            self.redmine_token.clone(),
            self.request_timeout_ms,
        )
    }
}
