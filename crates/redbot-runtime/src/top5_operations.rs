//! Personal ranked backlog kept as ordinary issues in a dedicated project.

use redbot_commands::command_grammar::UserRef;
use redbot_commands::issue_render::rank_tag_for;
use redbot_commands::report_render::render_top5;
use redbot_commands::tracker_types::Project;
use redbot_commands::{issue_subject_link, IssueRank};

use crate::command_error::{CommandError, FailedOperation, FailureContext};
use crate::operation_context::{prepare_subject, OperationContext};
use crate::tracker_client::{Impersonation, IssueQuery, IssueUpdate, NewIssue};

fn parse_rank(raw: &str) -> Result<IssueRank, CommandError> {
    IssueRank::parse(raw).ok_or_else(|| CommandError::InvalidRank(raw.to_string()))
}

impl OperationContext<'_> {
    async fn top5_project(&self, operation: FailedOperation) -> Result<Project, CommandError> {
        let key = self
            .config
            .top5_project
            .as_deref()
            .ok_or(CommandError::Top5NotConfigured)?;
        self.project(key, operation).await
    }

    pub async fn list_top5(&self, user: &UserRef) -> Result<String, CommandError> {
        let project = self.top5_project(FailedOperation::ListIssues).await?;
        let user = self.user(user).await?;
        let project_key = project.id.to_string();
        let issues = self
            .tracker
            .query_issues(
                &IssueQuery::open()
                    .assigned_to(user.id)
                    .in_project(Some(project_key.as_str())),
            )
            .await
            .or_failed(FailedOperation::ListIssues)?;
        Ok(render_top5(
            &user.full_name(),
            &issues,
            self.external_base(),
            &self.calendar,
        ))
    }

    pub async fn create_top5(&self, rank: &str, text: &str) -> Result<String, CommandError> {
        let rank = parse_rank(rank)?;
        let (estimate, subject) = prepare_subject(text)?;
        let project = self.top5_project(FailedOperation::CreateIssue).await?;
        let requester = self.requester().await?;
        let created = self
            .tracker
            .create_issue(
                &Impersonation::of(&requester),
                &NewIssue {
                    project_id: project.id,
                    tracker_id: self.config.tracker_id,
                    subject,
                    assigned_to_id: Some(requester.id),
                    fixed_version_id: None,
                    estimated_hours: estimate,
                    priority_id: Some(rank.to_priority()),
                },
            )
            .await
            .or_failed(FailedOperation::CreateIssue)?;
        tracing::info!(
            issue_id = created.id,
            author = requester.login.as_str(),
            rank = rank.value(),
            "top 5 item created"
        );
        Ok(format!(
            ":trophy: Added {} as {}",
            issue_subject_link(self.external_base(), created.id, &created.subject),
            rank_tag_for(Some(rank))
        ))
    }

    pub async fn rank_top5(&self, raw_id: &str, rank: &str) -> Result<String, CommandError> {
        let rank = parse_rank(rank)?;
        let project = self.top5_project(FailedOperation::RankIssue).await?;
        let requester = self.requester().await?;
        let issue = self.issue(raw_id, FailedOperation::RankIssue).await?;
        if issue.project.id != project.id {
            return Err(CommandError::NotInTop5(issue.id));
        }
        self.tracker
            .update_issue(
                &Impersonation::of(&requester),
                issue.id,
                &IssueUpdate {
                    priority_id: Some(rank.to_priority()),
                    ..IssueUpdate::default()
                },
            )
            .await
            .or_failed(FailedOperation::RankIssue)?;
        Ok(format!(
            ":trophy: Ranked {} as {}",
            issue_subject_link(self.external_base(), issue.id, &issue.subject),
            rank_tag_for(Some(rank))
        ))
    }
}
