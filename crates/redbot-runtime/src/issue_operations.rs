//! Issue creation, sparse updates and single-issue views.
//!
//! Every write is issued through an [`Impersonation`] of the resolved
//! requester. Comment keywords drive the sparse update payload; a `!<n>h`
//! token adds an independent time-entry write after the update succeeds.

use std::collections::BTreeMap;

use redbot_commands::command_grammar::UserRef;
use redbot_commands::issue_render::{format_hours, rank_tag_for, render_issue_line, IssueLineOptions};
use redbot_commands::journal_render::{referenced_project_ids, render_journals, HistoryNames};
use redbot_commands::tracker_types::{Issue, TrackerUser};
use redbot_commands::{extract_keywords, issue_subject_link, IssueRank, IssueStatus};

use crate::command_error::{CommandError, FailedOperation, FailureContext};
use crate::identity_resolution::resolve_user_argument;
use crate::operation_context::{parse_issue_id, prepare_subject, OperationContext};
use crate::tracker_client::{Impersonation, IssueUpdate, NewIssue, NewTimeEntry};

const TIME_ENTRY_WARNING: &str = ":warning: Time entry creation failed";

/// Change-specific fields applied on top of the comment keywords.
struct IssueChange {
    operation: FailedOperation,
    update: IssueUpdate,
    default_percent: Option<u8>,
}

impl IssueChange {
    fn comment_only(operation: FailedOperation) -> Self {
        Self {
            operation,
            update: IssueUpdate::default(),
            default_percent: None,
        }
    }
}

impl OperationContext<'_> {
    fn issue_reference(&self, issue: &Issue) -> String {
        issue_subject_link(self.external_base(), issue.id, &issue.subject)
    }

    fn status_id(&self, status: IssueStatus) -> Result<u64, CommandError> {
        self.config
            .statuses
            .id_for(status)
            .ok_or(CommandError::StatusNotConfigured(status.keyword()))
    }

    pub async fn link_issue(&self, issue_id: u64) -> Result<String, CommandError> {
        let issue = self
            .issue_by_id(issue_id, FailedOperation::IssueLookup)
            .await?;
        Ok(format!(
            ":link: {}",
            render_issue_line(
                &issue,
                self.external_base(),
                &self.calendar,
                IssueLineOptions::SUMMARY_WITH_ASSIGNEE
            )
        ))
    }

    pub async fn show_issue(&self, raw_id: &str) -> Result<String, CommandError> {
        let issue = self.issue(raw_id, FailedOperation::IssueLookup).await?;
        let mut blocks = vec![format!(
            ":mag: {}",
            render_issue_line(
                &issue,
                self.external_base(),
                &self.calendar,
                IssueLineOptions::DETAILED
            )
        )];
        if !issue.journals.is_empty() {
            let mut projects = BTreeMap::new();
            for project_id in referenced_project_ids(&issue.journals) {
                match self.tracker.find_project(&project_id.to_string()).await {
                    Ok(Some(project)) => {
                        projects.insert(project_id, project.name);
                    }
                    Ok(None) => {}
                    Err(error) => {
                        tracing::warn!(project_id, error = %error, "project name lookup failed");
                    }
                }
            }
            let names = HistoryNames {
                statuses: &self.config.statuses,
                projects: &projects,
            };
            blocks.push(format!(
                "*History*\n{}",
                render_journals(&issue.journals, &names, &self.calendar)
            ));
        }
        Ok(blocks.join("\n\n"))
    }

    pub async fn create_issue(
        &self,
        assignee: &UserRef,
        project: Option<&str>,
        version: Option<&str>,
        text: &str,
    ) -> Result<String, CommandError> {
        let (estimate, subject) = prepare_subject(text)?;
        let requester = self.requester().await?;
        let assignee = match assignee {
            UserRef::Requester => requester.clone(),
            UserRef::Named(name) => {
                resolve_user_argument(self.tracker, self.directory, name).await?
            }
        };
        let project_key = project
            .or(self.config.default_project.as_deref())
            .ok_or(CommandError::DefaultProjectNotConfigured)?;
        let project = self
            .project(project_key, FailedOperation::CreateIssue)
            .await?;
        let version = match version {
            Some(name) => Some(
                self.tracker
                    .find_version(&project, name)
                    .await
                    .or_failed(FailedOperation::CreateIssue)?
                    .ok_or_else(|| CommandError::VersionNotFound {
                        project: project_key.to_string(),
                        version: name.to_string(),
                    })?,
            ),
            None => None,
        };
        let created = self
            .tracker
            .create_issue(
                &Impersonation::of(&requester),
                &NewIssue {
                    project_id: project.id,
                    tracker_id: self.config.tracker_id,
                    subject,
                    assigned_to_id: Some(assignee.id),
                    fixed_version_id: version.as_ref().map(|version| version.id),
                    estimated_hours: estimate,
                    priority_id: None,
                },
            )
            .await
            .or_failed(FailedOperation::CreateIssue)?;
        tracing::info!(
            issue_id = created.id,
            author = requester.login.as_str(),
            assignee = assignee.login.as_str(),
            "issue created"
        );
        Ok(format!(
            ":white_check_mark: Created {} in *{}* for {}",
            self.issue_reference(&created),
            project.name,
            assignee.full_name()
        ))
    }

    /// Writes the sparse update, then the optional time entry.
    ///
    /// Returns the reply suffix echoing the stored comment and recorded time.
    async fn apply_issue_change(
        &self,
        requester: &TrackerUser,
        issue: &Issue,
        comment: &str,
        change: IssueChange,
    ) -> Result<String, CommandError> {
        let comment = self.comment_text(comment).await;
        let keywords = extract_keywords(&comment);
        let mut update = change.update;
        update.notes = Some(comment.trim().to_string()).filter(|notes| !notes.is_empty());
        update.estimated_hours = keywords.estimate;
        update.done_ratio = keywords.percent.or(change.default_percent);
        let echo = update
            .notes
            .as_deref()
            .map(|notes| format!(" with comment `{notes}`"))
            .unwrap_or_default();

        let acting = Impersonation::of(requester);
        self.tracker
            .update_issue(&acting, issue.id, &update)
            .await
            .or_failed(change.operation)?;
        tracing::info!(
            issue_id = issue.id,
            author = requester.login.as_str(),
            "issue updated"
        );

        let Some(hours) = keywords.record.filter(|hours| *hours > 0.0) else {
            return Ok(echo);
        };
        let entry = NewTimeEntry {
            issue_id: issue.id,
            hours,
            spent_on: self.calendar.today,
            activity_id: self.config.activity_id,
            comments: None,
        };
        match self.tracker.create_time_entry(&acting, &entry).await {
            Ok(()) => Ok(format!("{echo} :stopwatch: {} recorded", format_hours(hours))),
            Err(error) => {
                let error = CommandError::failed(FailedOperation::TimeEntry, error);
                tracing::warn!(
                    issue_id = issue.id,
                    error = %crate::command_error::error_chain(&error),
                    "time entry write failed after issue update"
                );
                Ok(format!("{echo}\n{TIME_ENTRY_WARNING}"))
            }
        }
    }

    pub async fn update_issue(&self, raw_id: &str, comment: &str) -> Result<String, CommandError> {
        let requester = self.requester().await?;
        let issue = self.issue(raw_id, FailedOperation::UpdateIssue).await?;
        let suffix = self
            .apply_issue_change(
                &requester,
                &issue,
                comment,
                IssueChange::comment_only(FailedOperation::UpdateIssue),
            )
            .await?;
        Ok(format!(":memo: Updated {}{suffix}", self.issue_reference(&issue)))
    }

    pub async fn change_issue_status(
        &self,
        raw_id: &str,
        status: &str,
        comment: &str,
    ) -> Result<String, CommandError> {
        let target = IssueStatus::from_keyword(status).ok_or_else(|| {
            CommandError::UnknownStatus {
                status: status.to_string(),
                allowed: self.config.statuses.keyword_list(),
            }
        })?;
        let status_id = self.status_id(target)?;
        let requester = self.requester().await?;
        let issue = self.issue(raw_id, FailedOperation::StatusIssue).await?;
        let change = IssueChange {
            operation: FailedOperation::StatusIssue,
            update: IssueUpdate {
                status_id: Some(status_id),
                ..IssueUpdate::default()
            },
            default_percent: None,
        };
        let suffix = self
            .apply_issue_change(&requester, &issue, comment, change)
            .await?;
        Ok(format!(
            ":white_check_mark: {} set to *{}*{suffix}",
            self.issue_reference(&issue),
            target.display_name()
        ))
    }

    /// Close or reject: fixed status, due today, 100% unless a percent is given.
    async fn finish_issue(
        &self,
        raw_id: &str,
        comment: &str,
        status: IssueStatus,
        operation: FailedOperation,
    ) -> Result<(Issue, String), CommandError> {
        let status_id = self.status_id(status)?;
        let requester = self.requester().await?;
        let issue = self.issue(raw_id, operation).await?;
        let change = IssueChange {
            operation,
            update: IssueUpdate {
                status_id: Some(status_id),
                due_date: Some(self.calendar.today),
                ..IssueUpdate::default()
            },
            default_percent: Some(100),
        };
        let suffix = self
            .apply_issue_change(&requester, &issue, comment, change)
            .await?;
        Ok((issue, suffix))
    }

    pub async fn close_issue(&self, raw_id: &str, comment: &str) -> Result<String, CommandError> {
        let (issue, suffix) = self
            .finish_issue(raw_id, comment, IssueStatus::Closed, FailedOperation::CloseIssue)
            .await?;
        Ok(format!(
            ":white_check_mark: Closed {}{suffix}",
            self.issue_reference(&issue)
        ))
    }

    pub async fn reject_issue(&self, raw_id: &str, comment: &str) -> Result<String, CommandError> {
        let (issue, suffix) = self
            .finish_issue(
                raw_id,
                comment,
                IssueStatus::Rejected,
                FailedOperation::RejectIssue,
            )
            .await?;
        Ok(format!(
            ":white_check_mark: Rejected {}{suffix}",
            self.issue_reference(&issue)
        ))
    }

    pub async fn assign_issue(
        &self,
        raw_id: &str,
        assignee: &str,
        comment: &str,
    ) -> Result<String, CommandError> {
        parse_issue_id(raw_id)?;
        let requester = self.requester().await?;
        let assignee = resolve_user_argument(self.tracker, self.directory, assignee).await?;
        let issue = self.issue(raw_id, FailedOperation::AssignIssue).await?;
        let change = IssueChange {
            operation: FailedOperation::AssignIssue,
            update: IssueUpdate {
                assigned_to_id: Some(assignee.id),
                ..IssueUpdate::default()
            },
            default_percent: None,
        };
        let suffix = self
            .apply_issue_change(&requester, &issue, comment, change)
            .await?;
        Ok(format!(
            ":white_check_mark: Assigned {} to {}{suffix}",
            self.issue_reference(&issue),
            assignee.full_name()
        ))
    }

    pub async fn rank_issue(
        &self,
        raw_id: &str,
        rank: &str,
        comment: &str,
    ) -> Result<String, CommandError> {
        let rank = IssueRank::parse(rank).ok_or_else(|| CommandError::InvalidRank(rank.to_string()))?;
        let requester = self.requester().await?;
        let issue = self.issue(raw_id, FailedOperation::RankIssue).await?;
        let change = IssueChange {
            operation: FailedOperation::RankIssue,
            update: IssueUpdate {
                priority_id: Some(rank.to_priority()),
                ..IssueUpdate::default()
            },
            default_percent: None,
        };
        let suffix = self
            .apply_issue_change(&requester, &issue, comment, change)
            .await?;
        Ok(format!(
            ":white_check_mark: Ranked {} as {}{suffix}",
            self.issue_reference(&issue),
            rank_tag_for(Some(rank))
        ))
    }
}
