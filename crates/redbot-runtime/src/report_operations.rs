//! Open-issue lists and the scrum/EOD/EOW status reports.
//!
//! Every view is a composition of the single issue query primitive; EOD and
//! EOW additionally pull the user's time entries for the period.

use chrono::NaiveDate;
use redbot_commands::command_grammar::UserRef;
use redbot_commands::issue_render::IssueLineOptions;
use redbot_commands::report_render::{
    render_issue_list, render_status_report, rendered_issue_ids, Contribution, PeriodHours,
    ReportSection, StatusReport,
};
use redbot_commands::tracker_types::{Issue, Project, TrackerUser};
use redbot_commands::IssueStatus;

use crate::command_error::{CommandError, FailedOperation, FailureContext};
use crate::operation_context::OperationContext;
use crate::tracker_client::{IssueQuery, TimeEntryQuery};

const WATCHED_SECTION: &str = "Watched issues";
const EOW_DAYS: u64 = 7;

fn project_scope(project: Option<&Project>) -> String {
    project
        .map(|project| format!(" in *{}*", project.name))
        .unwrap_or_default()
}

impl OperationContext<'_> {
    async fn query(
        &self,
        query: IssueQuery,
        operation: FailedOperation,
    ) -> Result<Vec<Issue>, CommandError> {
        self.tracker.query_issues(&query).await.or_failed(operation)
    }

    pub fn statuses_reply(&self) -> String {
        format!(
            ":book: Status keywords:\n{}",
            self.config.statuses.describe()
        )
    }

    fn issue_list(
        &self,
        header: &str,
        empty: &str,
        issues: &[Issue],
        options: IssueLineOptions,
    ) -> String {
        render_issue_list(
            header,
            empty,
            issues,
            self.external_base(),
            &self.calendar,
            options,
        )
    }

    pub async fn list_issues(
        &self,
        user: &UserRef,
        project: Option<&str>,
    ) -> Result<String, CommandError> {
        let user = self.user(user).await?;
        let project = self
            .project_filter(project, FailedOperation::ListIssues)
            .await?;
        let query = IssueQuery::open()
            .assigned_to(user.id)
            .in_project(project.as_ref().map(|project| project.id.to_string()).as_deref());
        let issues = self.query(query, FailedOperation::ListIssues).await?;
        let name = user.full_name();
        let scope = project_scope(project.as_ref());
        Ok(self.issue_list(
            &format!(":book: Open issues for {name}{scope}:"),
            &format!(":thumbsup: No open issues for {name}{scope}"),
            &issues,
            IssueLineOptions::SUMMARY,
        ))
    }

    pub async fn list_all_issues(&self, project: Option<&str>) -> Result<String, CommandError> {
        let project = self
            .project_filter(project, FailedOperation::ListIssues)
            .await?;
        let query = IssueQuery::open()
            .in_project(project.as_ref().map(|project| project.id.to_string()).as_deref());
        let issues = self.query(query, FailedOperation::ListIssues).await?;
        let scope = project_scope(project.as_ref());
        Ok(self.issue_list(
            &format!(":book: Open issues{scope}:"),
            &format!(":thumbsup: No open issues{scope}"),
            &issues,
            IssueLineOptions::SUMMARY_WITH_ASSIGNEE,
        ))
    }

    pub async fn list_unassigned_issues(
        &self,
        project: Option<&str>,
    ) -> Result<String, CommandError> {
        let project = self
            .project_filter(project, FailedOperation::ListIssues)
            .await?;
        let query = IssueQuery::open()
            .unassigned()
            .in_project(project.as_ref().map(|project| project.id.to_string()).as_deref());
        let issues = self.query(query, FailedOperation::ListIssues).await?;
        let scope = project_scope(project.as_ref());
        Ok(self.issue_list(
            &format!(":book: Unassigned open issues{scope}:"),
            &format!(":thumbsup: No unassigned open issues{scope}"),
            &issues,
            IssueLineOptions::SUMMARY,
        ))
    }

    /// One section per configured status, optionally limited to issues
    /// updated in `period`.
    async fn status_sections(
        &self,
        user: &TrackerUser,
        statuses: &[IssueStatus],
        period: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<ReportSection>, CommandError> {
        let mut sections = Vec::new();
        for status in statuses {
            let Some(status_id) = self.config.statuses.id_for(*status) else {
                continue;
            };
            let mut query = IssueQuery::open()
                .assigned_to(user.id)
                .with_status_id(status_id);
            if let Some((from, to)) = period {
                query = query.updated_between(from, to);
            }
            let issues = self.query(query, FailedOperation::Report).await?;
            sections.push(ReportSection::new(status.display_name(), issues));
        }
        Ok(sections)
    }

    /// Open issues the user watches but is not assigned to.
    async fn watched_section(&self, user: &TrackerUser) -> Result<ReportSection, CommandError> {
        let issues = self
            .query(IssueQuery::open().watched_by(user.id), FailedOperation::Report)
            .await?
            .into_iter()
            .filter(|issue| !issue.is_assigned_to(user.id))
            .collect();
        Ok(ReportSection::new(WATCHED_SECTION, issues))
    }

    pub async fn daily_scrum(&self, user: &UserRef) -> Result<String, CommandError> {
        let user = self.user(user).await?;
        let mut sections = self
            .status_sections(&user, &IssueStatus::SCRUM_ORDER, None)
            .await?;
        sections.push(self.watched_section(&user).await?);
        let report = StatusReport {
            title: format!(":book: Scrum for {}", user.full_name()),
            sections,
            hours: None,
            contributions: Vec::new(),
        };
        Ok(render_status_report(
            &report,
            self.external_base(),
            &self.calendar,
        ))
    }

    /// Closed work in the period, the scrum sections, watched issues and the
    /// hour ledger; hours not claimed by a rendered issue become contributions.
    async fn period_report(
        &self,
        title: String,
        user: &TrackerUser,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<String, CommandError> {
        let mut sections = self
            .status_sections(
                user,
                &[IssueStatus::Closed, IssueStatus::Rejected],
                Some((from, to)),
            )
            .await?;
        sections.extend(
            self.status_sections(user, &IssueStatus::SCRUM_ORDER, None)
                .await?,
        );
        sections.push(self.watched_section(user).await?);

        let entries = self
            .tracker
            .query_time_entries(&TimeEntryQuery {
                user_id: user.id,
                from,
                to,
            })
            .await
            .or_failed(FailedOperation::Report)?;
        let hours = PeriodHours::from_entries(&entries);
        let mut contributions = Vec::new();
        for (issue_id, logged) in hours.remainder(&rendered_issue_ids(&sections)) {
            let issue = match self.tracker.find_issue(issue_id).await {
                Ok(issue) => issue,
                Err(error) => {
                    tracing::warn!(issue_id, error = %error, "contribution issue lookup failed");
                    None
                }
            };
            contributions.push(Contribution {
                issue_id,
                issue,
                hours: logged,
            });
        }
        tracing::debug!(
            user = user.login.as_str(),
            %from,
            %to,
            entries = entries.len(),
            contributions = contributions.len(),
            "period report assembled"
        );
        let report = StatusReport {
            title,
            sections,
            hours: Some(hours),
            contributions,
        };
        Ok(render_status_report(
            &report,
            self.external_base(),
            &self.calendar,
        ))
    }

    pub async fn daily_eod(&self, user: &UserRef) -> Result<String, CommandError> {
        let user = self.user(user).await?;
        let today = self.calendar.today;
        let title = format!(":book: EOD for {} ({today})", user.full_name());
        self.period_report(title, &user, today, today).await
    }

    pub async fn weekly_eow(&self, user: &UserRef) -> Result<String, CommandError> {
        let user = self.user(user).await?;
        let today = self.calendar.today;
        let from = self.calendar.trailing_start(EOW_DAYS);
        let title = format!(":book: EOW for {} ({from} - {today})", user.full_name());
        self.period_report(title, &user, from, today).await
    }
}
