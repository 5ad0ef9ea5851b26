//! Tracker collaborator boundary: lookups, issue queries and impersonated writes.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use redbot_commands::tracker_types::{Issue, Project, TimeEntry, TrackerUser, Version};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssigneeFilter {
    #[default]
    Any,
    User(u64),
    Unassigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    Open,
    Id(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Predicate for the issue query primitive every list and report builds on.
pub struct IssueQuery {
    pub assignee: AssigneeFilter,
    pub status: StatusFilter,
    pub project: Option<String>,
    pub updated_between: Option<(NaiveDate, NaiveDate)>,
    pub watcher_id: Option<u64>,
}

impl IssueQuery {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn assigned_to(mut self, user_id: u64) -> Self {
        self.assignee = AssigneeFilter::User(user_id);
        self
    }

    pub fn unassigned(mut self) -> Self {
        self.assignee = AssigneeFilter::Unassigned;
        self
    }

    pub fn with_status_id(mut self, status_id: u64) -> Self {
        self.status = StatusFilter::Id(status_id);
        self
    }

    pub fn in_project(mut self, project: Option<&str>) -> Self {
        self.project = project.map(ToOwned::to_owned);
        self
    }

    pub fn updated_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.updated_between = Some((from, to));
        self
    }

    pub fn watched_by(mut self, user_id: u64) -> Self {
        self.watcher_id = Some(user_id);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeEntryQuery {
    pub user_id: u64,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIssue {
    pub project_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_id: Option<u64>,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_version_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
/// Sparse issue update: absent fields are left untouched by the tracker.
pub struct IssueUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_ratio: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTimeEntry {
    pub issue_id: u64,
    pub hours: f64,
    pub spent_on: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Authority to write on behalf of a resolved tracker user.
///
/// Only constructible from a [`TrackerUser`], so no write can happen before
/// the acting user has been looked up.
pub struct Impersonation {
    login: String,
}

impl Impersonation {
    pub fn of(user: &TrackerUser) -> Self {
        Self {
            login: user.login.clone(),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }
}

#[async_trait]
pub trait TrackerClient: Send + Sync {
    async fn find_user(&self, name: &str) -> Result<Option<TrackerUser>>;

    /// Looks a project up by identifier or numeric id.
    async fn find_project(&self, key: &str) -> Result<Option<Project>>;

    async fn find_version(&self, project: &Project, name: &str) -> Result<Option<Version>>;

    /// Fetches an issue including its journals and watchers.
    async fn find_issue(&self, issue_id: u64) -> Result<Option<Issue>>;

    async fn query_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>>;

    async fn query_time_entries(&self, query: &TimeEntryQuery) -> Result<Vec<TimeEntry>>;

    async fn create_issue(&self, acting: &Impersonation, issue: &NewIssue) -> Result<Issue>;

    async fn update_issue(
        &self,
        acting: &Impersonation,
        issue_id: u64,
        update: &IssueUpdate,
    ) -> Result<()>;

    async fn create_time_entry(&self, acting: &Impersonation, entry: &NewTimeEntry) -> Result<()>;
}
