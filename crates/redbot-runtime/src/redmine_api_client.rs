//! Redmine REST client implementing the tracker collaborator.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use redbot_commands::tracker_types::{Issue, Project, TimeEntry, TrackerUser, Version};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::tracker_client::{
    AssigneeFilter, Impersonation, IssueQuery, IssueUpdate, NewIssue, NewTimeEntry, StatusFilter,
    TimeEntryQuery, TrackerClient,
};
use crate::transport_helpers::truncate_for_error;

const PAGE_SIZE: usize = 100;
const API_KEY_HEADER: &str = "x-redmine-api-key";
const SWITCH_USER_HEADER: &str = "x-redmine-switch-user";

#[derive(Debug, Deserialize)]
struct UsersResponse {
    #[serde(default)]
    users: Vec<TrackerUser>,
}

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    project: Project,
}

#[derive(Debug, Deserialize)]
struct VersionsResponse {
    #[serde(default)]
    versions: Vec<Version>,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    issue: Issue,
}

#[derive(Debug, Deserialize)]
struct IssuesResponse {
    #[serde(default)]
    issues: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
struct TimeEntriesResponse {
    #[serde(default)]
    time_entries: Vec<TimeEntry>,
}

#[derive(Clone)]
pub struct RedmineApiClient {
    http: reqwest::Client,
    api_base: String,
}

pub(crate) fn issue_query_pairs(query: &IssueQuery) -> Vec<(String, String)> {
    let mut pairs = vec![(
        "status_id".to_string(),
        match query.status {
            StatusFilter::Open => "open".to_string(),
            StatusFilter::Id(id) => id.to_string(),
        },
    )];
    match query.assignee {
        AssigneeFilter::Any => {}
        AssigneeFilter::User(id) => pairs.push(("assigned_to_id".to_string(), id.to_string())),
        AssigneeFilter::Unassigned => pairs.push(("assigned_to_id".to_string(), "!*".to_string())),
    }
    if let Some(project) = query.project.as_deref() {
        pairs.push(("project_id".to_string(), project.to_string()));
    }
    if let Some((from, to)) = query.updated_between {
        pairs.push(("updated_on".to_string(), format!("><{from}|{to}")));
    }
    if let Some(watcher_id) = query.watcher_id {
        pairs.push(("watcher_id".to_string(), watcher_id.to_string()));
    }
    pairs.push(("sort".to_string(), "project,id".to_string()));
    pairs
}

impl RedmineApiClient {
    pub fn new(api_base: String, api_key: String, request_timeout_ms: u64) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("redbot"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            API_KEY_HEADER,
            reqwest::header::HeaderValue::from_str(api_key.trim())
                .context("invalid redmine api key header")?,
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create redmine api client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    /// GET returning `None` on 404.
    async fn get_json<T>(
        &self,
        operation: &str,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        tracing::debug!(operation, path, "redmine request");
        let response = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .with_context(|| format!("redmine api {operation} request failed"))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "redmine api {operation} failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 800)
            );
        }
        let parsed = response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode redmine {operation}"))?;
        Ok(Some(parsed))
    }

    async fn get_paginated<T, R, F>(
        &self,
        operation: &str,
        path: &str,
        query: &[(String, String)],
        extract: F,
    ) -> Result<Vec<T>>
    where
        R: DeserializeOwned,
        F: Fn(R) -> Vec<T>,
    {
        let mut offset = 0_usize;
        let mut rows = Vec::new();
        loop {
            let mut page_query = query.to_vec();
            page_query.push(("limit".to_string(), PAGE_SIZE.to_string()));
            page_query.push(("offset".to_string(), offset.to_string()));
            let Some(page) = self.get_json::<R>(operation, path, &page_query).await? else {
                bail!("redmine api {operation} returned not found");
            };
            let chunk = extract(page);
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < PAGE_SIZE {
                break;
            }
            offset = offset.saturating_add(PAGE_SIZE);
        }
        Ok(rows)
    }

    /// Impersonated write; returns the response body when there is one.
    async fn write_json(
        &self,
        operation: &str,
        method: reqwest::Method,
        path: &str,
        acting: &Impersonation,
        body: serde_json::Value,
    ) -> Result<Option<serde_json::Value>> {
        tracing::debug!(operation, path, acting = acting.login(), "redmine write");
        let response = self
            .http
            .request(method, self.url(path))
            .header(SWITCH_USER_HEADER, acting.login())
            .json(&body)
            .send()
            .await
            .with_context(|| format!("redmine api {operation} request failed"))?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!(
                "redmine api {operation} failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&text, 800)
            );
        }
        if text.trim().is_empty() {
            return Ok(None);
        }
        let value = serde_json::from_str(&text)
            .with_context(|| format!("failed to decode redmine {operation}"))?;
        Ok(Some(value))
    }
}

#[async_trait]
impl TrackerClient for RedmineApiClient {
    async fn find_user(&self, name: &str) -> Result<Option<TrackerUser>> {
        let query = [("name".to_string(), name.trim().to_string())];
        let response = self
            .get_json::<UsersResponse>("find user", "users.json", &query)
            .await?;
        Ok(response.and_then(|response| response.users.into_iter().next()))
    }

    async fn find_project(&self, key: &str) -> Result<Option<Project>> {
        let path = format!("projects/{}.json", key.trim());
        let response = self
            .get_json::<ProjectResponse>("find project", &path, &[])
            .await?;
        Ok(response.map(|response| response.project))
    }

    async fn find_version(&self, project: &Project, name: &str) -> Result<Option<Version>> {
        let path = format!("projects/{}/versions.json", project.id);
        let response = self
            .get_json::<VersionsResponse>("list versions", &path, &[])
            .await?;
        let wanted = name.trim().to_lowercase();
        Ok(response.and_then(|response| {
            response
                .versions
                .into_iter()
                .find(|version| version.name.to_lowercase() == wanted)
        }))
    }

    async fn find_issue(&self, issue_id: u64) -> Result<Option<Issue>> {
        let path = format!("issues/{issue_id}.json");
        let query = [("include".to_string(), "journals,watchers".to_string())];
        let response = self
            .get_json::<IssueResponse>("find issue", &path, &query)
            .await?;
        Ok(response.map(|response| response.issue))
    }

    async fn query_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>> {
        self.get_paginated(
            "query issues",
            "issues.json",
            &issue_query_pairs(query),
            |page: IssuesResponse| page.issues,
        )
        .await
    }

    async fn query_time_entries(&self, query: &TimeEntryQuery) -> Result<Vec<TimeEntry>> {
        let pairs = vec![
            ("user_id".to_string(), query.user_id.to_string()),
            ("from".to_string(), query.from.to_string()),
            ("to".to_string(), query.to.to_string()),
        ];
        self.get_paginated(
            "query time entries",
            "time_entries.json",
            &pairs,
            |page: TimeEntriesResponse| page.time_entries,
        )
        .await
    }

    async fn create_issue(&self, acting: &Impersonation, issue: &NewIssue) -> Result<Issue> {
        let body = self
            .write_json(
                "create issue",
                reqwest::Method::POST,
                "issues.json",
                acting,
                json!({ "issue": issue }),
            )
            .await?
            .context("redmine create issue returned an empty body")?;
        let created = serde_json::from_value::<IssueResponse>(body)
            .context("failed to decode created redmine issue")?;
        Ok(created.issue)
    }

    async fn update_issue(
        &self,
        acting: &Impersonation,
        issue_id: u64,
        update: &IssueUpdate,
    ) -> Result<()> {
        let path = format!("issues/{issue_id}.json");
        self.write_json(
            "update issue",
            reqwest::Method::PUT,
            &path,
            acting,
            json!({ "issue": update }),
        )
        .await?;
        Ok(())
    }

    async fn create_time_entry(&self, acting: &Impersonation, entry: &NewTimeEntry) -> Result<()> {
        self.write_json(
            "create time entry",
            reqwest::Method::POST,
            "time_entries.json",
            acting,
            json!({ "time_entry": entry }),
        )
        .await?;
        Ok(())
    }
}
