//! In-memory tracker and chat directory used by the runtime's async tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use redbot_commands::tracker_types::{
    IdRef, Issue, Journal, JournalDetail, NamedRef, Project, TimeEntry, TrackerUser, Version,
};
use redbot_commands::{CalendarContext, IssueStatus, ReportTimezone, StatusTable};

use crate::bot_config::BotConfig;
use crate::chat_directory::{ChatDirectory, ChatUserProfile};
use crate::operation_context::OperationContext;
use crate::tracker_client::{
    AssigneeFilter, Impersonation, IssueQuery, IssueUpdate, NewIssue, NewTimeEntry, StatusFilter,
    TimeEntryQuery, TrackerClient,
};

const CLOSED_STATUS_IDS: [u64; 2] = [5, 6];

pub(crate) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()
}

pub(crate) fn day(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
}

fn user(id: u64, login: &str, firstname: &str, lastname: &str) -> TrackerUser {
    TrackerUser {
        id,
        login: login.to_string(),
        firstname: firstname.to_string(),
        lastname: lastname.to_string(),
        mail: None,
    }
}

fn project(id: u64, identifier: &str, name: &str) -> Project {
    Project {
        id,
        identifier: identifier.to_string(),
        name: name.to_string(),
    }
}

pub(crate) struct IssueSeed {
    pub id: u64,
    pub project: (u64, &'static str),
    pub status: (u64, &'static str),
    pub priority: u64,
    pub assignee: Option<(u64, &'static str)>,
    pub subject: &'static str,
    pub updated_day: u32,
    pub watchers: &'static [u64],
}

impl IssueSeed {
    pub(crate) fn build(&self) -> Issue {
        Issue {
            id: self.id,
            project: NamedRef::new(self.project.0, self.project.1),
            tracker: None,
            status: NamedRef::new(self.status.0, self.status.1),
            priority: NamedRef::new(self.priority, "Priority"),
            author: None,
            assigned_to: self
                .assignee
                .map(|(id, name)| NamedRef::new(id, name)),
            fixed_version: None,
            subject: self.subject.to_string(),
            description: None,
            start_date: None,
            due_date: None,
            done_ratio: 0,
            estimated_hours: None,
            spent_hours: None,
            created_on: at(1, 9),
            updated_on: at(self.updated_day, 9),
            journals: Vec::new(),
            watchers: self
                .watchers
                .iter()
                .map(|id| NamedRef::new(*id, "Watcher"))
                .collect(),
        }
    }
}

const OPS: (u64, &str) = (1, "Ops");
const TOP5: (u64, &str) = (9, "Top 5");
const NEW: (u64, &str) = (1, "New");
const IN_PROGRESS: (u64, &str) = (2, "In Progress");
const FEEDBACK: (u64, &str) = (4, "Feedback");
const CLOSED: (u64, &str) = (5, "Closed");
const ALICE: Option<(u64, &str)> = Some((3, "Alice Smith"));
const BOB: Option<(u64, &str)> = Some((4, "Bob Jones"));

fn standard_issues() -> Vec<Issue> {
    let seeds = [
        IssueSeed {
            id: 42,
            project: OPS,
            status: NEW,
            priority: 2,
            assignee: ALICE,
            subject: "Login page broken",
            updated_day: 17,
            watchers: &[],
        },
        IssueSeed {
            id: 43,
            project: OPS,
            status: IN_PROGRESS,
            priority: 3,
            assignee: ALICE,
            subject: "Deploy pipeline",
            updated_day: 18,
            watchers: &[],
        },
        IssueSeed {
            id: 44,
            project: OPS,
            status: FEEDBACK,
            priority: 2,
            assignee: ALICE,
            subject: "Review runbook",
            updated_day: 15,
            watchers: &[],
        },
        IssueSeed {
            id: 45,
            project: OPS,
            status: CLOSED,
            priority: 2,
            assignee: ALICE,
            subject: "Rotate keys",
            updated_day: 18,
            watchers: &[],
        },
        IssueSeed {
            id: 46,
            project: OPS,
            status: CLOSED,
            priority: 2,
            assignee: ALICE,
            subject: "Patch kernel",
            updated_day: 14,
            watchers: &[],
        },
        IssueSeed {
            id: 47,
            project: OPS,
            status: IN_PROGRESS,
            priority: 2,
            assignee: BOB,
            subject: "Migrate database",
            updated_day: 16,
            watchers: &[3],
        },
        IssueSeed {
            id: 48,
            project: OPS,
            status: NEW,
            priority: 2,
            assignee: None,
            subject: "Triage alerts",
            updated_day: 10,
            watchers: &[],
        },
        IssueSeed {
            id: 49,
            project: OPS,
            status: NEW,
            priority: 2,
            assignee: BOB,
            subject: "Pair on incident",
            updated_day: 18,
            watchers: &[],
        },
        IssueSeed {
            id: 50,
            project: TOP5,
            status: NEW,
            priority: 5,
            assignee: ALICE,
            subject: "Write quarterly plan",
            updated_day: 12,
            watchers: &[],
        },
        IssueSeed {
            id: 51,
            project: TOP5,
            status: NEW,
            priority: 3,
            assignee: ALICE,
            subject: "Learn Rust",
            updated_day: 12,
            watchers: &[],
        },
    ];
    let mut issues = seeds.iter().map(IssueSeed::build).collect::<Vec<_>>();
    if let Some(first) = issues.first_mut() {
        first.description = Some("Users cannot sign in".to_string());
        first.journals = vec![Journal {
            id: 1,
            user: Some(NamedRef::new(4, "Bob Jones")),
            notes: Some("looking into it".to_string()),
            created_on: at(17, 10),
            details: vec![
                JournalDetail {
                    property: "attr".to_string(),
                    name: "status_id".to_string(),
                    old_value: Some("1".to_string()),
                    new_value: Some("2".to_string()),
                },
                JournalDetail {
                    property: "attr".to_string(),
                    name: "project_id".to_string(),
                    old_value: Some("1".to_string()),
                    new_value: Some("9".to_string()),
                },
            ],
        }];
    }
    issues
}

pub(crate) fn logged(id: u64, issue_id: Option<u64>, hours: f64, spent_day: u32) -> TimeEntry {
    TimeEntry {
        id,
        project: NamedRef::new(1, "Ops"),
        issue: issue_id.map(|id| IdRef { id }),
        user: NamedRef::new(3, "Alice Smith"),
        activity: None,
        hours,
        spent_on: day(spent_day),
        comments: None,
    }
}

#[derive(Default)]
struct FakeState {
    users: Vec<TrackerUser>,
    projects: Vec<Project>,
    versions: Vec<(u64, Version)>,
    issues: Vec<Issue>,
    logged: Vec<TimeEntry>,
    user_lookups: Vec<String>,
    issue_queries: Vec<IssueQuery>,
    created: Vec<(String, NewIssue)>,
    updates: Vec<(String, u64, IssueUpdate)>,
    time_entries: Vec<(String, NewTimeEntry)>,
    fail_updates: bool,
    fail_time_entries: bool,
    fail_queries: bool,
}

/// Tracker double that evaluates queries over seeded records and records writes.
#[derive(Default)]
pub(crate) struct FakeTracker {
    state: Mutex<FakeState>,
}

impl FakeTracker {
    pub(crate) fn with_users(users: &[(u64, &str, &str, &str)]) -> Self {
        let tracker = Self::default();
        tracker.state().users = users
            .iter()
            .map(|(id, login, first, last)| user(*id, login, first, last))
            .collect();
        tracker
    }

    pub(crate) fn standard() -> Self {
        let tracker = Self::with_users(&[(3, "alice", "Alice", "Smith"), (4, "bob", "Bob", "Jones")]);
        {
            let mut state = tracker.state();
            state.projects = vec![project(1, "ops", "Ops"), project(9, "top5", "Top 5")];
            state.versions = vec![(
                1,
                Version {
                    id: 20,
                    name: "1.2".to_string(),
                    status: Some("open".to_string()),
                },
            )];
            state.issues = standard_issues();
            state.logged = vec![
                logged(1, Some(45), 3.0, 18),
                logged(2, Some(49), 2.0, 18),
                logged(3, Some(46), 1.0, 14),
                logged(4, Some(43), 0.5, 13),
            ];
        }
        tracker
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake tracker lock")
    }

    pub(crate) fn add_time_entry(&self, entry: TimeEntry) {
        self.state().logged.push(entry);
    }

    pub(crate) fn fail_updates(&self) {
        self.state().fail_updates = true;
    }

    pub(crate) fn fail_time_entries(&self) {
        self.state().fail_time_entries = true;
    }

    pub(crate) fn fail_queries(&self) {
        self.state().fail_queries = true;
    }

    pub(crate) fn user_lookups(&self) -> Vec<String> {
        self.state().user_lookups.clone()
    }

    pub(crate) fn issue_queries(&self) -> Vec<IssueQuery> {
        self.state().issue_queries.clone()
    }

    pub(crate) fn created_issues(&self) -> Vec<(String, NewIssue)> {
        self.state().created.clone()
    }

    pub(crate) fn updates(&self) -> Vec<(String, u64, IssueUpdate)> {
        self.state().updates.clone()
    }

    pub(crate) fn time_entries(&self) -> Vec<(String, NewTimeEntry)> {
        self.state().time_entries.clone()
    }
}

fn project_matches(projects: &[Project], key: &str, project_id: u64) -> bool {
    projects
        .iter()
        .find(|project| project.identifier == key || project.id.to_string() == key)
        .is_some_and(|project| project.id == project_id)
}

fn issue_matches(issue: &Issue, query: &IssueQuery, projects: &[Project]) -> bool {
    let status_ok = match query.status {
        StatusFilter::Open => !CLOSED_STATUS_IDS.contains(&issue.status.id),
        StatusFilter::Id(id) => issue.status.id == id,
    };
    let assignee_ok = match query.assignee {
        AssigneeFilter::Any => true,
        AssigneeFilter::User(id) => issue.is_assigned_to(id),
        AssigneeFilter::Unassigned => issue.assigned_to.is_none(),
    };
    let project_ok = query
        .project
        .as_deref()
        .is_none_or(|key| project_matches(projects, key, issue.project.id));
    let updated_ok = query.updated_between.is_none_or(|(from, to)| {
        let updated = issue.updated_on.date_naive();
        from <= updated && updated <= to
    });
    let watcher_ok = query
        .watcher_id
        .is_none_or(|id| issue.watchers.iter().any(|watcher| watcher.id == id));
    status_ok && assignee_ok && project_ok && updated_ok && watcher_ok
}

#[async_trait]
impl TrackerClient for FakeTracker {
    async fn find_user(&self, name: &str) -> Result<Option<TrackerUser>> {
        let mut state = self.state();
        state.user_lookups.push(name.to_string());
        let wanted = name.trim().to_lowercase();
        Ok(state
            .users
            .iter()
            .find(|user| {
                [
                    user.login.to_lowercase(),
                    user.firstname.to_lowercase(),
                    user.lastname.to_lowercase(),
                    user.full_name().to_lowercase(),
                ]
                .contains(&wanted)
            })
            .cloned())
    }

    async fn find_project(&self, key: &str) -> Result<Option<Project>> {
        Ok(self
            .state()
            .projects
            .iter()
            .find(|project| project.identifier == key || project.id.to_string() == key)
            .cloned())
    }

    async fn find_version(&self, project: &Project, name: &str) -> Result<Option<Version>> {
        Ok(self
            .state()
            .versions
            .iter()
            .find(|(project_id, version)| {
                *project_id == project.id && version.name.eq_ignore_ascii_case(name)
            })
            .map(|(_, version)| version.clone()))
    }

    async fn find_issue(&self, issue_id: u64) -> Result<Option<Issue>> {
        Ok(self
            .state()
            .issues
            .iter()
            .find(|issue| issue.id == issue_id)
            .cloned())
    }

    async fn query_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>> {
        let mut state = self.state();
        if state.fail_queries {
            bail!("redmine api query issues failed with status 503: unavailable");
        }
        state.issue_queries.push(query.clone());
        Ok(state
            .issues
            .iter()
            .filter(|issue| issue_matches(issue, query, &state.projects))
            .cloned()
            .collect())
    }

    async fn query_time_entries(&self, query: &TimeEntryQuery) -> Result<Vec<TimeEntry>> {
        let state = self.state();
        if state.fail_queries {
            bail!("redmine api query time entries failed with status 503: unavailable");
        }
        Ok(state
            .logged
            .iter()
            .filter(|entry| {
                entry.user.id == query.user_id
                    && query.from <= entry.spent_on
                    && entry.spent_on <= query.to
            })
            .cloned()
            .collect())
    }

    async fn create_issue(&self, acting: &Impersonation, issue: &NewIssue) -> Result<Issue> {
        let mut state = self.state();
        if state.fail_updates {
            bail!("redmine api create issue failed with status 422: invalid");
        }
        state.created.push((acting.login().to_string(), issue.clone()));
        let id = 100 + state.created.len() as u64;
        let project = state
            .projects
            .iter()
            .find(|project| project.id == issue.project_id)
            .map(|project| NamedRef::new(project.id, project.name.clone()))
            .ok_or_else(|| anyhow!("unknown project {}", issue.project_id))?;
        let assignee = issue.assigned_to_id.and_then(|id| {
            state
                .users
                .iter()
                .find(|user| user.id == id)
                .map(|user| NamedRef::new(user.id, user.full_name()))
        });
        let created = Issue {
            id,
            project,
            tracker: None,
            status: NamedRef::new(1, "New"),
            priority: NamedRef::new(issue.priority_id.unwrap_or(2), "Priority"),
            author: None,
            assigned_to: assignee,
            fixed_version: None,
            subject: issue.subject.clone(),
            description: None,
            start_date: None,
            due_date: None,
            done_ratio: 0,
            estimated_hours: issue.estimated_hours,
            spent_hours: None,
            created_on: at(18, 9),
            updated_on: at(18, 9),
            journals: Vec::new(),
            watchers: Vec::new(),
        };
        state.issues.push(created.clone());
        Ok(created)
    }

    async fn update_issue(
        &self,
        acting: &Impersonation,
        issue_id: u64,
        update: &IssueUpdate,
    ) -> Result<()> {
        let mut state = self.state();
        if state.fail_updates {
            bail!("redmine api update issue failed with status 422: invalid");
        }
        state
            .updates
            .push((acting.login().to_string(), issue_id, update.clone()));
        Ok(())
    }

    async fn create_time_entry(&self, acting: &Impersonation, entry: &NewTimeEntry) -> Result<()> {
        let mut state = self.state();
        if state.fail_time_entries {
            bail!("redmine api create time entry failed with status 422: invalid");
        }
        state
            .time_entries
            .push((acting.login().to_string(), entry.clone()));
        Ok(())
    }
}

fn profile(user_id: &str, real: &str, first: &str, last: &str, user_name: &str) -> ChatUserProfile {
    ChatUserProfile {
        user_id: user_id.to_string(),
        real_name: Some(real.to_string()),
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        display_name: None,
        user_name: Some(user_name.to_string()),
    }
}

pub(crate) struct FakeDirectory {
    profiles: BTreeMap<String, ChatUserProfile>,
    available: bool,
}

impl FakeDirectory {
    pub(crate) fn alice() -> Self {
        let profiles = [
            profile("UALICE", "Alice Smith", "Alice", "Smith", "alice"),
            profile("UBOB", "Bob Jones", "Bob", "Jones", "bob"),
        ];
        Self {
            profiles: profiles
                .into_iter()
                .map(|profile| (profile.user_id.clone(), profile))
                .collect(),
            available: true,
        }
    }

    pub(crate) fn stranger() -> Self {
        let stranger = profile("UALICE", "Mallory Stranger", "Mallory", "Stranger", "mallory");
        Self {
            profiles: BTreeMap::from([(stranger.user_id.clone(), stranger)]),
            available: true,
        }
    }

    pub(crate) fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::alice()
        }
    }
}

#[async_trait]
impl ChatDirectory for FakeDirectory {
    async fn fetch_user_profile(&self, user_id: &str) -> Result<ChatUserProfile> {
        if !self.available {
            bail!("slack users.info failed: ratelimited");
        }
        self.profiles
            .get(user_id)
            .cloned()
            .ok_or_else(|| anyhow!("slack users.info failed: user_not_found"))
    }

    async fn fetch_directory(&self) -> Result<BTreeMap<String, String>> {
        if !self.available {
            bail!("slack users.list failed: ratelimited");
        }
        Ok(self
            .profiles
            .values()
            .filter_map(|profile| {
                profile
                    .mention_name()
                    .map(|name| (profile.user_id.clone(), name.to_string()))
            })
            .collect())
    }
}

pub(crate) fn test_config() -> BotConfig {
    let mut config = BotConfig::new(
        "https://redmine.example.com/",
        StatusTable::new([
            (IssueStatus::New, 1),
            (IssueStatus::InProgress, 2),
            (IssueStatus::Resolved, 3),
            (IssueStatus::Feedback, 4),
            (IssueStatus::Closed, 5),
            (IssueStatus::Rejected, 6),
            (IssueStatus::Hold, 7),
        ]),
    );
    config.default_project = Some("ops".to_string());
    config.top5_project = Some("top5".to_string());
    config.activity_id = Some(9);
    config.timezone = ReportTimezone::parse("UTC").expect("utc zone");
    config
}

pub(crate) fn test_calendar(config: &BotConfig) -> CalendarContext {
    CalendarContext::new(day(18), config.timezone)
}

/// Fixed collaborators for one test, with "today" pinned to 2026-10-18.
pub(crate) struct TestBed {
    pub config: BotConfig,
    pub tracker: FakeTracker,
    pub directory: FakeDirectory,
}

impl TestBed {
    pub(crate) fn new(tracker: FakeTracker, directory: FakeDirectory) -> Self {
        Self {
            config: test_config(),
            tracker,
            directory,
        }
    }

    pub(crate) fn standard() -> Self {
        Self::new(FakeTracker::standard(), FakeDirectory::alice())
    }
}

pub(crate) fn context(bed: &TestBed) -> OperationContext<'_> {
    OperationContext {
        config: &bed.config,
        tracker: &bed.tracker,
        directory: &bed.directory,
        chat_user_id: "UALICE",
        calendar: test_calendar(&bed.config),
    }
}
