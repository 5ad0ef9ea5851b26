use std::{collections::BTreeMap, sync::Arc};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use httpmock::prelude::*;
use redbot_commands::{CalendarContext, IssueStatus, ReportTimezone, StatusTable};
use redbot_runtime::{
    BotConfig, ChatDirectory, ChatUserProfile, CommandDispatcher, RedmineApiClient,
};
use serde_json::{json, Value};
use tokio::sync::Mutex as AsyncMutex;

struct ScriptedDirectory {
    profiles: BTreeMap<String, ChatUserProfile>,
    lookups: AsyncMutex<Vec<String>>,
}

impl ScriptedDirectory {
    fn new(profiles: Vec<ChatUserProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|profile| (profile.user_id.clone(), profile))
                .collect(),
            lookups: AsyncMutex::new(Vec::new()),
        }
    }

    fn alice() -> Self {
        Self::new(vec![ChatUserProfile {
            user_id: "UALICE".to_string(),
            real_name: Some("Alice Smith".to_string()),
            first_name: Some("Alice".to_string()),
            last_name: Some("Smith".to_string()),
            display_name: Some("alice".to_string()),
            user_name: Some("alice".to_string()),
        }])
    }

    async fn lookup_count(&self) -> usize {
        self.lookups.lock().await.len()
    }
}

#[async_trait]
impl ChatDirectory for ScriptedDirectory {
    async fn fetch_user_profile(&self, user_id: &str) -> Result<ChatUserProfile> {
        self.lookups.lock().await.push(user_id.to_string());
        self.profiles
            .get(user_id)
            .cloned()
            .ok_or_else(|| anyhow!("user_not_found"))
    }

    async fn fetch_directory(&self) -> Result<BTreeMap<String, String>> {
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

struct RedmineHarness {
    server: MockServer,
    directory: Arc<ScriptedDirectory>,
    dispatcher: CommandDispatcher,
}

impl RedmineHarness {
    fn new() -> Self {
        let server = MockServer::start();
        let mut config = BotConfig::new(
            "https://redmine.example.com",
            StatusTable::new([
                (IssueStatus::New, 1),
                (IssueStatus::InProgress, 2),
                (IssueStatus::Closed, 5),
            ]),
        );
        config.default_project = Some("ops".to_string());
        config.activity_id = Some(9);
        config.timezone = ReportTimezone::parse("UTC").expect("utc zone");
        let client = RedmineApiClient::new(server.base_url(), "admin-key".to_string(), 2_000)
            .expect("redmine client");
        let directory = Arc::new(ScriptedDirectory::alice());
        let dispatcher = CommandDispatcher::new(Arc::new(config), Arc::new(client), directory.clone());
        Self {
            server,
            directory,
            dispatcher,
        }
    }

    async fn send(&self, text: &str) -> String {
        let timezone = ReportTimezone::parse("UTC").expect("utc zone");
        let calendar = CalendarContext::new(today(), timezone);
        self.dispatcher.dispatch_at("UALICE", text, calendar).await
    }

    fn mock_user(&self, name: &str, id: u64, login: &str, first: &str, last: &str) {
        self.server.mock(|when, then| {
            when.method(GET)
                .path("/users.json")
                .query_param("name", name)
                .header("x-redmine-api-key", "admin-key");
            then.status(200).json_body(json!({
                "users": [{"id": id, "login": login, "firstname": first, "lastname": last}],
                "total_count": 1
            }));
        });
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).expect("date")
}

fn issue_json(id: u64, status: (u64, &str), assignee: (u64, &str), subject: &str) -> Value {
    json!({
        "id": id,
        "project": {"id": 1, "name": "Ops"},
        "tracker": {"id": 1, "name": "Bug"},
        "status": {"id": status.0, "name": status.1},
        "priority": {"id": 2, "name": "Normal"},
        "author": {"id": 3, "name": "Alice Smith"},
        "assigned_to": {"id": assignee.0, "name": assignee.1},
        "subject": subject,
        "done_ratio": 0,
        "created_on": "2026-10-01T08:00:00Z",
        "updated_on": "2026-10-18T09:30:00Z"
    })
}

#[tokio::test]
async fn integration_close_with_recorded_hours_writes_update_and_time_entry_as_requester() {
    let harness = RedmineHarness::new();
    harness.mock_user("Alice Smith", 3, "alice", "Alice", "Smith");
    let lookup = harness.server.mock(|when, then| {
        when.method(GET)
            .path("/issues/42.json")
            .query_param("include", "journals,watchers");
        then.status(200).json_body(json!({
            "issue": issue_json(42, (2, "In Progress"), (3, "Alice Smith"), "Login page broken")
        }));
    });
    let update = harness.server.mock(|when, then| {
        when.method(PUT)
            .path("/issues/42.json")
            .header("x-redmine-switch-user", "alice")
            .json_body(json!({"issue": {
                "notes": "shipped !1.5h",
                "status_id": 5,
                "done_ratio": 100,
                "due_date": "2026-10-18"
            }}));
        then.status(204);
    });
    let entry = harness.server.mock(|when, then| {
        when.method(POST)
            .path("/time_entries.json")
            .header("x-redmine-switch-user", "alice")
            .json_body(json!({"time_entry": {
                "issue_id": 42,
                "hours": 1.5,
                "spent_on": "2026-10-18",
                "activity_id": 9
            }}));
        then.status(201).json_body(json!({"time_entry": {"id": 900}}));
    });

    let reply = harness.send("close 42 shipped !1.5h").await;

    assert_eq!(
        reply,
        "<@UALICE> :white_check_mark: Closed <https://redmine.example.com/issues/42|#42 Login page broken> with comment `shipped !1.5h` :stopwatch: 1.5h recorded"
    );
    lookup.assert_calls(1);
    update.assert_calls(1);
    entry.assert_calls(1);
    assert_eq!(harness.directory.lookup_count().await, 1);
}

#[tokio::test]
async fn integration_issueto_creates_issue_in_default_project_for_named_assignee() {
    let harness = RedmineHarness::new();
    harness.mock_user("Alice Smith", 3, "alice", "Alice", "Smith");
    harness.mock_user("bob", 4, "bob", "Bob", "Jones");
    let project = harness.server.mock(|when, then| {
        when.method(GET).path("/projects/ops.json");
        then.status(200).json_body(json!({
            "project": {"id": 1, "identifier": "ops", "name": "Ops"}
        }));
    });
    let create = harness.server.mock(|when, then| {
        when.method(POST)
            .path("/issues.json")
            .header("x-redmine-switch-user", "alice")
            .body_includes("\"project_id\":1")
            .body_includes("\"assigned_to_id\":4")
            .body_includes("\"subject\":\"Fix login redirect\"")
            .body_includes("\"estimated_hours\":2.0");
        then.status(201).json_body(json!({
            "issue": issue_json(77, (1, "New"), (4, "Bob Jones"), "Fix login redirect")
        }));
    });

    let reply = harness.send("issueto bob Fix login redirect $2h").await;

    assert_eq!(
        reply,
        "<@UALICE> :white_check_mark: Created <https://redmine.example.com/issues/77|#77 Fix login redirect> in *Ops* for Bob Jones"
    );
    project.assert_calls(1);
    create.assert_calls(1);
}

#[tokio::test]
async fn integration_eod_report_groups_sections_and_totals_logged_hours() {
    let harness = RedmineHarness::new();
    harness.mock_user("Alice Smith", 3, "alice", "Alice", "Smith");
    let closed = harness.server.mock(|when, then| {
        when.method(GET)
            .path("/issues.json")
            .query_param("status_id", "5")
            .query_param("assigned_to_id", "3")
            .query_param("updated_on", "><2026-10-18|2026-10-18");
        then.status(200).json_body(json!({
            "issues": [issue_json(45, (5, "Closed"), (3, "Alice Smith"), "Rotate keys")]
        }));
    });
    let in_progress = harness.server.mock(|when, then| {
        when.method(GET)
            .path("/issues.json")
            .query_param("status_id", "2")
            .query_param("assigned_to_id", "3");
        then.status(200).json_body(json!({
            "issues": [issue_json(43, (2, "In Progress"), (3, "Alice Smith"), "Deploy pipeline")]
        }));
    });
    harness.server.mock(|when, then| {
        when.method(GET)
            .path("/issues.json")
            .query_param("status_id", "1")
            .query_param("assigned_to_id", "3");
        then.status(200).json_body(json!({"issues": []}));
    });
    harness.server.mock(|when, then| {
        when.method(GET)
            .path("/issues.json")
            .query_param("status_id", "open")
            .query_param("watcher_id", "3");
        then.status(200).json_body(json!({"issues": []}));
    });
    let entries = harness.server.mock(|when, then| {
        when.method(GET)
            .path("/time_entries.json")
            .query_param("user_id", "3")
            .query_param("from", "2026-10-18")
            .query_param("to", "2026-10-18");
        then.status(200).json_body(json!({"time_entries": [
            {
                "id": 1,
                "project": {"id": 1, "name": "Ops"},
                "issue": {"id": 45},
                "user": {"id": 3, "name": "Alice Smith"},
                "hours": 3.0,
                "spent_on": "2026-10-18"
            },
            {
                "id": 2,
                "project": {"id": 1, "name": "Ops"},
                "issue": {"id": 49},
                "user": {"id": 3, "name": "Alice Smith"},
                "hours": 2.0,
                "spent_on": "2026-10-18"
            }
        ]}));
    });
    let contribution = harness.server.mock(|when, then| {
        when.method(GET).path("/issues/49.json");
        then.status(200).json_body(json!({
            "issue": issue_json(49, (1, "New"), (4, "Bob Jones"), "Pair on incident")
        }));
    });

    let reply = harness.send("eod").await;

    assert!(
        reply.starts_with("<@UALICE> :book: EOD for Alice Smith (2026-10-18)"),
        "{reply}"
    );
    assert!(reply.contains("*Closed* (1)"));
    assert!(reply
        .lines()
        .any(|line| line.contains("|#45 Rotate keys>") && line.ends_with(":stopwatch: 3h")));
    assert!(reply.contains("*In Progress* (1)"));
    assert!(reply.contains("|#43 Deploy pipeline>"));
    assert!(!reply.contains("*New*"));
    assert!(reply.contains("*Contributions to other issues*"));
    assert!(reply.contains("|#49 Pair on incident> :stopwatch: 2h"));
    assert!(reply.ends_with("*Total:* 5h"));
    closed.assert_calls(1);
    in_progress.assert_calls(1);
    entries.assert_calls(1);
    contribution.assert_calls(1);
}

#[tokio::test]
async fn regression_tracker_failures_reply_with_a_single_error_line() {
    let harness = RedmineHarness::new();
    harness.mock_user("Alice Smith", 3, "alice", "Alice", "Smith");
    harness.server.mock(|when, then| {
        when.method(GET).path("/issues/404.json");
        then.status(404);
    });
    harness.server.mock(|when, then| {
        when.method(GET).path("/issues/42.json");
        then.status(200).json_body(json!({
            "issue": issue_json(42, (1, "New"), (3, "Alice Smith"), "Login page broken")
        }));
    });
    let rejected = harness.server.mock(|when, then| {
        when.method(PUT).path("/issues/42.json");
        then.status(422)
            .json_body(json!({"errors": ["Status is invalid"]}));
    });

    assert_eq!(
        harness.send("show 404").await,
        "<@UALICE> :x: Issue `#404` not found"
    );
    assert_eq!(
        harness.send("update 42 more work").await,
        "<@UALICE> :x: Issue update failed"
    );
    rejected.assert_calls(1);
}

#[tokio::test]
async fn regression_unknown_requester_blocks_writes() {
    let harness = RedmineHarness::new();
    harness.server.mock(|when, then| {
        when.method(GET).path("/users.json");
        then.status(200)
            .json_body(json!({"users": [], "total_count": 0}));
    });
    let update = harness.server.mock(|when, then| {
        when.method(PUT).path("/issues/42.json");
        then.status(204);
    });

    let reply = harness.send("update 42 more work").await;

    assert_eq!(
        reply,
        "<@UALICE> :x: Could not find you in the tracker (tried `Alice Smith`, `Smith`, `Alice`, `alice`)"
    );
    update.assert_calls(0);
}
