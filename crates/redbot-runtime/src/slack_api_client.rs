//! Slack Web API client: socket handshake, bot identity, user directory and
//! reply posting.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::chat_directory::{ChatDirectory, ChatUserProfile};
use crate::transport_helpers::truncate_for_error;

const USERS_LIST_PAGE_SIZE: &str = "200";

#[derive(Debug, Clone, Deserialize)]
struct SlackAuthTestResponse {
    ok: bool,
    user_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackOpenSocketResponse {
    ok: bool,
    url: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackChatMessageResponse {
    ok: bool,
    error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SlackProfile {
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackUser {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    profile: SlackProfile,
}

impl SlackUser {
    fn into_profile(self) -> ChatUserProfile {
        ChatUserProfile {
            user_id: self.id,
            real_name: self.profile.real_name.or(self.real_name),
            first_name: self.profile.first_name,
            last_name: self.profile.last_name,
            display_name: self.profile.display_name,
            user_name: self.name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SlackUserInfoResponse {
    ok: bool,
    user: Option<SlackUser>,
    error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SlackResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackUsersListResponse {
    ok: bool,
    #[serde(default)]
    members: Vec<SlackUser>,
    #[serde(default)]
    response_metadata: SlackResponseMetadata,
    error: Option<String>,
}

fn slack_error(error: Option<String>) -> String {
    error.unwrap_or_else(|| "unknown error".to_string())
}

#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    app_token: String,
    bot_token: String,
}

impl SlackApiClient {
    pub fn new(
        api_base: String,
        app_token: String,
        bot_token: String,
        request_timeout_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("redbot"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create slack api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            app_token: app_token.trim().to_string(),
            bot_token: bot_token.trim().to_string(),
        })
    }

    pub async fn resolve_bot_user_id(&self) -> Result<String> {
        let response: SlackAuthTestResponse = self
            .request_json(
                "auth.test",
                self.http
                    .post(format!("{}/auth.test", self.api_base))
                    .bearer_auth(&self.bot_token),
            )
            .await?;
        if !response.ok {
            bail!("slack auth.test failed: {}", slack_error(response.error));
        }
        response
            .user_id
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack auth.test did not return user_id"))
    }

    pub async fn open_socket_connection(&self) -> Result<String> {
        let response: SlackOpenSocketResponse = self
            .request_json(
                "apps.connections.open",
                self.http
                    .post(format!("{}/apps.connections.open", self.api_base))
                    .bearer_auth(&self.app_token),
            )
            .await?;
        if !response.ok {
            bail!(
                "slack apps.connections.open failed: {}",
                slack_error(response.error)
            );
        }
        response
            .url
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack apps.connections.open did not return url"))
    }

    pub async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        let payload = json!({
            "channel": channel,
            "text": text,
            "mrkdwn": true,
            "unfurl_links": false,
            "unfurl_media": false,
        });
        let response: SlackChatMessageResponse = self
            .request_json(
                "chat.postMessage",
                self.http
                    .post(format!("{}/chat.postMessage", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .json(&payload),
            )
            .await?;
        if !response.ok {
            bail!(
                "slack chat.postMessage failed: {}",
                slack_error(response.error)
            );
        }
        Ok(())
    }

    async fn request_json<T>(&self, operation: &str, request: reqwest::RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        tracing::debug!(operation, "slack request");
        let response = request
            .send()
            .await
            .with_context(|| format!("slack api {operation} request failed"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "slack api {operation} failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 800)
            );
        }
        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode slack {operation}"))
    }
}

#[async_trait]
impl ChatDirectory for SlackApiClient {
    async fn fetch_user_profile(&self, user_id: &str) -> Result<ChatUserProfile> {
        let response: SlackUserInfoResponse = self
            .request_json(
                "users.info",
                self.http
                    .get(format!("{}/users.info", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .query(&[("user", user_id)]),
            )
            .await?;
        if !response.ok {
            bail!("slack users.info failed: {}", slack_error(response.error));
        }
        response
            .user
            .map(SlackUser::into_profile)
            .ok_or_else(|| anyhow!("slack users.info did not return user"))
    }

    async fn fetch_directory(&self) -> Result<BTreeMap<String, String>> {
        let mut directory = BTreeMap::new();
        let mut cursor = String::new();
        loop {
            let mut query = vec![("limit", USERS_LIST_PAGE_SIZE.to_string())];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.clone()));
            }
            let response: SlackUsersListResponse = self
                .request_json(
                    "users.list",
                    self.http
                        .get(format!("{}/users.list", self.api_base))
                        .bearer_auth(&self.bot_token)
                        .query(&query),
                )
                .await?;
            if !response.ok {
                bail!("slack users.list failed: {}", slack_error(response.error));
            }
            for member in response.members {
                let profile = member.into_profile();
                if let Some(name) = profile.mention_name() {
                    directory.insert(profile.user_id.clone(), name.to_string());
                }
            }
            cursor = response
                .response_metadata
                .next_cursor
                .unwrap_or_default()
                .trim()
                .to_string();
            if cursor.is_empty() {
                break;
            }
        }
        Ok(directory)
    }
}
