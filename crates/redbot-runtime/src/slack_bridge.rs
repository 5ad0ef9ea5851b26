//! Slack Socket Mode loop: receive, acknowledge, dispatch, reply.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use crate::bot_config::BotConfig;
use crate::command_dispatch::CommandDispatcher;
use crate::slack_api_client::SlackApiClient;
use crate::tracker_client::TrackerClient;
use crate::transport_helpers::current_unix_timestamp_ms;

#[derive(Debug, Clone)]
/// Transport settings for the Socket Mode connection.
pub struct SlackBridgeConfig {
    pub api_base: String,
    pub app_token: String,
    pub bot_token: String,
    pub bot_user_id: Option<String>,
    pub request_timeout_ms: u64,
    pub reconnect_delay: Duration,
    pub max_event_age_seconds: u64,
    pub processed_event_cap: usize,
}

#[derive(Debug, Clone, Deserialize)]
/// One Socket Mode frame. `hello` and `disconnect` frames carry no envelope id.
struct SlackSocketEnvelope {
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(rename = "type")]
    envelope_type: String,
    #[serde(default)]
    payload: Value,
}

impl SlackSocketEnvelope {
    fn is_disconnect(&self) -> bool {
        self.envelope_type == "disconnect"
    }

    fn log_id(&self) -> &str {
        self.envelope_id.as_deref().unwrap_or("-")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlackBridgeEventKind {
    AppMention,
    DirectMessage,
}

impl SlackBridgeEventKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::AppMention => "app_mention",
            Self::DirectMessage => "message.im",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SlackBridgeEvent {
    key: String,
    kind: SlackBridgeEventKind,
    occurred_unix_ms: u64,
    channel_id: String,
    user_id: String,
    text: String,
}

/// Recently handled event keys, oldest evicted first.
struct ProcessedEvents {
    cap: usize,
    order: VecDeque<String>,
    index: HashSet<String>,
}

impl ProcessedEvents {
    fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            order: VecDeque::new(),
            index: HashSet::new(),
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    /// Returns false when the key was already recorded.
    fn mark_processed(&mut self, key: &str) -> bool {
        if !self.index.insert(key.to_string()) {
            return false;
        }
        self.order.push_back(key.to_string());
        while self.order.len() > self.cap {
            if let Some(evicted) = self.order.pop_front() {
                self.index.remove(&evicted);
            }
        }
        true
    }
}

/// Connects to Slack and serves commands until ctrl-c.
pub async fn run_slack_bridge(
    config: SlackBridgeConfig,
    bot: Arc<BotConfig>,
    tracker: Arc<dyn TrackerClient>,
) -> Result<()> {
    let mut runtime = SlackBridgeRuntime::new(config, bot, tracker).await?;
    runtime.run().await
}

enum SessionEnd {
    Closed,
    Shutdown,
}

struct SlackBridgeRuntime {
    config: SlackBridgeConfig,
    slack_client: SlackApiClient,
    dispatcher: CommandDispatcher,
    bot_user_id: String,
    processed: ProcessedEvents,
}

impl SlackBridgeRuntime {
    async fn new(
        config: SlackBridgeConfig,
        bot: Arc<BotConfig>,
        tracker: Arc<dyn TrackerClient>,
    ) -> Result<Self> {
        let slack_client = SlackApiClient::new(
            config.api_base.clone(),
            config.app_token.clone(),
            config.bot_token.clone(),
            config.request_timeout_ms,
        )?;
        let bot_user_id = match config.bot_user_id.clone() {
            Some(user_id) if !user_id.trim().is_empty() => user_id.trim().to_string(),
            _ => slack_client.resolve_bot_user_id().await?,
        };
        tracing::info!(bot_user_id = bot_user_id.as_str(), "slack bot identity resolved");
        let dispatcher = CommandDispatcher::new(bot, tracker, Arc::new(slack_client.clone()));
        let processed = ProcessedEvents::new(config.processed_event_cap);
        Ok(Self {
            config,
            slack_client,
            dispatcher,
            bot_user_id,
            processed,
        })
    }

    async fn run(&mut self) -> Result<()> {
        loop {
            match self.slack_client.open_socket_connection().await {
                Ok(socket_url) => {
                    tracing::info!("slack bridge socket connected");
                    match self.run_socket_session(&socket_url).await {
                        Ok(SessionEnd::Shutdown) => {
                            tracing::info!("slack bridge shutdown requested");
                            return Ok(());
                        }
                        Ok(SessionEnd::Closed) => {
                            tracing::info!("slack bridge socket closed");
                        }
                        Err(error) => {
                            tracing::warn!(
                                error = %format!("{error:#}"),
                                "slack bridge socket session error"
                            );
                        }
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        error = %format!("{error:#}"),
                        "slack bridge failed to open socket connection"
                    );
                }
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("slack bridge shutdown requested");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }
    }

    async fn run_socket_session(&mut self, socket_url: &str) -> Result<SessionEnd> {
        let (stream, _response) = connect_async(socket_url)
            .await
            .with_context(|| "failed to connect slack socket mode websocket")?;
        let (mut sink, mut source) = stream.split();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    return Ok(SessionEnd::Shutdown);
                }
                maybe_message = source.next() => {
                    let Some(message_result) = maybe_message else {
                        return Ok(SessionEnd::Closed);
                    };
                    let message = message_result.context("failed reading slack websocket message")?;
                    let envelope = match parse_socket_envelope(message) {
                        Ok(Some(envelope)) => envelope,
                        Ok(None) => continue,
                        Err(error) => {
                            tracing::warn!(
                                error = %format!("{error:#}"),
                                "skipping undecodable slack socket frame"
                            );
                            continue;
                        }
                    };
                    if envelope.is_disconnect() {
                        tracing::info!("slack requested socket disconnect");
                        return Ok(SessionEnd::Closed);
                    }
                    if let Some(envelope_id) = envelope.envelope_id.as_deref() {
                        ack_envelope(&mut sink, envelope_id).await?;
                    }
                    self.handle_envelope(envelope).await;
                }
            }
        }
    }

    /// Handles one acknowledged envelope; failures are logged, never raised.
    async fn handle_envelope(&mut self, envelope: SlackSocketEnvelope) {
        let now_unix_ms = current_unix_timestamp_ms();
        let event = match normalize_socket_envelope(&envelope, &self.bot_user_id) {
            Ok(Some(event)) => event,
            Ok(None) => return,
            Err(error) => {
                tracing::warn!(
                    envelope_id = envelope.log_id(),
                    error = %format!("{error:#}"),
                    "dropping undecodable slack envelope"
                );
                return;
            }
        };

        if self.processed.contains(&event.key) {
            tracing::debug!(key = event.key.as_str(), "skipping duplicate slack event");
            return;
        }
        self.processed.mark_processed(&event.key);
        if event_is_stale(&event, self.config.max_event_age_seconds, now_unix_ms) {
            tracing::debug!(key = event.key.as_str(), "skipping stale slack event");
            return;
        }

        let Some(command) = strip_bot_mention(&event, &self.bot_user_id) else {
            return;
        };
        tracing::info!(
            kind = event.kind.as_str(),
            channel = event.channel_id.as_str(),
            user = event.user_id.as_str(),
            "slack command received"
        );
        let reply = self.dispatcher.dispatch(&event.user_id, command).await;
        if let Err(error) = self
            .slack_client
            .post_message(&event.channel_id, &reply)
            .await
        {
            tracing::warn!(
                channel = event.channel_id.as_str(),
                error = %format!("{error:#}"),
                "failed to post slack reply"
            );
        }
    }
}

async fn ack_envelope<S>(sink: &mut S, envelope_id: &str) -> Result<()>
where
    S: futures_util::Sink<WsMessage> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let ack = json!({ "envelope_id": envelope_id }).to_string();
    sink.send(WsMessage::Text(ack.into()))
        .await
        .context("failed to send slack socket ack")
}

fn parse_socket_envelope(message: WsMessage) -> Result<Option<SlackSocketEnvelope>> {
    match message {
        WsMessage::Text(text) => {
            let envelope = serde_json::from_str::<SlackSocketEnvelope>(&text)
                .context("failed to parse slack socket envelope")?;
            Ok(Some(envelope))
        }
        WsMessage::Binary(bytes) => {
            let text =
                String::from_utf8(bytes.to_vec()).context("invalid utf-8 slack socket payload")?;
            let envelope = serde_json::from_str::<SlackSocketEnvelope>(&text)
                .context("failed to parse slack socket envelope")?;
            Ok(Some(envelope))
        }
        WsMessage::Ping(_) | WsMessage::Pong(_) => Ok(None),
        WsMessage::Close(_) => Ok(None),
        WsMessage::Frame(_) => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
struct SlackEventCallbackEnvelope {
    #[serde(rename = "type")]
    callback_type: String,
    event_id: String,
    event_time: u64,
    event: SlackEventPayload,
}

#[derive(Debug, Deserialize)]
struct SlackEventPayload {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    channel_type: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

fn normalize_socket_envelope(
    envelope: &SlackSocketEnvelope,
    bot_user_id: &str,
) -> Result<Option<SlackBridgeEvent>> {
    if envelope.envelope_type != "events_api" {
        return Ok(None);
    }

    let callback = serde_json::from_value::<SlackEventCallbackEnvelope>(envelope.payload.clone())
        .context("failed to decode slack event callback payload")?;
    if callback.callback_type != "event_callback" {
        return Ok(None);
    }

    let event = callback.event;
    if event.subtype.as_deref() == Some("bot_message") || event.bot_id.is_some() {
        return Ok(None);
    }
    let user_id = match event.user {
        Some(user) if !user.trim().is_empty() => user,
        _ => return Ok(None),
    };
    if user_id == bot_user_id {
        return Ok(None);
    }

    let channel_id = match event.channel {
        Some(channel) if !channel.trim().is_empty() => channel,
        _ => return Ok(None),
    };
    let message_ts = match event.ts {
        Some(ts) if !ts.trim().is_empty() => ts,
        _ => return Ok(None),
    };

    let kind = match event.event_type.as_str() {
        "app_mention" => SlackBridgeEventKind::AppMention,
        "message" if event.channel_type.as_deref() == Some("im") || channel_id.starts_with('D') => {
            SlackBridgeEventKind::DirectMessage
        }
        _ => return Ok(None),
    };

    let key = format!("{}:{}:{}", callback.event_id, channel_id, message_ts);
    Ok(Some(SlackBridgeEvent {
        key,
        kind,
        occurred_unix_ms: callback.event_time.saturating_mul(1000),
        channel_id,
        user_id,
        text: event.text.unwrap_or_default(),
    }))
}

fn event_is_stale(event: &SlackBridgeEvent, max_event_age_seconds: u64, now_unix_ms: u64) -> bool {
    if max_event_age_seconds == 0 {
        return false;
    }
    let max_age_ms = max_event_age_seconds.saturating_mul(1000);
    now_unix_ms.saturating_sub(event.occurred_unix_ms) > max_age_ms
}

/// Command text of a directed message. Mentions must address the bot first;
/// direct messages may omit the mention.
fn strip_bot_mention<'a>(event: &'a SlackBridgeEvent, bot_user_id: &str) -> Option<&'a str> {
    let text = event.text.trim();
    let mention = format!("<@{bot_user_id}>");
    match text.strip_prefix(mention.as_str()) {
        Some(rest) => Some(rest.trim()),
        None if event.kind == SlackBridgeEventKind::DirectMessage => Some(text),
        None => None,
    }
}
