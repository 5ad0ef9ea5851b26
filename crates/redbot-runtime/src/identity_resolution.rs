//! Maps chat identities and `<name>` arguments onto tracker users.

use std::collections::BTreeMap;

use anyhow::Result;
use redbot_commands::chat_markup::parse_mention_id;
use redbot_commands::tracker_types::TrackerUser;
use redbot_commands::{resolve_mentions, rewrite_chat_links, LinkMode};

use crate::chat_directory::ChatDirectory;
use crate::command_error::{CommandError, FailedOperation, FailureContext};
use crate::tracker_client::TrackerClient;

/// First tracker user matching a candidate, tried in order.
pub async fn find_first_candidate(
    tracker: &dyn TrackerClient,
    candidates: &[String],
) -> Result<Option<TrackerUser>> {
    for candidate in candidates {
        if let Some(user) = tracker.find_user(candidate).await? {
            tracing::debug!(
                candidate = candidate.as_str(),
                login = user.login.as_str(),
                "resolved tracker user"
            );
            return Ok(Some(user));
        }
    }
    Ok(None)
}

async fn resolve_chat_user(
    tracker: &dyn TrackerClient,
    directory: &dyn ChatDirectory,
    chat_user_id: &str,
) -> Result<(Vec<String>, Option<TrackerUser>), CommandError> {
    let profile = directory
        .fetch_user_profile(chat_user_id)
        .await
        .or_failed(FailedOperation::UserLookup)?;
    let candidates = profile.name_candidates();
    let user = find_first_candidate(tracker, &candidates)
        .await
        .or_failed(FailedOperation::UserLookup)?;
    Ok((candidates, user))
}

/// Resolves the sender of a command; required before any write.
pub async fn resolve_requester(
    tracker: &dyn TrackerClient,
    directory: &dyn ChatDirectory,
    chat_user_id: &str,
) -> Result<TrackerUser, CommandError> {
    let (candidates, user) = resolve_chat_user(tracker, directory, chat_user_id).await?;
    user.ok_or_else(|| CommandError::RequesterNotFound {
        candidates: if candidates.is_empty() {
            "no names".to_string()
        } else {
            candidates
                .iter()
                .map(|candidate| format!("`{candidate}`"))
                .collect::<Vec<_>>()
                .join(", ")
        },
    })
}

/// Resolves a `<name>` argument: a chat mention or a plain tracker name.
pub async fn resolve_user_argument(
    tracker: &dyn TrackerClient,
    directory: &dyn ChatDirectory,
    argument: &str,
) -> Result<TrackerUser, CommandError> {
    if let Some(chat_user_id) = parse_mention_id(argument) {
        let (_, user) = resolve_chat_user(tracker, directory, &chat_user_id).await?;
        return user.ok_or_else(|| CommandError::UserNotFound(argument.to_string()));
    }
    tracker
        .find_user(argument)
        .await
        .or_failed(FailedOperation::UserLookup)?
        .ok_or_else(|| CommandError::UserNotFound(argument.to_string()))
}

/// Comment text as stored on the tracker: links keep their url, mentions
/// become `@name` (or `@UNKNOWN` when the directory is unavailable).
pub async fn render_comment_text(directory: &dyn ChatDirectory, text: &str) -> String {
    let text = rewrite_chat_links(text, LinkMode::UrlOnly);
    if !text.contains("<@") {
        return text;
    }
    let names = match directory.fetch_directory().await {
        Ok(names) => names,
        Err(error) => {
            tracing::warn!(error = %error, "chat directory fetch failed");
            BTreeMap::new()
        }
    };
    resolve_mentions(&text, &names)
}

#[cfg(test)]
mod tests {
    use super::{render_comment_text, resolve_requester, resolve_user_argument};
    use crate::command_error::CommandError;
    use crate::test_support::{FakeDirectory, FakeTracker};

    #[tokio::test]
    async fn functional_requester_resolution_tries_candidates_in_order() {
        let tracker = FakeTracker::with_users(&[(7, "asmith", "", "Smith")]);
        let directory = FakeDirectory::alice();
        let user = resolve_requester(&tracker, &directory, "UALICE")
            .await
            .expect("requester");
        assert_eq!(user.login, "asmith");
        let lookups = tracker.user_lookups();
        assert_eq!(lookups, vec!["Alice Smith", "Smith"]);
    }

    #[tokio::test]
    async fn regression_requester_not_found_lists_candidates() {
        let tracker = FakeTracker::with_users(&[]);
        let directory = FakeDirectory::alice();
        let error = resolve_requester(&tracker, &directory, "UALICE")
            .await
            .expect_err("missing");
        assert!(matches!(error, CommandError::RequesterNotFound { .. }));
        assert!(error.to_string().contains("`Alice Smith`"));
    }

    #[tokio::test]
    async fn functional_user_argument_accepts_mentions_and_plain_names() {
        let tracker = FakeTracker::standard();
        let directory = FakeDirectory::alice();
        let by_mention = resolve_user_argument(&tracker, &directory, "<@UBOB>")
            .await
            .expect("mention");
        assert_eq!(by_mention.login, "bob");
        let by_name = resolve_user_argument(&tracker, &directory, "alice")
            .await
            .expect("name");
        assert_eq!(by_name.login, "alice");
        let missing = resolve_user_argument(&tracker, &directory, "zed")
            .await
            .expect_err("missing");
        assert_eq!(missing.user_message(), ":x: User `zed` not found");
    }

    #[tokio::test]
    async fn functional_comment_text_keeps_urls_and_resolves_mentions() {
        let directory = FakeDirectory::alice();
        let rendered = render_comment_text(
            &directory,
            "see <https://x.example/a|docs> with <@UBOB> and <@UGHOST>",
        )
        .await;
        assert_eq!(
            rendered,
            "see https://x.example/a with @Bob Jones and @UNKNOWN"
        );
    }

    #[tokio::test]
    async fn regression_directory_failure_degrades_mentions_to_unknown() {
        let directory = FakeDirectory::unavailable();
        let rendered = render_comment_text(&directory, "ping <@UBOB>").await;
        assert_eq!(rendered, "ping @UNKNOWN");
    }
}
