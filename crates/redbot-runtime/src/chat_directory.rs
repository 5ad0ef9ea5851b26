//! Chat user directory boundary used for identity and mention resolution.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Best-effort naming fields the chat platform reports for one user.
pub struct ChatUserProfile {
    pub user_id: String,
    pub real_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub user_name: Option<String>,
}

impl ChatUserProfile {
    /// Tracker lookup candidates: full, last, first, display, then user name.
    pub fn name_candidates(&self) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::new();
        for candidate in [
            &self.real_name,
            &self.last_name,
            &self.first_name,
            &self.display_name,
            &self.user_name,
        ]
        .into_iter()
        .flatten()
        {
            let candidate = candidate.trim();
            if candidate.is_empty() || candidates.iter().any(|known| known == candidate) {
                continue;
            }
            candidates.push(candidate.to_string());
        }
        candidates
    }

    /// Name shown when a mention of this user is rendered as text.
    pub fn mention_name(&self) -> Option<&str> {
        [&self.display_name, &self.real_name, &self.user_name]
            .into_iter()
            .flatten()
            .map(|name| name.trim())
            .find(|name| !name.is_empty())
    }
}

#[async_trait]
pub trait ChatDirectory: Send + Sync {
    async fn fetch_user_profile(&self, user_id: &str) -> Result<ChatUserProfile>;

    /// Full `user id -> display name` map; fetched on every call.
    async fn fetch_directory(&self) -> Result<BTreeMap<String, String>>;
}
