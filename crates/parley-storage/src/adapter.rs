// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed implementation of the engine's cache store contract.

use std::path::Path;

use async_trait::async_trait;

use parley_core::{
    CacheStore, ChatConfig, Message, MessageDraft, ParleyError, SavedFormValues,
};

use crate::database::Database;
use crate::files::FileCache;
use crate::queries;

/// Cache store scoped to one client identity.
///
/// All rows are keyed by the identity's `user_key`, so switching clients
/// on the same device keeps each client's unsent messages and drafts
/// separate.
pub struct SqliteCacheStore {
    db: Database,
    files: FileCache,
    user_key: String,
}

impl SqliteCacheStore {
    /// Opens (or creates) the store under `data_dir` for the identity in
    /// `config`.
    pub async fn open(data_dir: &Path, config: &ChatConfig) -> Result<Self, ParleyError> {
        let db = Database::open(&data_dir.join("parley.db")).await?;
        let files = FileCache::new(data_dir.join("file_cache")).await?;
        Ok(Self {
            db,
            files,
            user_key: config.user_key(),
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn next_local_id(&self) -> Result<i64, ParleyError> {
        queries::counters::next_down(&self.db, queries::counters::LOCAL_ID_COUNTER).await
    }

    async fn add_not_sent(&self, message: &Message) -> Result<(), ParleyError> {
        queries::not_sent::upsert(&self.db, &self.user_key, message).await
    }

    async fn update_not_sent(&self, message: &Message) -> Result<(), ParleyError> {
        queries::not_sent::upsert(&self.db, &self.user_key, message).await
    }

    async fn remove_not_sent(&self, local_id: i64) -> Result<(), ParleyError> {
        queries::not_sent::remove(&self.db, &self.user_key, local_id).await
    }

    async fn not_sent_messages(&self) -> Result<Vec<Message>, ParleyError> {
        queries::not_sent::all(&self.db, &self.user_key).await
    }

    async fn set_draft(&self, draft: &MessageDraft) -> Result<(), ParleyError> {
        queries::drafts::set(&self.db, &self.user_key, draft).await
    }

    async fn get_draft(&self) -> Result<MessageDraft, ParleyError> {
        queries::drafts::get(&self.db, &self.user_key).await
    }

    async fn take_draft(&self) -> Result<MessageDraft, ParleyError> {
        queries::drafts::take(&self.db, &self.user_key).await
    }

    async fn save_form_values(
        &self,
        form_id: i64,
        values: &SavedFormValues,
    ) -> Result<(), ParleyError> {
        queries::forms::save(&self.db, &self.user_key, form_id, values).await
    }

    async fn load_form_values(&self, form_id: i64) -> Result<Option<SavedFormValues>, ParleyError> {
        queries::forms::load(&self.db, &self.user_key, form_id).await
    }

    async fn get_config(&self, identity: &ChatConfig) -> Result<Option<ChatConfig>, ParleyError> {
        queries::configs::get(&self.db, &identity.user_key()).await
    }

    async fn set_config(&self, config: &ChatConfig) -> Result<(), ParleyError> {
        queries::configs::set(&self.db, &config.user_key(), config).await
    }

    async fn cache_file(&self, source: &str) -> Result<String, ParleyError> {
        self.files.cache(source).await
    }

    async fn remove_cached_file(&self, cached: &str) -> Result<(), ParleyError> {
        self.files.remove(cached).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{Direction, Payload, SendStatus};
    use tempfile::tempdir;

    fn test_config() -> ChatConfig {
        let mut config = ChatConfig::new("153", "17", "wss://chat.example", "https://api.example");
        config.client_email = Some("a@x".to_string());
        config
    }

    #[tokio::test]
    async fn not_sent_lifecycle_through_trait() {
        let dir = tempdir().unwrap();
        let store = SqliteCacheStore::open(dir.path(), &test_config())
            .await
            .unwrap();

        let local_id = store.next_local_id().await.unwrap();
        assert_eq!(local_id, -1);
        assert!(store.next_local_id().await.unwrap() < local_id);

        let message = Message {
            id: local_id,
            local_id,
            created_at: chrono::Utc::now(),
            direction: Direction::Client,
            payload: Payload::text("hi", "hi"),
            status: Some(SendStatus::Sending),
            agent: None,
        };
        store.add_not_sent(&message).await.unwrap();

        let failed = message.with_status(SendStatus::SendFailed);
        store.update_not_sent(&failed).await.unwrap();

        let pending = store.not_sent_messages().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].status, Some(SendStatus::SendFailed));

        store.remove_not_sent(local_id).await.unwrap();
        assert!(store.not_sent_messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn config_round_trip_by_identity() {
        let dir = tempdir().unwrap();
        let store = SqliteCacheStore::open(dir.path(), &test_config())
            .await
            .unwrap();

        let mut config = test_config();
        config.client_token = Some("issued-token".to_string());
        store.set_config(&config).await.unwrap();

        let loaded = store.get_config(&test_config()).await.unwrap().unwrap();
        assert_eq!(loaded.client_token.as_deref(), Some("issued-token"));

        let mut other = test_config();
        other.client_email = Some("b@x".to_string());
        assert!(store.get_config(&other).await.unwrap().is_none());
    }
}
