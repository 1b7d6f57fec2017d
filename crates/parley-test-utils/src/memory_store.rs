// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory cache store for deterministic testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use parley_core::{
    CacheStore, ChatConfig, Message, MessageDraft, ParleyError, SavedFormValues,
};

/// A `CacheStore` backed by plain collections. Single identity; the
/// `user_key` scoping of the SQLite store is not reproduced here.
#[derive(Default)]
pub struct MemoryCacheStore {
    next_id: AtomicI64,
    not_sent: Mutex<Vec<Message>>,
    draft: Mutex<MessageDraft>,
    forms: Mutex<HashMap<i64, SavedFormValues>>,
    configs: Mutex<HashMap<String, ChatConfig>>,
    cached_files: Mutex<Vec<String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths passed to `cache_file`, in call order.
    pub async fn cached_files(&self) -> Vec<String> {
        self.cached_files.lock().await.clone()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn next_local_id(&self) -> Result<i64, ParleyError> {
        Ok(self.next_id.fetch_sub(1, Ordering::SeqCst) - 1)
    }

    async fn add_not_sent(&self, message: &Message) -> Result<(), ParleyError> {
        self.not_sent.lock().await.push(message.clone());
        Ok(())
    }

    async fn update_not_sent(&self, message: &Message) -> Result<(), ParleyError> {
        let mut pending = self.not_sent.lock().await;
        match pending.iter_mut().find(|m| m.local_id == message.local_id) {
            Some(entry) => *entry = message.clone(),
            None => pending.push(message.clone()),
        }
        Ok(())
    }

    async fn remove_not_sent(&self, local_id: i64) -> Result<(), ParleyError> {
        self.not_sent.lock().await.retain(|m| m.local_id != local_id);
        Ok(())
    }

    async fn not_sent_messages(&self) -> Result<Vec<Message>, ParleyError> {
        Ok(self.not_sent.lock().await.clone())
    }

    async fn set_draft(&self, draft: &MessageDraft) -> Result<(), ParleyError> {
        *self.draft.lock().await = draft.clone();
        Ok(())
    }

    async fn get_draft(&self) -> Result<MessageDraft, ParleyError> {
        Ok(self.draft.lock().await.clone())
    }

    async fn take_draft(&self) -> Result<MessageDraft, ParleyError> {
        Ok(std::mem::take(&mut *self.draft.lock().await))
    }

    async fn save_form_values(
        &self,
        form_id: i64,
        values: &SavedFormValues,
    ) -> Result<(), ParleyError> {
        self.forms.lock().await.insert(form_id, values.clone());
        Ok(())
    }

    async fn load_form_values(&self, form_id: i64) -> Result<Option<SavedFormValues>, ParleyError> {
        Ok(self.forms.lock().await.get(&form_id).cloned())
    }

    async fn get_config(&self, identity: &ChatConfig) -> Result<Option<ChatConfig>, ParleyError> {
        Ok(self.configs.lock().await.get(&identity.user_key()).cloned())
    }

    async fn set_config(&self, config: &ChatConfig) -> Result<(), ParleyError> {
        self.configs
            .lock()
            .await
            .insert(config.user_key(), config.clone());
        Ok(())
    }

    async fn cache_file(&self, source: &str) -> Result<String, ParleyError> {
        self.cached_files.lock().await.push(source.to_string());
        Ok(format!("cached:{source}"))
    }

    async fn remove_cached_file(&self, cached: &str) -> Result<(), ParleyError> {
        self.cached_files
            .lock()
            .await
            .retain(|f| format!("cached:{f}") != cached);
        Ok(())
    }
}
