// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable offline cache store contract.
//!
//! The engine only requires key-based get/set/delete with durability across
//! process restarts; the storage technology is an implementation concern.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::types::{ChatConfig, Message, MessageDraft, SavedFormValues};

/// Durable store for not-yet-confirmed outgoing messages, per-identity
/// configuration, the current draft, and flattened form field state, plus a
/// local file cache for attachments pending upload.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Allocates the next client-local message id. Ids are negative and
    /// monotonically decreasing so they can never collide with
    /// server-assigned ids.
    async fn next_local_id(&self) -> Result<i64, ParleyError>;

    // --- Not-sent message shadow copies ---

    async fn add_not_sent(&self, message: &Message) -> Result<(), ParleyError>;

    /// Replaces the row with the same local id.
    async fn update_not_sent(&self, message: &Message) -> Result<(), ParleyError>;

    async fn remove_not_sent(&self, local_id: i64) -> Result<(), ParleyError>;

    /// All shadow copies, in insertion order. Used at reconnect to resend
    /// anything not yet confirmed and to dedup the server init snapshot.
    async fn not_sent_messages(&self) -> Result<Vec<Message>, ParleyError>;

    // --- Draft ---

    /// Overwrites the current draft for this identity.
    async fn set_draft(&self, draft: &MessageDraft) -> Result<(), ParleyError>;

    async fn get_draft(&self) -> Result<MessageDraft, ParleyError>;

    /// Returns the current draft and clears it atomically.
    async fn take_draft(&self) -> Result<MessageDraft, ParleyError>;

    // --- Form field state ---

    /// Stores the flattened field-value map plus the sent flag for a form.
    async fn save_form_values(
        &self,
        form_id: i64,
        values: &SavedFormValues,
    ) -> Result<(), ParleyError>;

    async fn load_form_values(&self, form_id: i64) -> Result<Option<SavedFormValues>, ParleyError>;

    // --- Per-identity configuration ---

    /// Finds the stored configuration matching `identity`'s
    /// email/phone/name tuple.
    async fn get_config(&self, identity: &ChatConfig) -> Result<Option<ChatConfig>, ParleyError>;

    /// Inserts or replaces the row matching the configuration's identity.
    async fn set_config(&self, config: &ChatConfig) -> Result<(), ParleyError>;

    // --- Local file cache ---

    /// Copies a caller-supplied attachment into app-private storage so the
    /// original source need not stay valid during upload. Returns the path
    /// of the cached copy.
    async fn cache_file(&self, source: &str) -> Result<String, ParleyError>;

    /// Removes a cached copy once upload completes or is abandoned.
    async fn remove_cached_file(&self, cached: &str) -> Result<(), ParleyError>;
}
