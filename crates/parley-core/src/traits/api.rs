// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport adapter contract: the socket connection plus the HTTP fallback.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ParleyError;
use crate::form::{Field, Form};
use crate::types::{
    ChatConfig, ChatInit, Feedback, FileInfo, Message, OfflineForm, OfflineFormSettings,
};

/// Low-level protocol events raised by the transport adapter.
///
/// The engine consumes these via [`ChatApi::next_event`] on its background
/// task and translates them into state changes and observer events.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    /// The server rejected the session token; the engine re-issues init.
    TokenError,
    /// Init handshake completed with a chat session.
    ChatInited(ChatInit),
    /// A batch of decoded messages. `historical` marks an old page being
    /// prepended; live messages are appended.
    MessagesReceived {
        messages: Vec<Message>,
        historical: bool,
    },
    /// An in-place update, e.g. a client message confirmed by its echo.
    MessageUpdated(Message),
    /// The server acknowledged a feedback submission.
    Feedback,
    /// Init handshake completed, but the server expects an offline form.
    OfflineForm {
        settings: OfflineFormSettings,
        init: ChatInit,
    },
    /// The client profile was accepted; queued init message may be sent.
    SetEmailSuccess,
    /// A transport-level failure, forwarded to the exception stream.
    Error(Arc<ParleyError>),
}

/// The transport adapter seam: persistent socket plus HTTP fallback.
///
/// Implementations must be cheap to share (`Arc`) and internally serialize
/// access to the underlying socket. All methods that write to the socket
/// return [`ParleyError::Disconnected`] when no connection is up.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Opens the socket connection and begins emitting events. Safe to call
    /// again after a disconnect.
    async fn connect(
        &self,
        url: &str,
        token: Option<&str>,
        config: &ChatConfig,
    ) -> Result<(), ParleyError>;

    /// Tears down the socket. Idempotent.
    async fn disconnect(&self);

    fn is_connected(&self) -> bool;

    /// Returns the next transport event, or `None` once the transport has
    /// been released for good.
    async fn next_event(&self) -> Option<TransportEvent>;

    /// Re-issues the init handshake on the live socket (token recovery).
    async fn init_chat(&self, config: &ChatConfig, token: Option<&str>) -> Result<(), ParleyError>;

    /// Sends a text message over the socket, tagged with its local id.
    async fn send_text(&self, text: &str, local_id: i64) -> Result<(), ParleyError>;

    /// Submits feedback for an agent message over the socket.
    async fn send_feedback(&self, message_id: i64, feedback: Feedback) -> Result<(), ParleyError>;

    /// Uploads a file via HTTP multipart, tagged with its local id.
    async fn upload_file(
        &self,
        config: &ChatConfig,
        token: &str,
        file: &FileInfo,
        local_id: i64,
    ) -> Result<(), ParleyError>;

    /// Pushes the client profile (email/name/phone/note) via HTTP.
    async fn set_client(&self, config: &ChatConfig) -> Result<(), ParleyError>;

    /// Submits an offline form via HTTP.
    async fn send_offline_form(
        &self,
        config: &ChatConfig,
        form: &OfflineForm,
    ) -> Result<(), ParleyError>;

    /// Submits the configured additional profile fields via HTTP.
    async fn send_additional_fields(
        &self,
        config: &ChatConfig,
        token: &str,
        fields: Vec<(i64, String)>,
    ) -> Result<(), ParleyError>;

    /// Requests the page of messages preceding `oldest_message_id`. The page
    /// itself arrives as a `MessagesReceived { historical: true }` event;
    /// the returned flag is whether more pages remain.
    async fn load_previous_messages(
        &self,
        config: &ChatConfig,
        token: &str,
        oldest_message_id: i64,
    ) -> Result<bool, ParleyError>;

    /// Creates a chat out of band and returns the assigned client token.
    async fn create_chat(&self, config: &ChatConfig, api_token: &str) -> Result<String, ParleyError>;

    /// Loads server-side definitions for the given form's non-text fields.
    async fn load_form(
        &self,
        config: &ChatConfig,
        token: &str,
        form: &Form,
    ) -> Result<Vec<Field>, ParleyError>;

    /// Submits a validated form. Returns once the server confirms.
    async fn send_form(
        &self,
        config: &ChatConfig,
        token: &str,
        form: &Form,
    ) -> Result<(), ParleyError>;

    /// Permanently shuts the transport down; `next_event` returns `None`.
    async fn release(&self);
}
