// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Parley seam traits and the session engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};

use crate::error::ParleyError;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Authored by the end user of the embedding app.
    Client,
    /// Authored by a support operator or bot, received from the server.
    Agent,
}

/// Delivery status of a client-authored message.
///
/// A message transitions `Sending -> Sent` in place (same `local_id`, server
/// id assigned) or `Sending -> SendFailed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendStatus {
    Sending,
    Sent,
    SendFailed,
}

/// A rating the client can attach to an agent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Feedback {
    Like,
    Dislike,
}

/// UI classification of a file attachment, derived from MIME type with a
/// file-extension fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    Image,
    Video,
    Audio,
    Other,
}

impl FileKind {
    /// Classifies a file by MIME type, falling back to the name's extension.
    pub fn classify(mime: &str, name: &str) -> Self {
        let mime = mime.to_ascii_lowercase();
        if mime.starts_with("image/") {
            return Self::Image;
        }
        if mime.starts_with("video/") {
            return Self::Video;
        }
        if mime.starts_with("audio/") {
            return Self::Audio;
        }
        let ext = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "webp" => Self::Image,
            "mp4" | "webm" | "mov" | "avi" | "mkv" => Self::Video,
            "mp3" | "wav" | "ogg" | "aac" | "flac" | "m4a" => Self::Audio,
            _ => Self::Other,
        }
    }
}

/// A file attached to a message: either an uploaded server-side file or a
/// local attachment still pending upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    /// Server URL or local URI of the content.
    pub content: String,
    pub mime: String,
    /// Size as reported by the server; empty for local files.
    pub size: String,
    pub name: String,
    pub kind: FileKind,
}

impl FileAttachment {
    pub fn new(content: impl Into<String>, mime: impl Into<String>, size: impl Into<String>, name: impl Into<String>) -> Self {
        let mime = mime.into();
        let name = name.into();
        let kind = FileKind::classify(&mime, &name);
        Self {
            content: content.into(),
            mime,
            size: size.into(),
            name,
            kind,
        }
    }
}

/// A structured button extracted from a `{{button:...}}` control token in an
/// agent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageButton {
    pub text: String,
    pub url: String,
    pub kind: String,
    /// Whether the button text remains visible inline in the message body.
    pub show: bool,
}

/// Operator identity attached to agent messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub name: String,
    pub avatar: String,
}

/// Message content: prose or a single file. A wire message containing both
/// becomes multiple [`Message`] values sharing the same id/local id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Text {
        /// Raw text as authored.
        text: String,
        /// Inline-HTML rendition after the codec's conversion pipeline.
        html: String,
        buttons: Vec<MessageButton>,
        /// True when the message should present a rate-good/bad affordance.
        feedback_needed: bool,
        feedback: Option<Feedback>,
    },
    File(FileAttachment),
}

impl Payload {
    pub fn text(text: impl Into<String>, html: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            html: html.into(),
            buttons: Vec::new(),
            feedback_needed: false,
            feedback: None,
        }
    }
}

/// The central message entity, owned by the session engine's ordered list.
///
/// `local_id` is client-assigned and stable across the whole send lifecycle;
/// `id` is server-assigned once confirmed. Agent-originated messages carry
/// `local_id == id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub local_id: i64,
    pub created_at: DateTime<Utc>,
    pub direction: Direction,
    pub payload: Payload,
    /// Client messages only; `None` for agent messages.
    pub status: Option<SendStatus>,
    /// Agent messages only.
    pub agent: Option<AgentInfo>,
}

impl Message {
    pub fn is_client(&self) -> bool {
        self.direction == Direction::Client
    }

    /// Whether `other` is the same logical message: client messages match by
    /// `local_id`, agent messages by server `id`.
    pub fn same_entry(&self, other: &Message) -> bool {
        match (self.direction, other.direction) {
            (Direction::Client, Direction::Client) => self.local_id == other.local_id,
            (Direction::Agent, Direction::Agent) => self.id == other.id,
            _ => false,
        }
    }

    /// Returns a copy with the given client send status.
    pub fn with_status(&self, status: SendStatus) -> Message {
        Message {
            status: Some(status),
            ..self.clone()
        }
    }
}

/// A caller-supplied attachment reference, not yet part of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Local URI or filesystem path of the source content.
    pub uri: String,
    pub mime: String,
    pub name: String,
}

impl FileInfo {
    pub fn kind(&self) -> FileKind {
        FileKind::classify(&self.mime, &self.name)
    }
}

/// Locally persisted, not-yet-sent message content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDraft {
    pub text: String,
    pub files: Vec<FileInfo>,
}

impl MessageDraft {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.files.is_empty()
    }
}

/// Socket connection lifecycle. Transitions are driven solely by transport
/// events and the reconnection timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
}

/// Identifies a chat endpoint and client identity.
///
/// Supplied by the caller at engine construction. `client_token` is mutated
/// once by the engine upon successful handshake and persisted to the cache
/// store; the remainder is immutable for the engine's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    pub company_id: String,
    pub channel_id: String,
    /// Socket endpoint.
    pub url_chat: String,
    /// HTTP fallback base (forms, files, pagination).
    pub url_api: String,
    pub client_token: Option<String>,
    pub client_email: Option<String>,
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub client_note: Option<String>,
    pub client_additional_id: Option<String>,
    /// Message sent automatically once the session becomes active.
    pub init_message: Option<String>,
    /// Extra profile fields submitted once per session after the first
    /// confirmed send.
    pub additional_fields: HashMap<i64, String>,
    pub additional_nested_fields: Vec<HashMap<i64, String>>,
    /// Whether unsent messages are shadow-copied to the durable store.
    pub cache_messages: bool,
}

impl ChatConfig {
    pub fn new(
        company_id: impl Into<String>,
        channel_id: impl Into<String>,
        url_chat: impl Into<String>,
        url_api: impl Into<String>,
    ) -> Self {
        Self {
            company_id: company_id.into(),
            channel_id: channel_id.into(),
            url_chat: url_chat.into(),
            url_api: url_api.into(),
            cache_messages: true,
            ..Self::default()
        }
    }

    /// `companyId_channelId`, the backend's channel addressing key.
    pub fn company_and_channel(&self) -> String {
        format!("{}_{}", self.company_id, self.channel_id)
    }

    /// Key identifying the local user for drafts and form state.
    pub fn user_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.client_email.as_deref().unwrap_or(""),
            self.client_phone.as_deref().unwrap_or(""),
            self.client_name.as_deref().unwrap_or("")
        )
    }

    /// Two configurations describe the same client identity when their
    /// email/phone/name tuples match.
    pub fn same_identity(&self, other: &ChatConfig) -> bool {
        self.client_email == other.client_email
            && self.client_phone == other.client_phone
            && self.client_name == other.client_name
    }

    pub fn validate(&self) -> Result<(), ParleyError> {
        if self.company_id.is_empty() {
            return Err(ParleyError::Config("company_id must not be empty".into()));
        }
        if self.channel_id.is_empty() {
            return Err(ParleyError::Config("channel_id must not be empty".into()));
        }
        if self.url_chat.is_empty() {
            return Err(ParleyError::Config("url_chat must not be empty".into()));
        }
        Ok(())
    }
}

/// Server statuses for which the session is considered active and the
/// first-message gate may be released.
pub const ACTIVE_STATUSES: [i64; 4] = [1, 5, 6, 8];

/// Ticket statuses for which an offline form is expected instead of a chat.
pub const OFFLINE_FORM_STATUSES: [Option<i64>; 7] =
    [None, Some(2), Some(3), Some(4), Some(7), Some(9), Some(10)];

/// Result of the init handshake on a (re)connected session.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatInit {
    pub token: String,
    /// Ticket status code, used for active-session and offline-form gating.
    pub status: Option<i64>,
    /// The server wants the client profile pushed before messages flow.
    pub waiting_email: bool,
    /// Server-side message snapshot for the session.
    pub messages: Vec<Message>,
}

/// Server-communicated offline-form policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OfflineWorkType {
    /// Form shown only outside working hours when no operators are available.
    CheckWorkingTimes,
    /// Form always available; its content is routed into the chat channel.
    AlwaysEnabledCallbackWithChat,
    /// Form always available; submitted via the HTTP endpoint.
    AlwaysEnabledCallbackWithoutChat,
}

/// Settings describing the offline form the server expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineFormSettings {
    pub work_type: OfflineWorkType,
    pub callback_title: String,
    pub callback_greeting: String,
    pub topics: Vec<String>,
    pub topics_required: bool,
    /// Custom field keys the form should collect, with required flags.
    pub fields: Vec<OfflineFormFieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineFormFieldSpec {
    pub key: String,
    pub title: String,
    pub required: bool,
}

/// A filled offline form ready for submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineForm {
    pub client_name: String,
    pub client_email: String,
    pub topic: String,
    pub fields: Vec<OfflineFormField>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineFormField {
    pub key: String,
    pub value: String,
}

impl OfflineForm {
    /// Flattens the form into chat-message text: name, email, topic, custom
    /// field values, then the message body, one per line, empties skipped.
    pub fn to_chat_text(&self) -> String {
        let mut lines = vec![
            self.client_name.clone(),
            self.client_email.clone(),
            self.topic.clone(),
        ];
        lines.extend(
            self.fields
                .iter()
                .map(|f| f.value.clone())
                .filter(|v| !v.is_empty()),
        );
        lines.push(self.message.clone());
        lines.retain(|l| !l.is_empty());
        lines.join("\n")
    }
}

/// Flattened, durable form field values as stored by the cache store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFormValues {
    /// field id -> raw value ("true"/"false", selected item id, or text).
    pub values: HashMap<String, String>,
    pub sent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_kind_classification_prefers_mime() {
        assert_eq!(FileKind::classify("image/png", "x.bin"), FileKind::Image);
        assert_eq!(FileKind::classify("video/mp4", "x.bin"), FileKind::Video);
        assert_eq!(FileKind::classify("audio/ogg", "x.bin"), FileKind::Audio);
        assert_eq!(FileKind::classify("application/pdf", "x.pdf"), FileKind::Other);
    }

    #[test]
    fn file_kind_falls_back_to_extension() {
        assert_eq!(FileKind::classify("*/*", "photo.JPG"), FileKind::Image);
        assert_eq!(FileKind::classify("", "clip.webm"), FileKind::Video);
        assert_eq!(FileKind::classify("", "voice.m4a"), FileKind::Audio);
        assert_eq!(FileKind::classify("", "notes.txt"), FileKind::Other);
    }

    #[test]
    fn same_entry_matches_client_by_local_id_and_agent_by_id() {
        let client = Message {
            id: 0,
            local_id: -3,
            created_at: Utc::now(),
            direction: Direction::Client,
            payload: Payload::text("hi", "hi"),
            status: Some(SendStatus::Sending),
            agent: None,
        };
        let confirmed = Message {
            id: 100,
            ..client.clone()
        };
        assert!(client.same_entry(&confirmed));

        let agent = Message {
            id: 7,
            local_id: 7,
            created_at: Utc::now(),
            direction: Direction::Agent,
            payload: Payload::text("hello", "hello"),
            status: None,
            agent: Some(AgentInfo::default()),
        };
        let agent_other = Message {
            local_id: 8,
            ..agent.clone()
        };
        assert!(agent.same_entry(&agent_other));
        assert!(!client.same_entry(&agent));
    }

    #[test]
    fn offline_form_to_chat_text_skips_empty_values() {
        let form = OfflineForm {
            client_name: "Ada".into(),
            client_email: "ada@example.com".into(),
            topic: String::new(),
            fields: vec![
                OfflineFormField { key: "order".into(), value: "A-17".into() },
                OfflineFormField { key: "extra".into(), value: String::new() },
            ],
            message: "help".into(),
        };
        assert_eq!(form.to_chat_text(), "Ada\nada@example.com\nA-17\nhelp");
    }

    #[test]
    fn config_identity_comparison() {
        let a = ChatConfig {
            client_email: Some("x@y.z".into()),
            client_name: Some("X".into()),
            ..Default::default()
        };
        let mut b = a.clone();
        b.client_token = Some("other-token".into());
        assert!(a.same_identity(&b));
        b.client_name = Some("Y".into());
        assert!(!a.same_identity(&b));
    }

    #[test]
    fn config_validation_requires_endpoint_fields() {
        let mut config = ChatConfig {
            company_id: "153".into(),
            channel_id: "12".into(),
            url_chat: "wss://chat.example.com/ws".into(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        config.company_id.clear();
        assert!(config.validate().is_err());
    }
}
