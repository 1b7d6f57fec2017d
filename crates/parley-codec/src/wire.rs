// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serde structs for the socket and HTTP wire payloads.
//!
//! Every field is optional: the backend omits fields freely and a malformed
//! message must be isolated to itself, never failing a whole batch.

use serde::{Deserialize, Serialize};

/// Message direction type tags used on the wire.
pub const TYPE_CLIENT_TO_OPERATOR: &str = "client_to_operator";
pub const TYPE_CLIENT_TO_BOT: &str = "client_to_bot";
pub const TYPE_OPERATOR_TO_CLIENT: &str = "operator_to_client";
pub const TYPE_BOT_TO_CLIENT: &str = "bot_to_client";

/// A single message as carried on the socket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireMessage {
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<String>,
    /// Operator display name.
    pub name: Option<String>,
    pub created_at: Option<String>,
    pub file: Option<WireFile>,
    pub payload: Option<WireMessagePayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireFile {
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub mime: Option<String>,
    pub size: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireMessagePayload {
    /// Client-assigned local id echoed back on confirmation.
    pub message_id: Option<i64>,
    pub avatar: Option<String>,
    pub user_rating: Option<String>,
    pub buttons: Option<Vec<WirePayloadButton>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WirePayloadButton {
    pub data: Option<String>,
    pub icon: Option<String>,
}

/// Init handshake response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireInit {
    pub token: Option<String>,
    /// Ticket status id; drives active-session and offline-form gating.
    pub status: Option<i64>,
    pub waiting_email: Option<bool>,
    pub no_operators: Option<bool>,
    pub messages: Option<Vec<WireMessage>>,
    pub callback_settings: Option<WireCallbackSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireCallbackSettings {
    pub work_type: Option<String>,
    pub callback_title: Option<String>,
    pub callback_greeting: Option<String>,
    #[serde(default)]
    pub topics: Vec<WireTopic>,
    pub topics_required: Option<bool>,
    #[serde(default)]
    pub custom_fields: Vec<WireCustomField>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireTopic {
    pub text: Option<String>,
    pub checked: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireCustomField {
    pub key: Option<String>,
    pub placeholder: Option<String>,
    pub required: Option<bool>,
    pub checked: Option<bool>,
}

/// HTTP response for a form-definition load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireFormLoad {
    pub code: Option<i64>,
    /// field id -> definition object.
    pub fields: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Loaded definition of a list field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireLoadedList {
    pub id: Option<String>,
    pub parent_field_id: Option<String>,
    #[serde(default)]
    pub children: Vec<WireListChild>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireListChild {
    pub id: Option<i64>,
    pub value: Option<String>,
    pub parent_option_id: Option<Vec<i64>>,
}

/// HTTP response for a form submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireFormSave {
    pub status: Option<i64>,
    pub code: Option<i64>,
}
