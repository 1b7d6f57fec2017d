// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Socket frame envelopes.
//!
//! Every frame is a JSON text message with a `type` tag. Incoming frames
//! with an unknown tag are logged and dropped rather than failing the
//! connection.

use serde::{Deserialize, Serialize};

use parley_codec::wire::{WireInit, WireMessage};

/// Server error codes carried in `error` frames.
pub const ERROR_CODE_TOKEN_REJECTED: i64 = 403;

/// Frames written by the client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingFrame {
    /// Init handshake. Sent first on every (re)connect.
    ChatInit {
        #[serde(skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        company_id: String,
        channel_id: String,
    },
    /// Text message tagged with the client-local id for echo matching.
    MessageSend { text: String, message_id: i64 },
    /// Feedback on an agent message. `data` is "LIKE" or "DISLIKE".
    FeedbackSend { message_id: i64, data: String },
}

/// Frames read from the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingFrame {
    /// Init handshake result.
    ChatInited(WireInit),
    /// A new live message.
    MessageNew { message: WireMessage },
    /// An in-place change to an existing message.
    MessageChanged { message: WireMessage },
    /// Feedback acknowledged.
    FeedbackSent,
    /// The client profile was accepted.
    ClientSet,
    /// Server-side failure. Code 403 means the session token was rejected.
    Error {
        code: Option<i64>,
        message: Option<String>,
    },
}
