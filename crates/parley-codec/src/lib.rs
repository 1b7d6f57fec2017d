// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message codec for the Parley chat engine.
//!
//! Converts wire payloads to and from the internal message model: button
//! token extraction, legacy redactor HTML cleanup, light markdown to inline
//! HTML, URL/email/phone auto-linking, timestamp parsing with fallback, and
//! file classification.

pub mod autolink;
pub mod buttons;
pub mod forms;
pub mod init;
pub mod markdown;
pub mod message;
pub mod timestamp;
pub mod wire;

pub use init::{InitOutcome, classify_init};
pub use message::{convert_batch, convert_message};

use parley_core::{Direction, Message, Payload, SendStatus};
use chrono::Utc;

/// Converts caller-authored text the way the codec converts wire text, so a
/// locally echoed message renders identically to its later server echo.
pub fn convert_outgoing_text(text: &str) -> String {
    text.split('\n')
        .map(|line| markdown::convert_markdown_line(&autolink::autolink_line(line)))
        .collect::<Vec<_>>()
        .join("<br>")
}

/// Builds the optimistic client text message emitted before the wire send.
pub fn new_client_text(local_id: i64, text: &str) -> Message {
    Message {
        id: local_id,
        local_id,
        created_at: Utc::now(),
        direction: Direction::Client,
        payload: Payload::Text {
            text: text.to_string(),
            html: convert_outgoing_text(text),
            buttons: Vec::new(),
            feedback_needed: false,
            feedback: None,
        },
        status: Some(SendStatus::Sending),
        agent: None,
    }
}

/// Builds the optimistic client file message emitted before the upload.
pub fn new_client_file(local_id: i64, file: &parley_core::FileInfo) -> Message {
    Message {
        id: local_id,
        local_id,
        created_at: Utc::now(),
        direction: Direction::Client,
        payload: Payload::File(parley_core::FileAttachment::new(
            file.uri.clone(),
            file.mime.clone(),
            "",
            file.name.clone(),
        )),
        status: Some(SendStatus::Sending),
        agent: None,
    }
}
