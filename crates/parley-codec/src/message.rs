// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire message to model conversion.
//!
//! A single wire message becomes zero or more [`Message`] values: a text
//! part and/or file parts. Images embedded in the prose via markdown syntax
//! become their own file messages sharing the parent's id/local id.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use parley_core::{
    AgentInfo, Direction, Feedback, FileAttachment, Message, ParleyError, Payload, SendStatus,
};

use crate::autolink::autolink_line;
use crate::buttons::{extract_buttons, strip_button_tokens};
use crate::markdown::{convert_markdown_line, normalize_redactor_html};
use crate::timestamp::parse_timestamp;
use crate::wire::{
    TYPE_BOT_TO_CLIENT, TYPE_CLIENT_TO_BOT, TYPE_CLIENT_TO_OPERATOR, TYPE_OPERATOR_TO_CLIENT,
    WireMessage,
};

static EMBEDDED_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[[^\]]*\]\((.*?)\s*("(?:.*[^"])")?\s*\)"#).expect("embedded image regex")
});

/// Converts a wire message into model messages.
///
/// A message that cannot be attributed a direction or timestamp fails as a
/// whole; a malformed file part is dropped while the text part survives.
pub fn convert_message(wire: &WireMessage) -> Result<Vec<Message>, ParleyError> {
    let direction = match wire.kind.as_deref() {
        Some(TYPE_CLIENT_TO_OPERATOR) | Some(TYPE_CLIENT_TO_BOT) => Direction::Client,
        Some(TYPE_OPERATOR_TO_CLIENT) | Some(TYPE_BOT_TO_CLIENT) => Direction::Agent,
        other => {
            return Err(ParleyError::Protocol(format!(
                "unknown message type {other:?}"
            )));
        }
    };
    let id = wire
        .id
        .ok_or_else(|| ParleyError::Protocol("message without id".into()))?;
    let created_at = parse_timestamp(
        wire.created_at
            .as_deref()
            .ok_or_else(|| ParleyError::Protocol("message without created_at".into()))?,
    )?;
    let local_id = wire
        .payload
        .as_ref()
        .and_then(|p| p.message_id)
        .unwrap_or(id);
    let agent = match direction {
        Direction::Agent => Some(AgentInfo {
            name: wire.name.clone().unwrap_or_default(),
            avatar: wire
                .payload
                .as_ref()
                .and_then(|p| p.avatar.clone())
                .unwrap_or_default(),
        }),
        Direction::Client => None,
    };
    let status = match direction {
        Direction::Client => Some(SendStatus::Sent),
        Direction::Agent => None,
    };
    let base = Message {
        id,
        local_id,
        created_at,
        direction,
        payload: Payload::text("", ""),
        status,
        agent,
    };

    let mut messages = Vec::new();

    if let Some(file) = &wire.file {
        match convert_file_part(file) {
            Ok(attachment) => messages.push(Message {
                payload: Payload::File(attachment),
                ..base.clone()
            }),
            Err(e) => debug!(message_id = id, error = %e, "dropping malformed file part"),
        }
    }

    if let Some(text) = wire.text.as_deref().filter(|t| !t.is_empty()) {
        let (text_message, embedded) = convert_text_part(wire, text, &base);
        messages.extend(embedded);
        if let Some(text_message) = text_message {
            messages.insert(0, text_message);
        }
    }

    Ok(messages)
}

fn convert_file_part(file: &crate::wire::WireFile) -> Result<FileAttachment, ParleyError> {
    let content = file
        .content
        .as_deref()
        .ok_or_else(|| ParleyError::Protocol("file without content".into()))?;
    let name = file
        .name
        .as_deref()
        .ok_or_else(|| ParleyError::Protocol("file without name".into()))?;
    Ok(FileAttachment::new(
        content,
        file.mime.as_deref().unwrap_or(""),
        file.size.as_deref().unwrap_or("0"),
        name,
    ))
}

/// Converts the prose part: extracts embedded images into sibling file
/// messages, then runs the text pipeline (buttons, redactor cleanup,
/// autolink, markdown) on what remains.
fn convert_text_part(
    wire: &WireMessage,
    text: &str,
    base: &Message,
) -> (Option<Message>, Vec<Message>) {
    let mut embedded = Vec::new();
    let mut remaining = text.to_string();
    while let Some(captures) = EMBEDDED_IMAGE.captures(&remaining) {
        let Some(whole) = captures.get(0) else { break };
        let url = captures.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
        let name = whole
            .as_str()
            .trim_start_matches("![")
            .split("](")
            .next()
            .unwrap_or("")
            .to_string();
        let range = whole.range();
        remaining.replace_range(range, "");
        embedded.push(Message {
            payload: Payload::File(FileAttachment::new(url, "image/*", "0", name)),
            ..base.clone()
        });
    }

    let buttons = match base.direction {
        Direction::Agent => extract_buttons(&remaining),
        Direction::Client => Vec::new(),
    };
    let feedback = wire.payload.as_ref().and_then(|p| {
        p.user_rating.as_deref().and_then(|r| match r {
            "LIKE" => Some(Feedback::Like),
            "DISLIKE" => Some(Feedback::Dislike),
            _ => None,
        })
    });
    let feedback_needed = base.direction == Direction::Agent
        && feedback.is_none()
        && wire
            .payload
            .as_ref()
            .and_then(|p| p.buttons.as_ref())
            .is_some_and(|buttons| {
                buttons.iter().any(|b| {
                    matches!(b.data.as_deref(), Some("GOOD_CHAT") | Some("BAD_CHAT"))
                        || matches!(b.icon.as_deref(), Some("like") | Some("dislike"))
                })
            });

    let cleaned = normalize_redactor_html(&remaining);
    let visible = strip_button_tokens(&cleaned, &buttons);
    let html = visible
        .split('\n')
        .map(|line| autolink_line(&convert_markdown_line(line)))
        .collect::<Vec<_>>()
        .join("<br>");

    if html.is_empty() && buttons.is_empty() {
        return (None, embedded);
    }

    let message = Message {
        payload: Payload::Text {
            text: visible,
            html,
            buttons,
            feedback_needed,
            feedback,
        },
        ..base.clone()
    };
    (Some(message), embedded)
}

/// Converts a batch, isolating failures to the offending message.
pub fn convert_batch(batch: &[WireMessage]) -> Vec<Message> {
    batch
        .iter()
        .flat_map(|wire| match convert_message(wire) {
            Ok(messages) => messages,
            Err(e) => {
                debug!(error = %e, "dropping malformed wire message");
                Vec::new()
            }
        })
        .collect()
}
