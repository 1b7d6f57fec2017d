// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `{{button:...}}` control token extraction.
//!
//! Agent messages may embed buttons as literal tokens of the form
//! `{{button:text;url;type;show}}`. The token is removed from the visible
//! text: a `show` button leaves its text inline, a `noshow` button leaves
//! nothing.

use parley_core::MessageButton;

const TOKEN_OPEN: &str = "{{button:";
const TOKEN_CLOSE: &str = "}}";

/// Extracts every well-formed button token from `text`, in order.
/// Malformed tokens (wrong section count) are skipped.
pub fn extract_buttons(text: &str) -> Vec<MessageButton> {
    let mut buttons = Vec::new();
    let mut search_from = 0;
    while let Some(open) = text[search_from..].find(TOKEN_OPEN) {
        let start = search_from + open;
        let Some(close) = text[start..].find(TOKEN_CLOSE) else {
            break;
        };
        let raw = &text[start + TOKEN_OPEN.len()..start + close];
        if let Some(button) = parse_button(raw) {
            buttons.push(button);
        }
        search_from = start + close + TOKEN_CLOSE.len();
    }
    buttons
}

/// Replaces each button's literal token in `text`: visible buttons by their
/// text, hidden ones by nothing.
pub fn strip_button_tokens(text: &str, buttons: &[MessageButton]) -> String {
    let mut out = text.to_string();
    for button in buttons {
        let show = if button.show { "show" } else { "noshow" };
        let raw = format!(
            "{{{{button:{};{};{};{}}}}}",
            button.text, button.url, button.kind, show
        );
        let replacement = if button.show { button.text.as_str() } else { "" };
        out = out.replacen(&raw, replacement, 1);
    }
    out
}

fn parse_button(raw: &str) -> Option<MessageButton> {
    let sections: Vec<&str> = raw.split(';').collect();
    match sections.as_slice() {
        [text, url, kind, show] => Some(MessageButton {
            text: (*text).to_string(),
            url: (*url).to_string(),
            kind: (*kind).to_string(),
            show: *show == "show",
        }),
        _ => None,
    }
}
