// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Init handshake classification: chat session vs offline form.

use parley_core::{
    ChatInit, OFFLINE_FORM_STATUSES, OfflineFormFieldSpec, OfflineFormSettings, OfflineWorkType,
    ParleyError,
};

use crate::message::convert_batch;
use crate::wire::WireInit;

/// Outcome of an init handshake.
#[derive(Debug, Clone)]
pub enum InitOutcome {
    Chat(ChatInit),
    OfflineForm {
        settings: OfflineFormSettings,
        init: ChatInit,
    },
}

/// Converts an init response and decides whether the server expects an
/// offline form instead of a chat.
///
/// The form is expected when the work type says "check working times" and no
/// operators are available, when the callback-with-chat work type meets a
/// form-eligible ticket status, or when the work type is callback-only.
pub fn classify_init(wire: &WireInit) -> Result<InitOutcome, ParleyError> {
    let token = wire
        .token
        .clone()
        .ok_or_else(|| ParleyError::Protocol("init without token".into()))?;
    let init = ChatInit {
        token,
        status: wire.status,
        waiting_email: wire.waiting_email.unwrap_or(false),
        messages: convert_batch(wire.messages.as_deref().unwrap_or(&[])),
    };

    let Some(settings) = wire.callback_settings.as_ref().map(convert_settings) else {
        return Ok(InitOutcome::Chat(init));
    };

    let no_operators = wire.no_operators.unwrap_or(false);
    let form_expected = match settings.work_type {
        OfflineWorkType::CheckWorkingTimes => no_operators,
        OfflineWorkType::AlwaysEnabledCallbackWithChat => {
            OFFLINE_FORM_STATUSES.contains(&wire.status)
        }
        OfflineWorkType::AlwaysEnabledCallbackWithoutChat => true,
    };

    if form_expected {
        Ok(InitOutcome::OfflineForm { settings, init })
    } else {
        Ok(InitOutcome::Chat(init))
    }
}

fn convert_settings(wire: &crate::wire::WireCallbackSettings) -> OfflineFormSettings {
    let work_type = match wire.work_type.as_deref() {
        Some("ALWAYS_ENABLED_CALLBACK_WITH_CHAT") => OfflineWorkType::AlwaysEnabledCallbackWithChat,
        Some("ALWAYS_ENABLED_CALLBACK_WITHOUT_CHAT") => {
            OfflineWorkType::AlwaysEnabledCallbackWithoutChat
        }
        _ => OfflineWorkType::CheckWorkingTimes,
    };
    OfflineFormSettings {
        work_type,
        callback_title: wire.callback_title.clone().unwrap_or_default(),
        callback_greeting: wire.callback_greeting.clone().unwrap_or_default(),
        topics: wire
            .topics
            .iter()
            .filter(|t| t.checked.unwrap_or(false))
            .filter_map(|t| t.text.clone())
            .collect(),
        topics_required: wire.topics_required.unwrap_or(false),
        fields: wire
            .custom_fields
            .iter()
            .filter(|f| f.checked.unwrap_or(false))
            .filter_map(|f| {
                Some(OfflineFormFieldSpec {
                    key: f.key.clone()?,
                    title: f.placeholder.clone().unwrap_or_default(),
                    required: f.required.unwrap_or(false),
                })
            })
            .collect(),
    }
}
