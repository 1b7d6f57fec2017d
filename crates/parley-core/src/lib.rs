// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parley chat engine.
//!
//! This crate provides the message model, the error taxonomy, and the seam
//! traits ([`ChatApi`], [`CacheStore`]) the session engine is built against.
//! The transport and storage crates implement these traits; the engine crate
//! consumes them.

pub mod error;
pub mod form;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ParleyError;
pub use form::{Field, Form, FormState, ListItem, TextFieldKind};
pub use traits::{CacheStore, ChatApi, TransportEvent};
pub use types::{
    ACTIVE_STATUSES, AgentInfo, ChatConfig, ChatInit, ConnectionState, Direction, Feedback,
    FileAttachment, FileInfo, FileKind, Message, MessageButton, MessageDraft,
    OFFLINE_FORM_STATUSES, OfflineForm, OfflineFormField, OfflineFormFieldSpec,
    OfflineFormSettings, OfflineWorkType, Payload, SavedFormValues, SendStatus,
};
