// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dynamic form model: a server-described set of fields attached to a
//! specific agent message, with local validation.

use serde::{Deserialize, Serialize};

/// Form lifecycle. `Loaded` may additionally carry per-field `has_error`
/// flags after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormState {
    NotLoaded,
    Loaded,
    Sending,
    Sent,
}

/// Validation flavor of a text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextFieldKind {
    Plain,
    Email,
    Phone,
}

/// One selectable item of a list field. `parent_item_ids` restricts the item
/// to specific selections of the parent list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: i64,
    pub name: String,
    pub parent_item_ids: Vec<i64>,
}

/// A single form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    Text {
        id: String,
        name: String,
        required: bool,
        kind: TextFieldKind,
        text: String,
        has_error: bool,
    },
    Checkbox {
        id: String,
        name: String,
        required: bool,
        checked: bool,
        has_error: bool,
    },
    List {
        id: String,
        name: String,
        required: bool,
        /// Id of the parent list field for hierarchical selects.
        parent_id: Option<String>,
        items: Vec<ListItem>,
        selected: Option<i64>,
        has_error: bool,
    },
}

impl Field {
    pub fn id(&self) -> &str {
        match self {
            Field::Text { id, .. } | Field::Checkbox { id, .. } | Field::List { id, .. } => id,
        }
    }

    pub fn required(&self) -> bool {
        match self {
            Field::Text { required, .. }
            | Field::Checkbox { required, .. }
            | Field::List { required, .. } => *required,
        }
    }

    pub fn has_error(&self) -> bool {
        match self {
            Field::Text { has_error, .. }
            | Field::Checkbox { has_error, .. }
            | Field::List { has_error, .. } => *has_error,
        }
    }

    /// Raw value as persisted in the flattened field-value map.
    pub fn stored_value(&self) -> Option<String> {
        match self {
            Field::Text { text, .. } => Some(text.trim().to_string()),
            Field::Checkbox { checked, .. } => Some(checked.to_string()),
            Field::List { selected, .. } => selected.map(|id| id.to_string()),
        }
    }

    /// Restores a persisted raw value into the field.
    pub fn restore_value(&mut self, value: &str) {
        match self {
            Field::Text { text, .. } => *text = value.to_string(),
            Field::Checkbox { checked, .. } => *checked = value == "true",
            Field::List { items, selected, .. } => {
                *selected = value
                    .parse::<i64>()
                    .ok()
                    .filter(|id| items.iter().any(|item| item.id == *id));
            }
        }
    }
}

/// A dynamic form keyed by the owning agent message id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    /// Id of the agent message the form is attached to.
    pub id: i64,
    pub fields: Vec<Field>,
    pub state: FormState,
}

impl Form {
    pub fn new(message_id: i64, fields: Vec<Field>) -> Self {
        Self {
            id: message_id,
            fields,
            state: FormState::NotLoaded,
        }
    }

    /// Validates every field, returning a copy with `has_error` flags set.
    pub fn validate(&self) -> Form {
        let fields = self
            .fields
            .iter()
            .map(|field| {
                let mut field = field.clone();
                let valid = match &field {
                    Field::Checkbox { required, checked, .. } => !required || *checked,
                    Field::List { required, selected, .. } => !required || selected.is_some(),
                    Field::Text { required, kind, text, .. } => match kind {
                        TextFieldKind::Email => {
                            if *required {
                                is_valid_email(text)
                            } else {
                                text.is_empty() || is_valid_email(text)
                            }
                        }
                        TextFieldKind::Phone => {
                            if *required {
                                is_valid_phone(text)
                            } else {
                                text.is_empty() || is_valid_phone(text)
                            }
                        }
                        TextFieldKind::Plain => {
                            !required || text.chars().any(char::is_alphanumeric)
                        }
                    },
                };
                match &mut field {
                    Field::Text { has_error, .. }
                    | Field::Checkbox { has_error, .. }
                    | Field::List { has_error, .. } => *has_error = !valid,
                }
                field
            })
            .collect();
        Form {
            fields,
            ..self.clone()
        }
    }

    pub fn has_errors(&self) -> bool {
        self.fields.iter().any(Field::has_error)
    }

    /// Walks the parent/child chain starting from a root list field, in
    /// selection order. Used when serializing hierarchical selects.
    pub fn list_chain(&self, root_id: &str) -> Vec<&Field> {
        let mut chain = Vec::new();
        let mut current = self.fields.iter().find(|f| f.id() == root_id);
        while let Some(field @ Field::List { id, .. }) = current {
            chain.push(field);
            current = self.fields.iter().find(|f| {
                matches!(f, Field::List { parent_id: Some(p), .. } if p == id)
            });
        }
        chain
    }
}

fn is_valid_email(text: &str) -> bool {
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !text.contains(char::is_whitespace)
}

fn is_valid_phone(text: &str) -> bool {
    let digits = text.chars().filter(char::is_ascii_digit).count();
    digits >= 7
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
}
