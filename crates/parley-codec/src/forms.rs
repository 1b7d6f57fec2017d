// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Form wire conversion: loaded field definitions and save-request bodies.

use serde_json::{Value, json};

use parley_core::{Field, Form, ListItem, TextFieldKind};

use crate::wire::{WireFormLoad, WireLoadedList};

/// Merges a form-definition load response into the form's placeholder
/// fields. Text fields pass through untouched; checkbox/list placeholders
/// are replaced by their loaded definitions. Unrecognized definitions are
/// dropped.
pub fn merge_loaded_fields(form: &Form, response: &WireFormLoad) -> Vec<Field> {
    let Some(defs) = &response.fields else {
        return form.fields.clone();
    };
    form.fields
        .iter()
        .flat_map(|field| match field {
            Field::Text { .. } => vec![field.clone()],
            _ => match defs.get(field.id()) {
                None => vec![],
                Some(def) => convert_definition(field, def),
            },
        })
        .collect()
}

fn convert_definition(placeholder: &Field, def: &Value) -> Vec<Field> {
    if def.get("list").is_some() {
        // Nested container: each entry is its own list definition.
        let Some(lists) = def.get("list").and_then(Value::as_object) else {
            return vec![];
        };
        return lists
            .values()
            .flat_map(|v| convert_definition(placeholder, v))
            .collect();
    }

    match def.get("ticket_field_type_id").and_then(Value::as_i64) {
        Some(3) => vec![Field::Checkbox {
            id: placeholder.id().to_string(),
            name: field_name(placeholder),
            required: placeholder.required(),
            checked: false,
            has_error: false,
        }],
        Some(1) => vec![Field::Text {
            id: placeholder.id().to_string(),
            name: field_name(placeholder),
            required: placeholder.required(),
            kind: TextFieldKind::Plain,
            text: String::new(),
            has_error: false,
        }],
        Some(2) => convert_list(placeholder, def),
        _ => vec![],
    }
}

fn convert_list(placeholder: &Field, def: &Value) -> Vec<Field> {
    let Ok(loaded) = serde_json::from_value::<WireLoadedList>(def.clone()) else {
        return vec![];
    };
    if loaded.children.is_empty() {
        return vec![];
    }
    let items = loaded
        .children
        .iter()
        .filter_map(|child| {
            Some(ListItem {
                id: child.id?,
                name: child.value.clone().unwrap_or_default(),
                parent_item_ids: child.parent_option_id.clone().unwrap_or_default(),
            })
        })
        .collect();
    vec![Field::List {
        id: placeholder.id().to_string(),
        name: field_name(placeholder),
        required: placeholder.required(),
        parent_id: loaded.parent_field_id,
        items,
        selected: None,
        has_error: false,
    }]
}

fn field_name(field: &Field) -> String {
    match field {
        Field::Text { name, .. } | Field::Checkbox { name, .. } | Field::List { name, .. } => {
            name.clone()
        }
    }
}

/// Serializes a validated form into the save-request field array.
///
/// Checkbox and text fields submit their raw value. A root list field with
/// children submits the whole parent/child chain as an id/value array; a
/// standalone list submits its selected item id; child lists are folded
/// into their root and submit nothing on their own.
pub fn form_save_fields(form: &Form) -> Vec<Value> {
    form.fields
        .iter()
        .filter_map(|field| {
            let value = match field {
                Field::Checkbox { checked, .. } => Some(Value::String(checked.to_string())),
                Field::Text { text, .. } => Some(Value::String(text.clone())),
                Field::List { id, parent_id, selected, .. } => {
                    if parent_id.is_some() {
                        None
                    } else {
                        let chain = form.list_chain(id);
                        if chain.len() <= 1 {
                            selected.map(|s| Value::String(s.to_string()))
                        } else {
                            Some(Value::Array(
                                chain
                                    .iter()
                                    .map(|list| {
                                        let selected = match list {
                                            Field::List { selected, .. } => {
                                                selected.map(|s| s.to_string()).unwrap_or_default()
                                            }
                                            _ => String::new(),
                                        };
                                        json!({ "id": list.id(), "value": selected })
                                    })
                                    .collect(),
                            ))
                        }
                    }
                }
            }?;
            Some(json!({
                "id": field.id(),
                "required": field.required(),
                "value": value,
            }))
        })
        .collect()
}
