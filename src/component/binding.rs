//! Prop validation and slot binding for one component render

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::registry::{ComponentDefinition, ComponentError};

/// Validate supplied props against the declared schema
///
/// Declared props come first in declaration order, undeclared ones follow in
/// the order they were supplied. Any supplied value, `null` included,
/// satisfies `required`.
pub fn bind_props(
    def: &ComponentDefinition,
    supplied: Map<String, Value>,
    strict: bool,
) -> Result<Map<String, Value>, ComponentError> {
    if strict {
        if let Some(unknown) = supplied.keys().find(|k| !def.props.contains(k)) {
            return Err(ComponentError::UnknownProp {
                component: def.name.clone(),
                prop: unknown.clone(),
            });
        }
    }

    let mut bound = Map::new();
    for prop in def.props.iter() {
        let value = match supplied.get(&prop.name) {
            Some(value) => {
                prop.check(value)
                    .map_err(|reason| ComponentError::InvalidProp {
                        component: def.name.clone(),
                        prop: prop.name.clone(),
                        reason,
                    })?;
                value.clone()
            }
            None => match &prop.default {
                Some(default) => default.clone(),
                None if prop.required => {
                    return Err(ComponentError::MissingRequiredProp {
                        component: def.name.clone(),
                        prop: prop.name.clone(),
                    })
                }
                None => Value::Null,
            },
        };
        bound.insert(prop.name.clone(), value);
    }

    for (name, value) in supplied {
        if !def.props.contains(&name) {
            bound.insert(name, value);
        }
    }

    Ok(bound)
}

/// Check required slots and give every declared slot a binding
///
/// A declared slot named after a default-slot alias is filled by the
/// default content.
pub fn bind_slots(
    def: &ComponentDefinition,
    content: Option<&str>,
    mut supplied: BTreeMap<String, String>,
    is_default: impl Fn(&str) -> bool,
) -> Result<BTreeMap<String, String>, ComponentError> {
    let blank = |text: &str| text.trim().is_empty();
    for slot in def.slots.iter() {
        let named = supplied.get(&slot.name).is_some_and(|text| !blank(text));
        let default = is_default(&slot.name) && content.is_some_and(|text| !blank(text));
        if slot.required && !named && !default {
            return Err(ComponentError::MissingRequiredSlot {
                component: def.name.clone(),
                slot: slot.name.clone(),
            });
        }
        let fill = match content {
            Some(text) if default && !named => text.to_string(),
            _ => String::new(),
        };
        let entry = supplied.entry(slot.name.clone()).or_default();
        if entry.trim().is_empty() {
            *entry = fill;
        }
    }
    Ok(supplied)
}
