//! Declared props and slots of a component
//!
//! A component file may start with a declaration header: a template comment
//! delimited by `{#---` and `---#}` holding TOML.
//!
//! ```text
//! {#---
//! description = "Dismissible alert"
//!
//! [props.message]
//! type = "string"
//! required = true
//!
//! [slots.footer]
//! description = "Optional footer"
//! ---#}
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::parser::scanner::{HEADER_CLOSE, HEADER_OPEN};

/// Problems found in a declaration header
#[derive(Error, Debug)]
pub enum DeclarationError {
    #[error("unterminated declaration header, expected '---#}}'")]
    Unterminated,
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("prop '{prop}': {message}")]
    Prop { prop: String, message: String },
    #[error("slot '{slot}': {message}")]
    Slot { slot: String, message: String },
}

/// Accepted value type of a prop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    Any,
}

impl PropType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropType::String => "string",
            PropType::Number => "number",
            PropType::Boolean => "boolean",
            PropType::Array => "array",
            PropType::Object => "object",
            PropType::Any => "any",
        }
    }

    /// Whether a non-null value has this type
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            PropType::String => value.is_string(),
            PropType::Number => value.is_number(),
            PropType::Boolean => value.is_boolean(),
            PropType::Array => value.is_array(),
            PropType::Object => value.is_object(),
            PropType::Any => true,
        }
    }
}

impl FromStr for PropType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" | "str" => Ok(PropType::String),
            "number" | "int" | "integer" | "float" => Ok(PropType::Number),
            "boolean" | "bool" => Ok(PropType::Boolean),
            "array" | "list" => Ok(PropType::Array),
            "object" | "map" => Ok(PropType::Object),
            "any" | "mixed" => Ok(PropType::Any),
            other => Err(format!("unknown type '{}'", other)),
        }
    }
}

impl fmt::Display for PropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a JSON value's type, for diagnostics
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One declared prop
#[derive(Debug, Clone, PartialEq)]
pub struct PropDef {
    pub name: String,
    pub prop_type: PropType,
    pub required: bool,
    pub default: Option<Value>,
    /// Allow-list of accepted values
    pub values: Option<Vec<Value>>,
    pub description: Option<String>,
}

impl PropDef {
    /// Check a supplied value; `null` always passes
    ///
    /// Returns the reason on failure.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return Ok(());
        }
        if !self.prop_type.matches(value) {
            return Err(format!(
                "expected {}, got {}",
                self.prop_type,
                value_type_name(value)
            ));
        }
        if let Some(values) = &self.values {
            if !values.contains(value) {
                let allowed = values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(format!("{} is not one of [{}]", value, allowed));
            }
        }
        Ok(())
    }

    pub fn to_value(&self) -> Value {
        json!({
            "type": self.prop_type.as_str(),
            "required": self.required,
            "default": self.default.clone().unwrap_or(Value::Null),
            "values": self.values.clone().map(Value::Array).unwrap_or(Value::Null),
            "description": self.description,
        })
    }
}

/// Ordered list of declared props
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropSchema {
    pub props: Vec<PropDef>,
}

impl PropSchema {
    pub fn get(&self, name: &str) -> Option<&PropDef> {
        self.props.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropDef> {
        self.props.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.props.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// Map of prop name to its description object
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .props
            .iter()
            .map(|p| (p.name.clone(), p.to_value()))
            .collect();
        Value::Object(map)
    }
}

/// One declared named slot
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDef {
    pub name: String,
    pub required: bool,
    pub description: Option<String>,
}

/// Ordered list of declared slots; the default slot is implicit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotSchema {
    pub slots: Vec<SlotDef>,
}

impl SlotSchema {
    pub fn get(&self, name: &str) -> Option<&SlotDef> {
        self.slots.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlotDef> {
        self.slots.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .slots
            .iter()
            .map(|s| {
                (
                    s.name.clone(),
                    json!({ "required": s.required, "description": s.description }),
                )
            })
            .collect();
        Value::Object(map)
    }
}

/// Everything a declaration header states about a component
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Declaration {
    pub description: Option<String>,
    /// Reject undeclared props for this component
    pub strict: bool,
    pub props: PropSchema,
    pub slots: SlotSchema,
}

/// TOML structure for deserializing declaration headers
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlHeader {
    description: Option<String>,
    #[serde(default)]
    strict: bool,
    // Tables rather than typed maps so entry order survives
    #[serde(default)]
    props: toml::Table,
    #[serde(default)]
    slots: toml::Table,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlProp {
    #[serde(rename = "type")]
    prop_type: Option<String>,
    #[serde(default)]
    required: bool,
    default: Option<toml::Value>,
    values: Option<Vec<toml::Value>>,
    description: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlSlot {
    #[serde(default)]
    required: bool,
    description: Option<String>,
}

/// Header body of `source`, if the file starts with one
pub fn split_header(source: &str) -> Result<Option<&str>, DeclarationError> {
    let Some(rest) = source.trim_start().strip_prefix(HEADER_OPEN) else {
        return Ok(None);
    };
    let end = rest.find(HEADER_CLOSE).ok_or(DeclarationError::Unterminated)?;
    Ok(Some(&rest[..end]))
}

impl Declaration {
    /// Read the declaration header of a component source
    ///
    /// A source without a header declares nothing.
    pub fn from_source(source: &str) -> Result<Self, DeclarationError> {
        match split_header(source)? {
            Some(header) => Self::from_toml(header),
            None => Ok(Self::default()),
        }
    }

    /// Parse a header body
    pub fn from_toml(content: &str) -> Result<Self, DeclarationError> {
        let parsed: TomlHeader = toml::from_str(content)?;

        let mut props = Vec::with_capacity(parsed.props.len());
        for (name, entry) in parsed.props {
            props.push(prop_def(name, entry)?);
        }

        let mut slots = Vec::with_capacity(parsed.slots.len());
        for (name, entry) in parsed.slots {
            let slot: TomlSlot = entry.try_into().map_err(|e: toml::de::Error| {
                DeclarationError::Slot {
                    slot: name.clone(),
                    message: e.message().to_string(),
                }
            })?;
            slots.push(SlotDef {
                name,
                required: slot.required,
                description: slot.description,
            });
        }

        Ok(Declaration {
            description: parsed.description,
            strict: parsed.strict,
            props: PropSchema { props },
            slots: SlotSchema { slots },
        })
    }
}

fn prop_def(name: String, entry: toml::Value) -> Result<PropDef, DeclarationError> {
    let fail = |message: String| DeclarationError::Prop {
        prop: name.clone(),
        message,
    };

    let prop: TomlProp = entry
        .try_into()
        .map_err(|e: toml::de::Error| fail(e.message().to_string()))?;

    let prop_type = match &prop.prop_type {
        Some(t) => t.parse::<PropType>().map_err(&fail)?,
        None => PropType::Any,
    };
    let default = prop.default.map(to_json).transpose().map_err(&fail)?;
    let values = prop
        .values
        .map(|vs| vs.into_iter().map(to_json).collect::<Result<Vec<_>, _>>())
        .transpose()
        .map_err(&fail)?;

    let def = PropDef {
        name: name.clone(),
        prop_type,
        required: prop.required,
        default,
        values,
        description: prop.description,
    };

    if let Some(default) = &def.default {
        def.check(default)
            .map_err(|reason| fail(format!("invalid default: {}", reason)))?;
    }

    Ok(def)
}

fn to_json(value: toml::Value) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}
