//! The component extension: tag parsers plus the template function surface

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::ComponentConfig;
use crate::environment::{Extension, TemplateFunction};
use crate::parser::TagParser;
use crate::render::{display_value, State};
use crate::RenderError;

use super::schema::value_type_name;
use super::tags::{ComponentTagParser, SlotTagParser};

/// Registers `{x:...}` and `{slot ...}` tags and the component functions
#[derive(Debug, Clone)]
pub struct ComponentExtension {
    tag: String,
    slot_tag: String,
    render_function: String,
    function_aliases: Vec<String>,
    default_slot_aliases: Vec<String>,
}

impl ComponentExtension {
    pub fn new(config: &ComponentConfig) -> Self {
        Self {
            tag: config.tag.clone(),
            slot_tag: config.slot_tag.clone(),
            render_function: config.render_function.clone(),
            function_aliases: config.function_aliases.clone(),
            default_slot_aliases: config.default_slot_aliases.clone(),
        }
    }
}

impl Extension for ComponentExtension {
    fn name(&self) -> &str {
        "components"
    }

    fn functions(&self) -> Vec<(String, TemplateFunction)> {
        let mut functions: Vec<(String, TemplateFunction)> =
            std::iter::once(&self.render_function)
                .chain(&self.function_aliases)
                .map(|name| {
                    let called = name.clone();
                    let render = function(move |state, args| component(&called, state, args));
                    (name.clone(), render)
                })
                .collect();
        let has: TemplateFunction = Arc::new(has_component);
        let props: TemplateFunction = Arc::new(component_props);
        let slots: TemplateFunction = Arc::new(component_slots);
        functions.push(("hasComponent".to_string(), has));
        functions.push(("componentProps".to_string(), props));
        functions.push(("componentSlots".to_string(), slots));
        functions
    }

    fn tag_parsers(&self) -> Vec<Arc<dyn TagParser>> {
        vec![
            Arc::new(ComponentTagParser::new(
                self.tag.clone(),
                self.default_slot_aliases.clone(),
            )),
            Arc::new(SlotTagParser::new(self.slot_tag.clone())),
        ]
    }
}

fn function<F>(f: F) -> TemplateFunction
where
    F: Fn(&mut State<'_>, Vec<Value>) -> Result<Value, RenderError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn invalid(function: &str, message: String) -> RenderError {
    RenderError::InvalidArguments {
        function: function.to_string(),
        message,
    }
}

fn name_arg(function: &str, arg: Option<Value>) -> Result<String, RenderError> {
    match arg {
        Some(Value::String(name)) => Ok(name),
        Some(other) => Err(invalid(
            function,
            format!("component name must be a string, got {}", value_type_name(&other)),
        )),
        None => Err(invalid(function, "missing component name".to_string())),
    }
}

/// `component(name, props = {}, content = null, slots = {})`
///
/// `called` is the name the function was invoked by. Content and slot values
/// are trimmed like captured tag bodies.
fn component(
    called: &str,
    state: &mut State<'_>,
    args: Vec<Value>,
) -> Result<Value, RenderError> {
    if args.len() > 4 {
        return Err(invalid(
            called,
            format!("expected at most 4 arguments, got {}", args.len()),
        ));
    }
    let mut args = args.into_iter();

    let name = name_arg(called, args.next())?;

    let props = match args.next() {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(invalid(
                called,
                format!("props must be a map, got {}", value_type_name(&other)),
            ))
        }
    };

    let content = match args.next() {
        None | Some(Value::Null) => None,
        Some(value) => {
            let text = display_value(&value).trim().to_string();
            (!text.is_empty()).then_some(text)
        }
    };

    let slots: BTreeMap<String, String> = match args.next() {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(map)) => map
            .into_iter()
            .map(|(slot, value)| (slot, display_value(&value).trim().to_string()))
            .collect(),
        Some(other) => {
            return Err(invalid(
                called,
                format!("slots must be a map, got {}", value_type_name(&other)),
            ))
        }
    };

    state
        .render_component(&name, props, content, slots)
        .map(Value::String)
}

/// `hasComponent(name)`; anything that is not a resolvable name is `false`
fn has_component(state: &mut State<'_>, args: Vec<Value>) -> Result<Value, RenderError> {
    let exists = match args.first() {
        Some(Value::String(name)) => state.env().has_component(name),
        _ => false,
    };
    Ok(Value::Bool(exists))
}

/// `componentProps(name)`: prop name to `{type, required, default, values, description}`
fn component_props(state: &mut State<'_>, args: Vec<Value>) -> Result<Value, RenderError> {
    let name = name_arg("componentProps", args.into_iter().next())?;
    Ok(state.env().component_props(&name)?.to_value())
}

/// `componentSlots(name)`: slot name to `{required, description}`
fn component_slots(state: &mut State<'_>, args: Vec<Value>) -> Result<Value, RenderError> {
    let name = name_arg("componentSlots", args.into_iter().next())?;
    Ok(state.env().component_slots(&name)?.to_value())
}
