//! Render state: variable scope, component frames and the resolution chain

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::component::binding::{bind_props, bind_slots};
use crate::component::registry::{normalize_name, ComponentError};
use crate::environment::Environment;
use crate::parser::{Attr, CallNode, ComponentName, Expr, Node, SlotNode, Spanned, Template};
use crate::RenderError;

use super::value::{display_value, get_attr, get_index};

/// Slot content supplied to the component currently rendering
#[derive(Debug, Clone)]
struct Frame {
    content: Option<String>,
    slots: BTreeMap<String, String>,
}

/// Evaluation state of a single render call
///
/// Every public render entry point builds a fresh `State`, so nothing here is
/// shared between threads.
pub struct State<'env> {
    env: &'env Environment,
    vars: Map<String, Value>,
    frames: Vec<Frame>,
    /// Canonical names of the components being rendered, outermost first
    chain: Vec<String>,
}

impl<'env> State<'env> {
    pub fn new(env: &'env Environment, vars: Map<String, Value>) -> Self {
        Self {
            env,
            vars,
            frames: Vec::new(),
            chain: Vec::new(),
        }
    }

    pub fn env(&self) -> &'env Environment {
        self.env
    }

    /// Render a whole template in the current scope
    pub fn render_template(&mut self, template: &Template) -> Result<String, RenderError> {
        let mut out = String::new();
        self.render_nodes(&template.nodes, &mut out)?;
        Ok(out)
    }

    fn render_nodes(&mut self, nodes: &[Spanned<Node>], out: &mut String) -> Result<(), RenderError> {
        for node in nodes {
            match &node.node {
                Node::Text(text) => out.push_str(text),
                Node::Output(expr) => {
                    let value = self.eval(expr)?;
                    out.push_str(&display_value(&value));
                }
                Node::Component(call) => {
                    let rendered = self.render_call(call)?;
                    out.push_str(&rendered);
                }
                Node::Slot(slot) => self.render_outlet(slot, out)?,
            }
        }
        Ok(())
    }

    /// Render nodes into a fresh buffer and trim it
    fn capture(&mut self, nodes: &[Spanned<Node>]) -> Result<String, RenderError> {
        let mut buf = String::new();
        self.render_nodes(nodes, &mut buf)?;
        Ok(buf.trim().to_string())
    }

    /// A slot tag that was not captured by an invocation
    ///
    /// Inside a component it emits the supplied content, falling back to its
    /// own body. Outside any component the body passes through.
    fn render_outlet(&mut self, slot: &SlotNode, out: &mut String) -> Result<(), RenderError> {
        let supplied = self.frames.last().and_then(|frame| {
            if self.env.config().is_default_slot(&slot.name.node) {
                frame.content.clone()
            } else {
                frame.slots.get(&slot.name.node).cloned()
            }
        });

        match supplied.filter(|s| !s.trim().is_empty()) {
            Some(text) => {
                out.push_str(&text);
                Ok(())
            }
            None => self.render_nodes(&slot.body, out),
        }
    }

    /// Evaluate an invocation in the caller scope and render its component
    fn render_call(&mut self, call: &CallNode) -> Result<String, RenderError> {
        let name = match &call.name {
            ComponentName::Literal(name) => name.clone(),
            ComponentName::Dynamic(expr) => match self.eval(expr)? {
                Value::String(name) => name,
                other => {
                    return Err(RenderError::InvalidArguments {
                        function: self.env.config().tag.clone(),
                        message: format!("component name must be a string, got {}", other),
                    })
                }
            },
        };

        let props = self.eval_attrs(&call.attrs)?;

        let content = self.capture(&call.body)?;
        let content = (!content.is_empty()).then_some(content);

        let mut slots: BTreeMap<String, String> = BTreeMap::new();
        for slot in &call.slots {
            let rendered = self.capture(&slot.node.body)?;
            slots
                .entry(slot.node.name.node.clone())
                .or_default()
                .push_str(&rendered);
        }

        self.render_component(&name, props, content, slots)
    }

    fn eval_attrs(&mut self, attrs: &[Attr]) -> Result<Map<String, Value>, RenderError> {
        let mut props = Map::new();
        for attr in attrs {
            match attr {
                Attr::Named { name, value } => {
                    let value = match value {
                        Some(expr) => self.eval(expr)?,
                        None => Value::Bool(true),
                    };
                    props.insert(name.node.clone(), value);
                }
                Attr::Spread(expr) => match self.eval(expr)? {
                    Value::Object(map) => props.extend(map),
                    Value::Null => {}
                    other => {
                        return Err(RenderError::InvalidArguments {
                            function: "...".to_string(),
                            message: format!("can only spread a map, got {}", other),
                        })
                    }
                },
            }
        }
        Ok(props)
    }

    /// Resolve, validate and render a component in an isolated scope
    ///
    /// The output is trimmed.
    pub fn render_component(
        &mut self,
        name: &str,
        props: Map<String, Value>,
        content: Option<String>,
        slots: BTreeMap<String, String>,
    ) -> Result<String, RenderError> {
        let not_found = || ComponentError::NotFound {
            name: name.to_string(),
        };
        let canonical = normalize_name(name).ok_or_else(not_found)?;

        if self.chain.contains(&canonical) {
            let mut chain = self.chain.clone();
            chain.push(canonical);
            return Err(ComponentError::CircularReference {
                chain: chain.join(" -> "),
            }
            .into());
        }

        let def = self
            .env
            .registry()
            .get_component(&canonical)?
            .ok_or_else(not_found)?;

        debug!(component = %def.name, depth = self.chain.len(), "rendering component");

        let strict = self.env.config().strict_props || def.strict;
        let props = bind_props(&def, props, strict)?;
        let config = self.env.config();
        let slots = bind_slots(&def, content.as_deref(), slots, |slot| {
            config.is_default_slot(slot)
        })?;

        let mut vars = self.env.globals().clone();
        vars.extend(props.clone());
        vars.insert("props".to_string(), Value::Object(props));
        vars.insert(
            "content".to_string(),
            content.clone().map(Value::String).unwrap_or(Value::Null),
        );
        vars.insert(
            "slots".to_string(),
            Value::Object(
                slots
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        );

        let caller_vars = std::mem::replace(&mut self.vars, vars);
        self.frames.push(Frame { content, slots });
        self.chain.push(canonical);

        let mut out = String::new();
        let result = self.render_nodes(&def.template.nodes, &mut out);

        self.chain.pop();
        self.frames.pop();
        self.vars = caller_vars;

        result?;
        Ok(out.trim().to_string())
    }

    /// Evaluate a host expression
    pub fn eval(&mut self, expr: &Spanned<Expr>) -> Result<Value, RenderError> {
        match &expr.node {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Var(name) => Ok(self.vars.get(name).cloned().unwrap_or(Value::Null)),
            Expr::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(values))
            }
            Expr::Map(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    let value = self.eval(value)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::Object(map))
            }
            Expr::Attr(base, name) => {
                let base = self.eval(base)?;
                Ok(get_attr(&base, name))
            }
            Expr::Index(base, index) => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                Ok(get_index(&base, &index))
            }
            Expr::Call { name, args } => {
                let env = self.env;
                let function = env
                    .function(&name.node)
                    .ok_or_else(|| RenderError::UnknownFunction {
                        name: name.node.clone(),
                    })?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                (**function)(self, args)
            }
            Expr::Concat(left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(Value::String(display_value(&left) + &display_value(&right)))
            }
            Expr::Coalesce(left, right) => match self.eval(left)? {
                Value::Null => self.eval(right),
                value => Ok(value),
            },
        }
    }
}
