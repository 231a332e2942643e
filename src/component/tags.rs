//! Tag parsers for component invocations and slot definitions

use crate::error::ParseError;
use crate::parser::block::first_error;
use crate::parser::grammar::{parse_attributes, parse_dynamic_invocation, parse_slot_name};
use crate::parser::{BlockParser, CallNode, ComponentName, Node, SlotNode, Spanned, TagParser, TagToken};

use super::registry::normalize_name;

/// Balancing key for invocation tags
pub const COMPONENT_KIND: &str = "component";
/// Balancing key for slot tags
pub const SLOT_KIND: &str = "slot";

/// Parses `{x:name attrs}body{/x:name}`, `{x:name attrs /}` and `{x expr attrs}body{/x}`
#[derive(Debug, Clone)]
pub struct ComponentTagParser {
    tag: String,
    default_slot_aliases: Vec<String>,
}

impl ComponentTagParser {
    pub fn new(tag: impl Into<String>, default_slot_aliases: Vec<String>) -> Self {
        Self {
            tag: tag.into(),
            default_slot_aliases,
        }
    }

    /// Component name written after `tag:`, if the head has one
    fn literal_name<'h>(&self, head: &'h str) -> Option<&'h str> {
        head.strip_prefix(self.tag.as_str())?
            .strip_prefix(':')
            .filter(|name| !name.is_empty())
    }

    fn is_default_alias(&self, name: &str) -> bool {
        self.default_slot_aliases.iter().any(|a| a == name)
    }

    /// Check that `close` ends the invocation opened by `open`
    fn check_close(
        &self,
        open: &TagToken,
        name: &ComponentName,
        close: &TagToken,
    ) -> Result<(), ParseError> {
        let matches = match (name, self.literal_name(&close.head)) {
            // `{/x}` closes anything
            (_, None) => true,
            (ComponentName::Literal(opened), Some(closed)) => {
                normalize_name(closed).as_deref() == Some(opened.as_str())
            }
            (ComponentName::Dynamic(_), Some(_)) => false,
        };
        if matches {
            Ok(())
        } else {
            Err(ParseError::syntax(
                close.span.clone(),
                format!(
                    "Closing tag '{}' does not match '{}'",
                    close.display(),
                    open.display()
                ),
            ))
        }
    }

    /// Split direct-child slot definitions out of an invocation body
    ///
    /// Slots named after the default slot are spliced back in place.
    fn partition(
        &self,
        nodes: Vec<Spanned<Node>>,
    ) -> (Vec<Spanned<Node>>, Vec<Spanned<SlotNode>>) {
        let mut body = Vec::new();
        let mut slots = Vec::new();
        for node in nodes {
            match node.node {
                Node::Slot(slot) if self.is_default_alias(&slot.name.node) => {
                    body.extend(slot.body);
                }
                Node::Slot(slot) => slots.push(Spanned::new(slot, node.span)),
                other => body.push(Spanned::new(other, node.span)),
            }
        }
        (body, slots)
    }
}

impl TagParser for ComponentTagParser {
    fn kind(&self) -> &str {
        COMPONENT_KIND
    }

    fn handles(&self, head: &str) -> bool {
        head == self.tag || self.literal_name(head).is_some()
    }

    fn parse(
        &self,
        tag: &TagToken,
        stream: &mut BlockParser<'_>,
    ) -> Result<Spanned<Node>, ParseError> {
        let args = tag.args_source(stream.source());
        let offset = tag.args.start;

        let (name, attrs) = match self.literal_name(&tag.head) {
            Some(written) => {
                let canonical = normalize_name(written).ok_or_else(|| {
                    ParseError::syntax(
                        tag.span.clone(),
                        format!("Invalid component name '{}'", written),
                    )
                })?;
                let attrs = parse_attributes(args, offset)
                    .map_err(|errs| first_error(errs, &tag.span))?;
                (ComponentName::Literal(canonical), attrs)
            }
            None => {
                if args.trim().is_empty() {
                    return Err(ParseError::syntax(
                        tag.span.clone(),
                        format!("'{}' needs a component name expression", tag.display()),
                    ));
                }
                let (expr, attrs) = parse_dynamic_invocation(args, offset)
                    .map_err(|errs| first_error(errs, &tag.span))?;
                (ComponentName::Dynamic(expr), attrs)
            }
        };

        if tag.self_closing {
            let call = CallNode {
                name,
                attrs,
                body: Vec::new(),
                slots: Vec::new(),
            };
            return Ok(Spanned::new(Node::Component(call), tag.span.clone()));
        }

        let (nodes, close) = stream.parse_body(tag, COMPONENT_KIND)?;
        self.check_close(tag, &name, &close)?;
        let (body, slots) = self.partition(nodes);

        let call = CallNode {
            name,
            attrs,
            body,
            slots,
        };
        Ok(Spanned::new(
            Node::Component(call),
            tag.span.start..close.span.end,
        ))
    }
}

/// Parses `{slot name}body{/slot}` and `{slot name /}`
#[derive(Debug, Clone)]
pub struct SlotTagParser {
    tag: String,
}

impl SlotTagParser {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

impl TagParser for SlotTagParser {
    fn kind(&self) -> &str {
        SLOT_KIND
    }

    fn handles(&self, head: &str) -> bool {
        head == self.tag
    }

    fn parse(
        &self,
        tag: &TagToken,
        stream: &mut BlockParser<'_>,
    ) -> Result<Spanned<Node>, ParseError> {
        let name = parse_slot_name(tag.args_source(stream.source()), tag.args.start)
            .map_err(|errs| first_error(errs, &tag.span))?;

        if tag.self_closing {
            let slot = SlotNode {
                name,
                body: Vec::new(),
            };
            return Ok(Spanned::new(Node::Slot(slot), tag.span.clone()));
        }

        let (body, close) = stream.parse_body(tag, SLOT_KIND)?;
        Ok(Spanned::new(
            Node::Slot(SlotNode { name, body }),
            tag.span.start..close.span.end,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Attr, Expr, TemplateParser};
    use std::sync::Arc;

    fn parser() -> TemplateParser {
        TemplateParser::new(vec![
            Arc::new(ComponentTagParser::new(
                "x",
                vec!["default".to_string(), "content".to_string()],
            )),
            Arc::new(SlotTagParser::new("slot")),
        ])
    }

    fn single_call(source: &str) -> CallNode {
        let template = parser().parse("test", source).expect("Should parse");
        assert_eq!(template.nodes.len(), 1, "nodes: {:?}", template.nodes);
        match template.nodes.into_iter().next().map(|n| n.node) {
            Some(Node::Component(call)) => call,
            other => panic!("Expected Component, got {:?}", other),
        }
    }

    fn text_of(nodes: &[Spanned<Node>]) -> String {
        nodes
            .iter()
            .map(|n| match &n.node {
                Node::Text(t) => t.clone(),
                other => format!("<{:?}>", other),
            })
            .collect()
    }

    #[test]
    fn test_self_closing_invocation() {
        let call = single_call(r#"{x:alert message="Saved" /}"#);
        assert_eq!(call.name, ComponentName::Literal("alert".to_string()));
        assert_eq!(call.attrs.len(), 1);
        assert!(call.body.is_empty());
        assert!(call.slots.is_empty());
    }

    #[test]
    fn test_slashed_name_is_canonicalized() {
        let call = single_call("{x:forms/input}{/x:forms.input}");
        assert_eq!(call.name, ComponentName::Literal("forms.input".to_string()));
    }

    #[test]
    fn test_generic_close() {
        let call = single_call("{x:card}Hi{/x}");
        assert_eq!(text_of(&call.body), "Hi");
    }

    #[test]
    fn test_slot_routing() {
        let call = single_call("{x:card}{slot footer}Bye{/slot}Hello{/x:card}");
        assert_eq!(text_of(&call.body), "Hello");
        assert_eq!(call.slots.len(), 1);
        assert_eq!(call.slots[0].node.name.node, "footer");
        assert_eq!(text_of(&call.slots[0].node.body), "Bye");
    }

    #[test]
    fn test_default_alias_slot_is_spliced() {
        let call = single_call("{x:card}A{slot content}B{/slot}C{/x:card}");
        assert!(call.slots.is_empty());
        assert_eq!(text_of(&call.body), "ABC");
    }

    #[test]
    fn test_nested_invocation_keeps_its_own_slots() {
        let call = single_call(
            "{x:outer}{x:inner}{slot title}T{/slot}{/x:inner}{slot side}S{/slot}{/x:outer}",
        );
        assert_eq!(call.slots.len(), 1);
        assert_eq!(call.slots[0].node.name.node, "side");
        match &call.body[0].node {
            Node::Component(inner) => {
                assert_eq!(inner.name, ComponentName::Literal("inner".to_string()));
                assert_eq!(inner.slots.len(), 1);
                assert_eq!(inner.slots[0].node.name.node, "title");
            }
            other => panic!("Expected nested Component, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_same_component_balances() {
        let call = single_call("{x:box}a{x:box}b{/x:box}c{/x:box}");
        assert_eq!(call.body.len(), 3);
    }

    #[test]
    fn test_dynamic_invocation() {
        let call = single_call(r#"{x kind ~ "-card" title="T"}body{/x}"#);
        match &call.name {
            ComponentName::Dynamic(expr) => assert!(matches!(expr.node, Expr::Concat(_, _))),
            other => panic!("Expected Dynamic, got {:?}", other),
        }
        assert_eq!(call.attrs.len(), 1);
    }

    #[test]
    fn test_attribute_forms() {
        let call = single_call(r#"{x:btn label="Go", disabled ...extra size=2 /}"#);
        assert_eq!(call.attrs.len(), 4);
        assert!(matches!(&call.attrs[1], Attr::Named { value: None, .. }));
        assert!(matches!(&call.attrs[2], Attr::Spread(_)));
    }

    #[test]
    fn test_slot_outside_invocation_is_kept() {
        let template = parser()
            .parse("test", "{slot header}Title{/slot}")
            .expect("Should parse");
        assert!(matches!(template.nodes[0].node, Node::Slot(_)));
    }

    #[test]
    fn test_self_closing_slot_with_string_name() {
        let template = parser()
            .parse("test", r#"{slot "side bar" /}"#)
            .expect("Should parse");
        match &template.nodes[0].node {
            Node::Slot(slot) => {
                assert_eq!(slot.name.node, "side bar");
                assert!(slot.body.is_empty());
            }
            other => panic!("Expected Slot, got {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_close_is_error() {
        let errors = parser().parse("test", "{x:card}body{/x:panel}").unwrap_err();
        assert!(errors[0].to_string().contains("does not match"));
    }

    #[test]
    fn test_unclosed_invocation_is_error() {
        let errors = parser().parse("test", "{x:card}body").unwrap_err();
        assert!(errors[0].to_string().contains("Unclosed tag"));
    }

    #[test]
    fn test_interleaved_tags_are_error() {
        assert!(parser()
            .parse("test", "{x:card}{slot a}{/x:card}{/slot}")
            .is_err());
    }

    #[test]
    fn test_missing_slot_name_is_error() {
        assert!(parser().parse("test", "{slot}body{/slot}").is_err());
    }

    #[test]
    fn test_dynamic_without_name_is_error() {
        assert!(parser().parse("test", "{x}body{/x}").is_err());
    }

    #[test]
    fn test_bad_attribute_span_points_into_source() {
        let source = "{x:card title= /}";
        let errors = parser().parse("test", source).unwrap_err();
        let span = errors[0].span();
        assert!(span.start >= 8 && span.end <= source.len());
    }

    #[test]
    fn test_other_braces_are_text() {
        let template = parser()
            .parse("test", "a {xylophone} {x-ray} b")
            .expect("Should parse");
        assert_eq!(text_of(&template.nodes), "a {xylophone} {x-ray} b");
    }
}
