//! Block-structure parser with pluggable tag parsers
//!
//! The scanner produces a flat list of segments. This parser turns it into a
//! node tree: text and outputs are handled here, and every block tag is handed
//! to the [`TagParser`] that claims its head.

use std::sync::Arc;

use crate::error::ParseError;
use crate::parser::ast::{Node, Spanned, Template};
use crate::parser::grammar;
use crate::parser::scanner::{scan, Segment, TagToken};

/// A grammar extension that turns one kind of block tag into a node
pub trait TagParser: Send + Sync {
    /// Balancing key: tags of the same kind nest inside each other
    fn kind(&self) -> &str;

    /// Whether this parser owns a tag head (closing tags are passed without the `/`)
    fn handles(&self, head: &str) -> bool;

    /// Parse an opening tag, consuming its body from `stream` when it has one
    fn parse(
        &self,
        tag: &TagToken,
        stream: &mut BlockParser<'_>,
    ) -> Result<Spanned<Node>, ParseError>;
}

/// Compiles template source using a fixed set of tag parsers
#[derive(Clone, Default)]
pub struct TemplateParser {
    tags: Vec<Arc<dyn TagParser>>,
}

impl std::fmt::Debug for TemplateParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateParser")
            .field("tags", &self.tags.iter().map(|t| t.kind()).collect::<Vec<_>>())
            .finish()
    }
}

impl TemplateParser {
    pub fn new(tags: Vec<Arc<dyn TagParser>>) -> Self {
        Self { tags }
    }

    /// Compile `source` into a template named `name`
    ///
    /// Compilation stops at the first error; no partial template is produced.
    pub fn parse(&self, name: &str, source: &str) -> Result<Template, Vec<ParseError>> {
        let segments = scan(source, |head| self.claims(head)).map_err(|e| vec![e])?;
        let end = segments.len();
        let mut stream = BlockParser {
            parser: self,
            source,
            segments,
            pos: 0,
            limit: end,
        };
        let nodes = stream.parse_range(end).map_err(|e| vec![e])?;
        Ok(Template {
            name: name.to_string(),
            nodes,
        })
    }

    fn claims(&self, head: &str) -> bool {
        self.tags.iter().any(|t| t.handles(head))
    }

    fn parser_for(&self, head: &str) -> Option<&Arc<dyn TagParser>> {
        self.tags.iter().find(|t| t.handles(head))
    }
}

/// Cursor over scanned segments, handed to tag parsers for body consumption
pub struct BlockParser<'p> {
    parser: &'p TemplateParser,
    source: &'p str,
    segments: Vec<Segment>,
    pos: usize,
    /// End of the block currently being parsed; nested lookups never cross it
    limit: usize,
}

impl<'p> BlockParser<'p> {
    /// Full template source; tag argument spans index into it
    pub fn source(&self) -> &'p str {
        self.source
    }

    /// Parse the body of `open` up to its matching closing tag of `kind`
    ///
    /// Returns the body nodes and the closing tag, which is consumed.
    pub fn parse_body(
        &mut self,
        open: &TagToken,
        kind: &str,
    ) -> Result<(Vec<Spanned<Node>>, TagToken), ParseError> {
        let end = self.find_block_end(kind).ok_or_else(|| {
            ParseError::syntax(
                open.span.clone(),
                format!("Unclosed tag '{}'", open.display()),
            )
        })?;

        let body = self.parse_range(end)?;

        let close = match &self.segments[end] {
            Segment::Tag(tag) => tag.clone(),
            other => {
                return Err(ParseError::syntax(
                    other.span().clone(),
                    format!("Expected closing tag for '{}'", open.display()),
                ))
            }
        };
        self.pos = end + 1;
        Ok((body, close))
    }

    /// Index of the closing tag matching the current block, found with a
    /// depth counter over tags of the same kind
    fn find_block_end(&self, kind: &str) -> Option<usize> {
        let mut depth = 0usize;
        for idx in self.pos..self.limit {
            let Segment::Tag(tag) = &self.segments[idx] else {
                continue;
            };
            let Some(tag_parser) = self.parser.parser_for(&tag.head) else {
                continue;
            };
            if tag_parser.kind() != kind {
                continue;
            }
            if tag.closing {
                if depth == 0 {
                    return Some(idx);
                }
                depth -= 1;
            } else if !tag.self_closing {
                depth += 1;
            }
        }
        None
    }

    fn parse_range(&mut self, end: usize) -> Result<Vec<Spanned<Node>>, ParseError> {
        let outer_limit = self.limit;
        self.limit = end;
        let result = self.parse_nodes(end);
        self.limit = outer_limit;
        result
    }

    fn parse_nodes(&mut self, end: usize) -> Result<Vec<Spanned<Node>>, ParseError> {
        let mut nodes = Vec::new();

        while self.pos < end {
            let segment = self.segments[self.pos].clone();
            self.pos += 1;

            match segment {
                Segment::Text { text, span } => {
                    nodes.push(Spanned::new(Node::Text(text), span));
                }
                Segment::Output { span, inner } => {
                    let expr = grammar::parse_expression(&self.source[inner.clone()], inner.start)
                        .map_err(|errs| first_error(errs, &span))?;
                    nodes.push(Spanned::new(Node::Output(expr), span));
                }
                Segment::Tag(tag) => {
                    if tag.closing {
                        return Err(ParseError::syntax(
                            tag.span.clone(),
                            format!("Unexpected closing tag '{}'", tag.display()),
                        ));
                    }
                    let tag_parser = self.parser.parser_for(&tag.head).cloned().ok_or_else(|| {
                        ParseError::syntax(
                            tag.span.clone(),
                            format!("Unknown tag '{}'", tag.display()),
                        )
                    })?;
                    nodes.push(tag_parser.parse(&tag, self)?);
                }
            }
        }

        Ok(nodes)
    }
}

/// Keep the first error of a failed sub-parse
pub(crate) fn first_error(errors: Vec<ParseError>, fallback: &std::ops::Range<usize>) -> ParseError {
    errors
        .into_iter()
        .next()
        .unwrap_or_else(|| ParseError::syntax(fallback.clone(), "Invalid syntax"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::SlotNode;

    /// Minimal block tag used to exercise balancing: `{wrap name}...{/wrap}`
    struct WrapTag;

    impl TagParser for WrapTag {
        fn kind(&self) -> &str {
            "wrap"
        }

        fn handles(&self, head: &str) -> bool {
            head == "wrap"
        }

        fn parse(
            &self,
            tag: &TagToken,
            stream: &mut BlockParser<'_>,
        ) -> Result<Spanned<Node>, ParseError> {
            let name = tag.args_source(stream.source()).trim().to_string();
            let name = Spanned::new(name, tag.args.clone());
            if tag.self_closing {
                return Ok(Spanned::new(
                    Node::Slot(SlotNode { name, body: vec![] }),
                    tag.span.clone(),
                ));
            }
            let (body, close) = stream.parse_body(tag, self.kind())?;
            Ok(Spanned::new(
                Node::Slot(SlotNode { name, body }),
                tag.span.start..close.span.end,
            ))
        }
    }

    fn parser() -> TemplateParser {
        TemplateParser::new(vec![Arc::new(WrapTag)])
    }

    #[test]
    fn test_text_and_output() {
        let template = parser().parse("t", "Hi {{ name }}").expect("Should parse");
        assert_eq!(template.nodes.len(), 2);
        assert!(matches!(template.nodes[0].node, Node::Text(_)));
        assert!(matches!(template.nodes[1].node, Node::Output(_)));
    }

    #[test]
    fn test_nested_same_kind_balances() {
        let template = parser()
            .parse("t", "{wrap a}1{wrap b}2{/wrap}3{/wrap}4")
            .expect("Should parse");
        assert_eq!(template.nodes.len(), 2);
        match &template.nodes[0].node {
            Node::Slot(outer) => {
                assert_eq!(outer.name.node, "a");
                assert_eq!(outer.body.len(), 3);
                match &outer.body[1].node {
                    Node::Slot(inner) => assert_eq!(inner.name.node, "b"),
                    other => panic!("Expected nested Slot, got {:?}", other),
                }
            }
            other => panic!("Expected Slot, got {:?}", other),
        }
    }

    #[test]
    fn test_self_closing_does_not_count_depth() {
        let template = parser()
            .parse("t", "{wrap a}{wrap b /}{/wrap}")
            .expect("Should parse");
        assert_eq!(template.nodes.len(), 1);
    }

    #[test]
    fn test_unclosed_tag_is_error() {
        let errors = parser().parse("t", "{wrap a}body").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Unclosed tag"));
    }

    #[test]
    fn test_stray_closing_tag_is_error() {
        let errors = parser().parse("t", "body{/wrap}").unwrap_err();
        assert!(errors[0].to_string().contains("Unexpected closing tag"));
    }

    #[test]
    fn test_bad_output_expression_is_error() {
        let errors = parser().parse("t", "{{ a b }}").unwrap_err();
        assert_eq!(errors.len(), 1);
    }
}
