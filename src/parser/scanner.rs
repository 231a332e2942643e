//! Source scanner: splits template text into text runs, outputs and block tags
//!
//! A `{` starts a block tag only when it is immediately followed by an
//! optional `/` and a head that some registered tag parser claims. Any other
//! brace is literal text, so CSS and JSON in templates pass through untouched.

use crate::error::ParseError;
use crate::parser::ast::Span;

/// Opening delimiter of a declaration header comment
pub const HEADER_OPEN: &str = "{#---";
/// A header comment ends here, not at the first `#}`
pub const HEADER_CLOSE: &str = "---#}";

/// One lexical unit of a template
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text
    Text { text: String, span: Span },
    /// `{{ expr }}`; `inner` is the expression source range
    Output { span: Span, inner: Span },
    /// `{head args}`, `{head args /}` or `{/head}`
    Tag(TagToken),
}

impl Segment {
    pub fn span(&self) -> &Span {
        match self {
            Segment::Text { span, .. } | Segment::Output { span, .. } => span,
            Segment::Tag(tag) => &tag.span,
        }
    }
}

/// A block tag as written in the source
#[derive(Debug, Clone, PartialEq)]
pub struct TagToken {
    /// Tag head without the leading slash, e.g. `x:card` or `slot`
    pub head: String,
    /// `{/head}`
    pub closing: bool,
    /// `{head ... /}`
    pub self_closing: bool,
    /// Argument text range (after the head, before `/}` or `}`)
    pub args: Span,
    /// Whole tag including braces
    pub span: Span,
}

impl TagToken {
    /// Argument source text
    pub fn args_source<'s>(&self, source: &'s str) -> &'s str {
        &source[self.args.clone()]
    }

    /// Display form used in diagnostics, e.g. `{/x:card}`
    pub fn display(&self) -> String {
        if self.closing {
            format!("{{/{}}}", self.head)
        } else {
            format!("{{{}}}", self.head)
        }
    }
}

fn is_head_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b':' | b'/')
}

/// Split `source` into segments; `claims` decides which tag heads are block tags
pub fn scan(source: &str, claims: impl Fn(&str) -> bool) -> Result<Vec<Segment>, ParseError> {
    let bytes = source.as_bytes();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }

        match bytes.get(i + 1) {
            Some(b'{') => {
                let end = find_output_end(bytes, i + 2).ok_or_else(|| {
                    ParseError::syntax(i..i + 2, "Unterminated output tag, expected '}}'")
                })?;
                push_text(&mut segments, source, text_start, i);
                segments.push(Segment::Output {
                    span: i..end + 2,
                    inner: i + 2..end,
                });
                i = end + 2;
                text_start = i;
            }
            Some(b'#') => {
                let (open, close) = if source[i..].starts_with(HEADER_OPEN) {
                    (HEADER_OPEN.len(), HEADER_CLOSE)
                } else {
                    (2, "#}")
                };
                let end = source[i + open..].find(close).ok_or_else(|| {
                    ParseError::syntax(
                        i..i + open,
                        format!("Unterminated comment, expected '{}'", close),
                    )
                })?;
                push_text(&mut segments, source, text_start, i);
                i = i + open + end + close.len();
                text_start = i;
            }
            _ => match scan_tag(source, i, &claims)? {
                Some(tag) => {
                    push_text(&mut segments, source, text_start, i);
                    i = tag.span.end;
                    text_start = i;
                    segments.push(Segment::Tag(tag));
                }
                None => i += 1,
            },
        }
    }

    push_text(&mut segments, source, text_start, bytes.len());
    Ok(segments)
}

fn push_text(segments: &mut Vec<Segment>, source: &str, start: usize, end: usize) {
    if start < end {
        segments.push(Segment::Text {
            text: source[start..end].to_string(),
            span: start..end,
        });
    }
}

/// Try to read a block tag starting at the `{` at `start`
fn scan_tag(
    source: &str,
    start: usize,
    claims: &impl Fn(&str) -> bool,
) -> Result<Option<TagToken>, ParseError> {
    let bytes = source.as_bytes();
    let mut j = start + 1;
    let closing = bytes.get(j) == Some(&b'/');
    if closing {
        j += 1;
    }

    let head_start = j;
    while j < bytes.len() && is_head_char(bytes[j]) {
        // `/}` ends a self-closing tag, it is not part of the head
        if bytes[j] == b'/' && bytes.get(j + 1) == Some(&b'}') {
            break;
        }
        j += 1;
    }
    let head = &source[head_start..j];
    if head.is_empty() || !claims(head) {
        return Ok(None);
    }
    match bytes.get(j) {
        Some(b) if b.is_ascii_whitespace() || *b == b'}' || *b == b'/' => {}
        None => {}
        _ => return Ok(None),
    }

    let close = find_tag_end(bytes, j).ok_or_else(|| {
        ParseError::syntax(
            start..j,
            format!("Unterminated tag '{{{}{}', expected '}}'", if closing { "/" } else { "" }, head),
        )
    })?;

    let raw = source[j..close].trim_end();
    let self_closing = raw.ends_with('/');
    let args_end = if self_closing {
        j + raw.len() - 1
    } else {
        j + raw.len()
    };
    let span = start..close + 1;

    if closing && (self_closing || !source[j..args_end].trim().is_empty()) {
        return Err(ParseError::syntax(
            span,
            format!("Closing tag '{{/{}}}' takes no arguments", head),
        ));
    }

    Ok(Some(TagToken {
        head: head.to_string(),
        closing,
        self_closing,
        args: j..args_end,
        span,
    }))
}

/// Index of the `}` closing a tag, skipping strings and nested braces
fn find_tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut k = from;
    while k < bytes.len() {
        let b = bytes[k];
        if let Some(q) = quote {
            if b == b'\\' {
                k += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
        } else {
            match b {
                b'"' | b'\'' => quote = Some(b),
                b'{' => depth += 1,
                b'}' if depth == 0 => return Some(k),
                b'}' => depth -= 1,
                _ => {}
            }
        }
        k += 1;
    }
    None
}

/// Index of the `}}` closing an output tag, skipping strings and map literals
fn find_output_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut k = from;
    while k < bytes.len() {
        let b = bytes[k];
        if let Some(q) = quote {
            if b == b'\\' {
                k += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
        } else {
            match b {
                b'"' | b'\'' => quote = Some(b),
                b'{' => depth += 1,
                b'}' if depth > 0 => depth -= 1,
                b'}' if bytes.get(k + 1) == Some(&b'}') => return Some(k),
                _ => {}
            }
        }
        k += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(head: &str) -> bool {
        head == "slot" || head == "x" || head.starts_with("x:")
    }

    fn scan_ok(source: &str) -> Vec<Segment> {
        scan(source, claims).expect("Should scan")
    }

    #[test]
    fn test_plain_text() {
        let segs = scan_ok("Hello world");
        assert_eq!(
            segs,
            vec![Segment::Text {
                text: "Hello world".to_string(),
                span: 0..11
            }]
        );
    }

    #[test]
    fn test_output_segment() {
        let segs = scan_ok("Hi {{ name }}!");
        assert_eq!(segs.len(), 3);
        match &segs[1] {
            Segment::Output { span, inner } => {
                assert_eq!(span, &(3..13));
                assert_eq!(&"Hi {{ name }}!"[inner.clone()], " name ");
            }
            other => panic!("Expected Output, got {:?}", other),
        }
    }

    #[test]
    fn test_output_with_map_literal() {
        let source = r#"{{ component("a", {b: {c: "}}"}}) }}"#;
        let segs = scan_ok(source);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].span(), &(0..source.len()));
    }

    #[test]
    fn test_comment_is_dropped() {
        let segs = scan_ok("a{# note #}b");
        assert_eq!(segs.len(), 2);
        assert!(matches!(&segs[0], Segment::Text { text, .. } if text == "a"));
        assert!(matches!(&segs[1], Segment::Text { text, .. } if text == "b"));
    }

    #[test]
    fn test_header_comment_ends_at_dashed_close() {
        let source = "{#---\ndescription = \"close with #} here\"\n---#}\n<p>body</p>";
        let segs = scan_ok(source);
        assert_eq!(segs.len(), 1);
        assert!(matches!(&segs[0], Segment::Text { text, .. } if text == "\n<p>body</p>"));
    }

    #[test]
    fn test_unterminated_header_is_error() {
        let err = scan("{#--- a = 1 #} text", claims).unwrap_err();
        assert_eq!(err.span(), &(0..5));
    }

    #[test]
    fn test_unclaimed_braces_are_text() {
        let source = ".card { color: red } {other}";
        let segs = scan_ok(source);
        assert_eq!(segs.len(), 1);
    }

    #[test]
    fn test_open_close_and_self_closing_tags() {
        let source = r#"{x:card title="a}"}{x:icon name="star" /}{/x:card}"#;
        let segs = scan_ok(source);
        assert_eq!(segs.len(), 3);
        match &segs[0] {
            Segment::Tag(tag) => {
                assert_eq!(tag.head, "x:card");
                assert!(!tag.closing);
                assert!(!tag.self_closing);
                assert_eq!(tag.args_source(source).trim(), r#"title="a}""#);
            }
            other => panic!("Expected Tag, got {:?}", other),
        }
        match &segs[1] {
            Segment::Tag(tag) => {
                assert_eq!(tag.head, "x:icon");
                assert!(tag.self_closing);
                assert_eq!(tag.args_source(source).trim(), r#"name="star""#);
            }
            other => panic!("Expected Tag, got {:?}", other),
        }
        match &segs[2] {
            Segment::Tag(tag) => {
                assert_eq!(tag.head, "x:card");
                assert!(tag.closing);
            }
            other => panic!("Expected Tag, got {:?}", other),
        }
    }

    #[test]
    fn test_slashed_component_name_head() {
        let segs = scan_ok("{x:forms/input/}");
        match &segs[0] {
            Segment::Tag(tag) => {
                assert_eq!(tag.head, "x:forms/input");
                assert!(tag.self_closing);
            }
            other => panic!("Expected Tag, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_output_is_error() {
        let err = scan("a {{ name", claims).unwrap_err();
        assert_eq!(err.span(), &(2..4));
    }

    #[test]
    fn test_unterminated_tag_is_error() {
        assert!(scan("{x:card title=\"a\"", claims).is_err());
    }

    #[test]
    fn test_unterminated_comment_is_error() {
        assert!(scan("{# never closed", claims).is_err());
    }

    #[test]
    fn test_closing_tag_with_arguments_is_error() {
        assert!(scan("{/slot footer}", claims).is_err());
    }
}
