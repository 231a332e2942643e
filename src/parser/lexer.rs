//! Lexer for expressions and tag arguments using logos

use logos::Logos;

use crate::error::ParseError;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Literal keywords
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Operators (longer patterns first)
    #[token("...")]
    Spread,
    #[token("??")]
    Coalesce,
    #[token("~")]
    Tilde,
    #[token("=")]
    Equals,
    #[token(".")]
    Dot,

    // Delimiters
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,

    // Identifiers may contain inner dashes so attributes like `aria-label` work
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*(-[a-zA-Z0-9_]+)*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unescape(lex.slice()))]
    String(String),

    #[regex(r"-?[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
}

/// Strip the quotes from a string literal and resolve backslash escapes
fn unescape(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Lex input string into tokens with spans
///
/// `offset` is the position of `input` inside the enclosing template, so the
/// returned spans point into the full source.
pub fn tokenize(input: &str, offset: usize) -> Result<Vec<(Token, Span)>, ParseError> {
    let mut tokens = Vec::new();
    for (tok, span) in Token::lexer(input).spanned() {
        let span = (span.start + offset)..(span.end + offset);
        match tok {
            Ok(t) => tokens.push((t, span)),
            Err(()) => {
                let text = &input[(span.start - offset)..(span.end - offset)];
                return Err(ParseError::syntax(
                    span,
                    format!("Unexpected character '{}'", text),
                ));
            }
        }
    }
    Ok(tokens)
}

/// Human-readable token description for diagnostics
pub fn describe(tok: &Token) -> String {
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::String(s) => format!("string \"{}\"", s),
        Token::Number(n) => format!("number {}", n),
        Token::True => "'true'".to_string(),
        Token::False => "'false'".to_string(),
        Token::Null => "'null'".to_string(),
        Token::Spread => "'...'".to_string(),
        Token::Coalesce => "'??'".to_string(),
        Token::Tilde => "'~'".to_string(),
        Token::Equals => "'='".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::BraceOpen => "'{'".to_string(),
        Token::BraceClose => "'}'".to_string(),
        Token::BracketOpen => "'['".to_string(),
        Token::BracketClose => "']'".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Colon => "':'".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input, 0)
            .expect("Should lex")
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_literal_keywords() {
        assert_eq!(
            kinds("true false null"),
            vec![Token::True, Token::False, Token::Null]
        );
    }

    #[test]
    fn test_identifiers_and_strings() {
        assert_eq!(
            kinds(r#"title "my name" 'single'"#),
            vec![
                Token::Ident("title".to_string()),
                Token::String("my name".to_string()),
                Token::String("single".to_string()),
            ]
        );
    }

    #[test]
    fn test_dashed_identifier() {
        assert_eq!(
            kinds("aria-label=x"),
            vec![
                Token::Ident("aria-label".to_string()),
                Token::Equals,
                Token::Ident("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""say \"hi\"\n""#),
            vec![Token::String("say \"hi\"\n".to_string())]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 3.5 -10"),
            vec![Token::Number(42.0), Token::Number(3.5), Token::Number(-10.0)]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("...props a ?? b ~ c ."),
            vec![
                Token::Spread,
                Token::Ident("props".to_string()),
                Token::Ident("a".to_string()),
                Token::Coalesce,
                Token::Ident("b".to_string()),
                Token::Tilde,
                Token::Ident("c".to_string()),
                Token::Dot,
            ]
        );
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(
            kinds("{ } [ ] ( ) , :"),
            vec![
                Token::BraceOpen,
                Token::BraceClose,
                Token::BracketOpen,
                Token::BracketClose,
                Token::ParenOpen,
                Token::ParenClose,
                Token::Comma,
                Token::Colon,
            ]
        );
    }

    #[test]
    fn test_spans_are_offset() {
        let tokens = tokenize("a b", 10).expect("Should lex");
        assert_eq!(tokens[0].1, 10..11);
        assert_eq!(tokens[1].1, 12..13);
    }

    #[test]
    fn test_invalid_character_is_error() {
        let err = tokenize("a # b", 5).unwrap_err();
        match err {
            ParseError::Syntax { span, message, .. } => {
                assert_eq!(span, 7..8);
                assert!(message.contains('#'));
            }
        }
    }

    #[test]
    fn test_slash_is_not_an_operator() {
        assert!(tokenize("a / b", 0).is_err());
    }
}
