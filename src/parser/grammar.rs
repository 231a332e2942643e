//! Expression and tag-argument grammars using chumsky
//!
//! Block structure (text, outputs, nested tags) is handled by the scanner and
//! the block parser. This module only parses the token runs found inside
//! `{{ ... }}` and inside tag heads.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use serde_json::{Number, Value};

use crate::error::ParseError;
use crate::parser::ast::*;
use crate::parser::lexer::{tokenize, Token};

/// Helper enum for folding postfix accessors onto an atom
#[derive(Debug, Clone)]
enum Postfix {
    Attr(String),
    Index(Spanned<Expr>),
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

/// Whole numbers become JSON integers so they print without a fraction
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Lex `$source` (located at `$offset` in the template) and run `$parser` over it
macro_rules! run_parser {
    ($parser:expr, $source:expr, $offset:expr) => {{
        let tokens = tokenize($source, $offset).map_err(|e| vec![e])?;
        let end = $offset + $source.len();

        // Turn the token list into a stream that chumsky can use
        let token_stream = Stream::from_iter(
            tokens
                .into_iter()
                .map(|(tok, span)| (tok, SimpleSpan::from(span))),
        )
        .map((end..end).into(), |(t, s): (_, _)| (t, s));

        $parser
            .parse(token_stream)
            .into_result()
            .map_err(|errs| errs.into_iter().map(ParseError::from).collect::<Vec<_>>())
    }};
}

/// Parse a complete expression, e.g. the inside of `{{ ... }}`
pub fn parse_expression(source: &str, offset: usize) -> Result<Spanned<Expr>, Vec<ParseError>> {
    run_parser!(expression_parser().then_ignore(end()), source, offset)
}

/// Parse an attribute list: `title="Hi" kind=level disabled ...extra`
pub fn parse_attributes(source: &str, offset: usize) -> Result<Vec<Attr>, Vec<ParseError>> {
    run_parser!(attributes_parser().then_ignore(end()), source, offset)
}

/// Parse the arguments of a dynamic invocation: a name expression, then attributes
pub fn parse_dynamic_invocation(
    source: &str,
    offset: usize,
) -> Result<(Spanned<Expr>, Vec<Attr>), Vec<ParseError>> {
    run_parser!(
        expression_parser()
            .then(attributes_parser())
            .then_ignore(end()),
        source,
        offset
    )
}

/// Parse a slot name: an identifier or a quoted string
pub fn parse_slot_name(source: &str, offset: usize) -> Result<Spanned<String>, Vec<ParseError>> {
    run_parser!(slot_name_parser().then_ignore(end()), source, offset)
}

fn slot_name_parser<'a, I>() -> impl Parser<'a, I, Spanned<String>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    select! {
        Token::Ident(s) => s,
        Token::String(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())))
}

fn expression_parser<'a, I>() -> impl Parser<'a, I, Spanned<Expr>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let ident = select! {
            Token::Ident(s) => s,
        };

        let literal = select! {
            Token::String(s) => Expr::Literal(Value::String(s)),
            Token::Number(n) => Expr::Literal(number_value(n)),
            Token::True => Expr::Literal(Value::Bool(true)),
            Token::False => Expr::Literal(Value::Bool(false)),
            Token::Null => Expr::Literal(Value::Null),
        };

        let args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>();

        // [a, b, c]
        let list = args
            .clone()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map(Expr::List);

        // {key: value, "other key": value}
        let map_key = select! {
            Token::Ident(s) => s,
            Token::String(s) => s,
        };
        let map = map_key
            .then_ignore(just(Token::Colon))
            .then(expr.clone())
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
            .map(Expr::Map);

        // name(args...)
        let call = ident
            .clone()
            .map_with(|name, e| Spanned::new(name, span_range(&e.span())))
            .then(args.delimited_by(just(Token::ParenOpen), just(Token::ParenClose)))
            .map(|(name, args)| Expr::Call { name, args });

        let var = ident.clone().map(Expr::Var);

        // Order matters: call before var since both start with an identifier
        let atom = choice((literal, list, map, call, var))
            .map_with(|ex, e| Spanned::new(ex, span_range(&e.span())))
            .or(expr
                .clone()
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)));

        let postfix = choice((
            just(Token::Dot).ignore_then(ident).map(Postfix::Attr),
            expr.clone()
                .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
                .map(Postfix::Index),
        ))
        .map_with(|p, e| (p, span_range(&e.span())));

        let accessed = atom.foldl(postfix.repeated(), |base: Spanned<Expr>, (op, span)| {
            let full = base.span.start..span.end;
            let node = match op {
                Postfix::Attr(name) => Expr::Attr(Box::new(base), name),
                Postfix::Index(index) => Expr::Index(Box::new(base), Box::new(index)),
            };
            Spanned::new(node, full)
        });

        // a ~ b ~ c
        let concat = accessed.clone().foldl(
            just(Token::Tilde).ignore_then(accessed).repeated(),
            |left: Spanned<Expr>, right: Spanned<Expr>| {
                let span = left.span.start..right.span.end;
                Spanned::new(Expr::Concat(Box::new(left), Box::new(right)), span)
            },
        );

        // a ?? b binds loosest
        concat
            .clone()
            .foldl(
                just(Token::Coalesce).ignore_then(concat).repeated(),
                |left: Spanned<Expr>, right: Spanned<Expr>| {
                    let span = left.span.start..right.span.end;
                    Spanned::new(Expr::Coalesce(Box::new(left), Box::new(right)), span)
                },
            )
            .boxed()
    })
}

fn attributes_parser<'a, I>() -> impl Parser<'a, I, Vec<Attr>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let name = select! {
        Token::Ident(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    // name=expr, or a bare name meaning `true`
    let named = name
        .then(just(Token::Equals).ignore_then(expression_parser()).or_not())
        .map(|(name, value)| Attr::Named { name, value });

    // ...expr
    let spread = just(Token::Spread)
        .ignore_then(expression_parser())
        .map(Attr::Spread);

    choice((spread, named))
        .then_ignore(just(Token::Comma).or_not())
        .repeated()
        .collect::<Vec<_>>()
}
