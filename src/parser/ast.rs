//! Abstract Syntax Tree types for component templates

use serde_json::Value;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// A compiled template: the node tree of one source text
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Name used in diagnostics (file path or caller-supplied label)
    pub name: String,
    pub nodes: Vec<Spanned<Node>>,
}

/// A node in a template body
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, emitted verbatim
    Text(String),
    /// Output expression: `{{ expr }}`
    Output(Spanned<Expr>),
    /// Component invocation: `{x:name attr=expr}...{/x:name}`
    Component(CallNode),
    /// Slot definition: `{slot name}...{/slot}`
    Slot(SlotNode),
}

/// How an invocation names the component it renders
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentName {
    /// Name written in the tag head: `{x:forms.input}`
    Literal(String),
    /// Name computed at render time: `{x name_var}`
    Dynamic(Spanned<Expr>),
}

/// A property passed in an invocation tag
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    /// `name=expr`, or bare `name` (value `true`)
    Named {
        name: Spanned<String>,
        value: Option<Spanned<Expr>>,
    },
    /// `...expr`, merges a map of props
    Spread(Spanned<Expr>),
}

/// Intermediate call node produced by the component tag parser
#[derive(Debug, Clone, PartialEq)]
pub struct CallNode {
    pub name: ComponentName,
    pub attrs: Vec<Attr>,
    /// Default slot content (everything except captured slots)
    pub body: Vec<Spanned<Node>>,
    /// Named slots defined directly in the body
    pub slots: Vec<Spanned<SlotNode>>,
}

/// Content-capture node produced by the slot tag parser
#[derive(Debug, Clone, PartialEq)]
pub struct SlotNode {
    pub name: Spanned<String>,
    pub body: Vec<Spanned<Node>>,
}

/// Host expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// String, number, boolean or null literal
    Literal(Value),
    /// Variable reference
    Var(String),
    /// `[a, b, c]`
    List(Vec<Spanned<Expr>>),
    /// `{key: value, ...}`
    Map(Vec<(String, Spanned<Expr>)>),
    /// `base.name`
    Attr(Box<Spanned<Expr>>, String),
    /// `base[index]`
    Index(Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    /// `name(args...)`
    Call {
        name: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },
    /// `left ~ right`
    Concat(Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    /// `left ?? right`
    Coalesce(Box<Spanned<Expr>>, Box<Spanned<Expr>>),
}

impl Expr {
    /// Shorthand for a string literal
    pub fn string(s: impl Into<String>) -> Self {
        Expr::Literal(Value::String(s.into()))
    }
}
