//! Parser for component templates
//!
//! Layers, bottom-up: `lexer` tokens, `grammar` for expressions and tag
//! arguments, `scanner` for the raw segment list, and `block` for the node
//! tree with pluggable tag parsers.

pub mod ast;
pub mod block;
pub mod grammar;
pub mod lexer;
pub mod scanner;

pub use ast::*;
pub use block::{BlockParser, TagParser, TemplateParser};
pub use scanner::TagToken;
