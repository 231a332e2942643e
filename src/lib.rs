//! Template Components - reusable, file-backed template fragments
//!
//! Components live in files under configured roots and are addressed by
//! dotted or slashed names (`forms.input`, `forms/input`). A component file
//! may declare typed props and named slots in a TOML header, and is invoked
//! from templates with block tags:
//!
//! ```text
//! {x:card title="Welcome"}
//!     {slot footer}Bye{/slot}
//!     Hello
//! {/x:card}
//! ```
//!
//! # Example
//!
//! ```rust
//! use template_components::{ComponentConfig, Environment};
//!
//! let env = Environment::new(ComponentConfig::default()).unwrap();
//! let vars = serde_json::from_str(r#"{"name": "Ada"}"#).unwrap();
//! let out = env.render_str("Hello {{ name }}", vars).unwrap();
//! assert_eq!(out, "Hello Ada");
//! ```

pub mod component;
pub mod config;
pub mod environment;
pub mod error;
pub mod parser;
pub mod render;

use std::path::PathBuf;

use thiserror::Error;

pub use component::{
    ComponentDefinition, ComponentError, ComponentExtension, ComponentRegistry, PropSchema,
    SlotSchema,
};
pub use config::{ComponentConfig, ConfigError};
pub use environment::{Environment, Extension, TemplateFunction};
pub use error::ParseError;
pub use parser::{Template, TemplateParser};
pub use render::State;

use error::format_parse_errors;

/// Errors that can occur while compiling or rendering templates
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template failed to compile
    #[error("parse errors in {template}: {}", format_parse_errors(.errors))]
    Parse {
        template: String,
        errors: Vec<ParseError>,
    },

    /// Component lookup, validation or cycle failure
    #[error("{0}")]
    Component(#[from] ComponentError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("invalid arguments to {function}: {message}")]
    InvalidArguments { function: String, message: String },

    #[error("error reading template {path}: {message}")]
    Io { path: PathBuf, message: String },
}

/// Render template source with a fresh environment built from `config`
///
/// # Example
///
/// ```rust
/// use template_components::{render_with_config, ComponentConfig};
///
/// let out = render_with_config("{slot title}Untitled{/slot}", ComponentConfig::default()).unwrap();
/// assert_eq!(out, "Untitled");
/// ```
pub fn render_with_config(source: &str, config: ComponentConfig) -> Result<String, RenderError> {
    Environment::new(config)?.render_str(source, serde_json::Map::new())
}
