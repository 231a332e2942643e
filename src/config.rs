//! Component configuration
//!
//! Loaded from the `[components]` table of a TOML file:
//!
//! ```toml
//! [components]
//! roots = ["templates/_components"]
//! extensions = ["tpl", "html"]
//! strict_props = false
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Settings for discovery, syntax and rendering of components
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentConfig {
    /// Directories searched in order; the first match wins
    pub roots: Vec<PathBuf>,
    /// File extensions tried in order, without the dot
    pub extensions: Vec<String>,
    /// Reject undeclared props for every component
    pub strict_props: bool,
    /// Invocation tag keyword: `{x:name}`
    pub tag: String,
    /// Slot tag keyword: `{slot name}`
    pub slot_tag: String,
    /// Name of the render function
    pub render_function: String,
    /// Extra names for the render function
    pub function_aliases: Vec<String>,
    /// Slot names that address the default content
    pub default_slot_aliases: Vec<String>,
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from("components")],
            extensions: vec!["tpl".to_string()],
            strict_props: false,
            tag: "x".to_string(),
            slot_tag: "slot".to_string(),
            render_function: "component".to_string(),
            function_aliases: vec!["c".to_string()],
            default_slot_aliases: vec!["default".to_string(), "content".to_string()],
        }
    }
}

/// TOML structure for deserializing config files
#[derive(Deserialize)]
struct TomlConfig {
    components: Option<TomlComponents>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlComponents {
    roots: Option<Vec<PathBuf>>,
    extensions: Option<Vec<String>>,
    strict_props: Option<bool>,
    tag: Option<String>,
    slot_tag: Option<String>,
    render_function: Option<String>,
    function_aliases: Option<Vec<String>>,
    default_slot_aliases: Option<Vec<String>>,
}

impl ComponentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from a TOML file
    ///
    /// Relative roots are resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        if let Some(base) = path.parent() {
            config.roots = config
                .roots
                .into_iter()
                .map(|root| if root.is_relative() { base.join(root) } else { root })
                .collect();
        }
        Ok(config)
    }

    /// Load config from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let defaults = Self::default();

        let Some(c) = parsed.components else {
            return Ok(defaults);
        };

        let config = Self {
            roots: c.roots.unwrap_or(defaults.roots),
            extensions: c.extensions.unwrap_or(defaults.extensions),
            strict_props: c.strict_props.unwrap_or(defaults.strict_props),
            tag: c.tag.unwrap_or(defaults.tag),
            slot_tag: c.slot_tag.unwrap_or(defaults.slot_tag),
            render_function: c.render_function.unwrap_or(defaults.render_function),
            function_aliases: c.function_aliases.unwrap_or(defaults.function_aliases),
            default_slot_aliases: c.default_slot_aliases.unwrap_or(defaults.default_slot_aliases),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that tag keywords and names are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let keyword = |s: &str| {
            !s.is_empty()
                && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        };
        if !keyword(&self.tag) {
            return Err(ConfigError::Invalid(format!("tag '{}' is not a keyword", self.tag)));
        }
        if !keyword(&self.slot_tag) {
            return Err(ConfigError::Invalid(format!(
                "slot_tag '{}' is not a keyword",
                self.slot_tag
            )));
        }
        if self.tag == self.slot_tag {
            return Err(ConfigError::Invalid(
                "tag and slot_tag must differ".to_string(),
            ));
        }
        if self.extensions.iter().any(|e| e.is_empty() || e.starts_with('.')) {
            return Err(ConfigError::Invalid(
                "extensions are given without a leading dot".to_string(),
            ));
        }
        Ok(())
    }

    /// Replace the component roots
    pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = roots;
        self
    }

    /// Search `root` before the configured roots
    pub fn with_root_first(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.insert(0, root.into());
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_strict_props(mut self, strict: bool) -> Self {
        self.strict_props = strict;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_slot_tag(mut self, slot_tag: impl Into<String>) -> Self {
        self.slot_tag = slot_tag.into();
        self
    }

    pub fn with_render_function(mut self, name: impl Into<String>) -> Self {
        self.render_function = name.into();
        self
    }

    pub fn with_function_aliases(mut self, aliases: Vec<String>) -> Self {
        self.function_aliases = aliases;
        self
    }

    pub fn with_default_slot_aliases(mut self, aliases: Vec<String>) -> Self {
        self.default_slot_aliases = aliases;
        self
    }

    /// Whether a slot name addresses the default content
    pub fn is_default_slot(&self, name: &str) -> bool {
        self.default_slot_aliases.iter().any(|a| a == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ComponentConfig::default();
        assert_eq!(config.roots, vec![PathBuf::from("components")]);
        assert_eq!(config.extensions, vec!["tpl"]);
        assert_eq!(config.tag, "x");
        assert_eq!(config.function_aliases, vec!["c"]);
        assert!(config.is_default_slot("content"));
        assert!(!config.is_default_slot("footer"));
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(ComponentConfig::from_str("").unwrap(), ComponentConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = ComponentConfig::from_str(
            r#"
[components]
roots = ["a", "b"]
extensions = ["html"]
strict_props = true
tag = "ui"
"#,
        )
        .unwrap();
        assert_eq!(config.roots, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(config.extensions, vec!["html"]);
        assert!(config.strict_props);
        assert_eq!(config.tag, "ui");
        assert_eq!(config.slot_tag, "slot");
    }

    #[test]
    fn test_unknown_key_is_error() {
        let err = ComponentConfig::from_str("[components]\nroot = \"a\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_invalid_values() {
        assert!(ComponentConfig::from_str("[components]\ntag = \"x:y\"\n").is_err());
        assert!(ComponentConfig::from_str("[components]\ntag = \"slot\"\n").is_err());
        assert!(ComponentConfig::from_str("[components]\nextensions = [\".tpl\"]\n").is_err());
    }

    #[test]
    fn test_from_file_resolves_relative_roots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("components.toml");
        std::fs::write(&path, "[components]\nroots = [\"ui\", \"/abs/ui\"]\n").unwrap();

        let config = ComponentConfig::from_file(&path).unwrap();
        assert_eq!(
            config.roots,
            vec![dir.path().join("ui"), PathBuf::from("/abs/ui")]
        );
    }

    #[test]
    fn test_builders() {
        let config = ComponentConfig::new()
            .with_roots(vec![PathBuf::from("b")])
            .with_root_first("a")
            .with_strict_props(true)
            .with_function_aliases(vec![]);
        assert_eq!(config.roots, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert!(config.strict_props);
        assert!(config.function_aliases.is_empty());
    }
}
