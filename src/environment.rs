//! Template environment: grammar, functions, globals and the component registry

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::component::registry::{ComponentDefinition, ComponentError, ComponentRegistry};
use crate::component::schema::{PropSchema, SlotSchema};
use crate::component::ComponentExtension;
use crate::config::{ComponentConfig, ConfigError};
use crate::parser::{TagParser, Template, TemplateParser};
use crate::render::State;
use crate::RenderError;

/// A function callable from template expressions
///
/// It receives the live render state so that rendering functions extend the
/// current resolution chain.
pub type TemplateFunction =
    Arc<dyn Fn(&mut State<'_>, Vec<Value>) -> Result<Value, RenderError> + Send + Sync>;

/// A bundle of functions and tag parsers plugged into an [`Environment`]
pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    fn functions(&self) -> Vec<(String, TemplateFunction)>;

    fn tag_parsers(&self) -> Vec<Arc<dyn TagParser>>;
}

/// Compiles and renders templates with components available
///
/// `Environment` is `Send + Sync`; renders on different threads share the
/// registry cache.
pub struct Environment {
    config: ComponentConfig,
    parser: Arc<TemplateParser>,
    registry: ComponentRegistry,
    functions: HashMap<String, TemplateFunction>,
    globals: Map<String, Value>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut functions: Vec<&String> = self.functions.keys().collect();
        functions.sort();
        f.debug_struct("Environment")
            .field("config", &self.config)
            .field("parser", &self.parser)
            .field("functions", &functions)
            .field("globals", &self.globals)
            .finish()
    }
}

impl Environment {
    /// Environment with the component extension only
    pub fn new(config: ComponentConfig) -> Result<Self, ConfigError> {
        Self::with_extensions(config, Vec::new())
    }

    /// Environment with the component extension followed by `extensions`
    ///
    /// A later extension's function replaces an earlier one with the same name.
    /// Fails if `config` does not pass [`ComponentConfig::validate`].
    pub fn with_extensions(
        config: ComponentConfig,
        extensions: Vec<Box<dyn Extension>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let components: Box<dyn Extension> = Box::new(ComponentExtension::new(&config));

        let mut tags: Vec<Arc<dyn TagParser>> = Vec::new();
        let mut functions = HashMap::new();
        for extension in std::iter::once(components).chain(extensions) {
            debug!(extension = extension.name(), "registering extension");
            tags.extend(extension.tag_parsers());
            functions.extend(extension.functions());
        }

        let parser = Arc::new(TemplateParser::new(tags));
        let registry = ComponentRegistry::new(
            config.roots.clone(),
            config.extensions.clone(),
            Arc::clone(&parser),
        );

        Ok(Self {
            config,
            parser,
            registry,
            functions,
            globals: Map::new(),
        })
    }

    pub fn config(&self) -> &ComponentConfig {
        &self.config
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Variables visible in every template and every component
    pub fn globals(&self) -> &Map<String, Value> {
        &self.globals
    }

    pub fn add_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    pub fn add_function<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&mut State<'_>, Vec<Value>) -> Result<Value, RenderError> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    pub fn function(&self, name: &str) -> Option<&TemplateFunction> {
        self.functions.get(name)
    }

    /// Compile template source; `name` labels diagnostics
    pub fn compile(&self, name: &str, source: &str) -> Result<Template, RenderError> {
        self.parser
            .parse(name, source)
            .map_err(|errors| RenderError::Parse {
                template: name.to_string(),
                errors,
            })
    }

    /// Render a compiled template with `vars` layered over the globals
    pub fn render_template(
        &self,
        template: &Template,
        vars: Map<String, Value>,
    ) -> Result<String, RenderError> {
        let mut scope = self.globals.clone();
        scope.extend(vars);
        State::new(self, scope).render_template(template)
    }

    /// Compile and render template source
    pub fn render_str(&self, source: &str, vars: Map<String, Value>) -> Result<String, RenderError> {
        let template = self.compile("<string>", source)?;
        self.render_template(&template, vars)
    }

    /// Compile and render a template file
    pub fn render_file(&self, path: &Path, vars: Map<String, Value>) -> Result<String, RenderError> {
        let source = std::fs::read_to_string(path).map_err(|e| RenderError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let template = self.compile(&path.display().to_string(), &source)?;
        self.render_template(&template, vars)
    }

    /// Render a component by name
    ///
    /// `content` fills the default slot; `slots` fills named slots.
    pub fn render(
        &self,
        name: &str,
        props: Map<String, Value>,
        content: Option<String>,
        slots: BTreeMap<String, String>,
    ) -> Result<String, RenderError> {
        State::new(self, Map::new()).render_component(name, props, content, slots)
    }

    /// Whether a component resolves; never fails
    pub fn has_component(&self, name: &str) -> bool {
        self.registry.has_component(name)
    }

    pub fn get_component(
        &self,
        name: &str,
    ) -> Result<Option<Arc<ComponentDefinition>>, ComponentError> {
        self.registry.get_component(name)
    }

    /// Declared props; empty when the component does not exist
    pub fn component_props(&self, name: &str) -> Result<PropSchema, ComponentError> {
        Ok(self
            .registry
            .get_component(name)?
            .map(|def| def.props.clone())
            .unwrap_or_default())
    }

    /// Declared slots; empty when the component does not exist
    pub fn component_slots(&self, name: &str) -> Result<SlotSchema, ComponentError> {
        Ok(self
            .registry
            .get_component(name)?
            .map(|def| def.slots.clone())
            .unwrap_or_default())
    }
}
