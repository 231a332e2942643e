//! Component discovery: resolves names to compiled, cached definitions

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::error::{format_parse_errors, ParseError};
use crate::parser::{Template, TemplateParser};

use super::schema::{Declaration, PropSchema, SlotSchema};

/// Errors that can occur while resolving or rendering components
#[derive(Debug, Error)]
pub enum ComponentError {
    /// No file resolves for the name
    #[error("component not found: {name}")]
    NotFound { name: String },

    /// Declaration header could not be parsed
    #[error("malformed declaration in component {name} ({path}): {message}")]
    MalformedDeclaration {
        name: String,
        path: PathBuf,
        message: String,
    },

    #[error("missing required prop '{prop}' for component {component}")]
    MissingRequiredProp { component: String, prop: String },

    #[error("unknown prop '{prop}' for strict component {component}")]
    UnknownProp { component: String, prop: String },

    #[error("invalid prop '{prop}' for component {component}: {reason}")]
    InvalidProp {
        component: String,
        prop: String,
        reason: String,
    },

    #[error("missing required slot '{slot}' for component {component}")]
    MissingRequiredSlot { component: String, slot: String },

    /// Component renders itself, directly or through others
    #[error("circular component reference detected: {chain}")]
    CircularReference { chain: String },

    /// Component template failed to compile
    #[error("syntax error in component {name}: {}", format_parse_errors(.errors))]
    Syntax {
        name: String,
        path: PathBuf,
        errors: Vec<ParseError>,
    },

    #[error("error reading component file {path}: {message}")]
    FileRead { path: PathBuf, message: String },
}

/// A resolved, compiled component
#[derive(Debug, Clone)]
pub struct ComponentDefinition {
    /// Canonical dotted name
    pub name: String,
    pub template_path: PathBuf,
    pub description: Option<String>,
    /// Reject undeclared props
    pub strict: bool,
    pub props: PropSchema,
    pub slots: SlotSchema,
    /// Compiled body of the whole file (the header is a comment)
    pub template: Template,
}

/// Canonical dotted form of a component name, or `None` if it can never resolve
///
/// Segments are separated by `.` or `/`. Empty segments, `..` and segments
/// containing `\` or `:` are rejected so a name cannot escape its root.
pub fn normalize_name(name: &str) -> Option<String> {
    let segments: Vec<&str> = name.trim().split(['.', '/']).collect();
    let valid = segments
        .iter()
        .all(|s| !s.is_empty() && !s.contains(['\\', ':']) && !s.chars().any(char::is_whitespace));
    valid.then(|| segments.join("."))
}

/// Thread-safe component registry with a lazily populated cache
#[derive(Debug)]
pub struct ComponentRegistry {
    roots: Vec<PathBuf>,
    extensions: Vec<String>,
    parser: Arc<TemplateParser>,
    cache: RwLock<HashMap<String, Arc<ComponentDefinition>>>,
}

impl ComponentRegistry {
    /// Create a registry searching `roots` in order for files with `extensions`
    pub fn new(roots: Vec<PathBuf>, extensions: Vec<String>, parser: Arc<TemplateParser>) -> Self {
        Self {
            roots,
            extensions,
            parser,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<ComponentDefinition>>> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<ComponentDefinition>>> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve a component by name
    ///
    /// Returns `Ok(None)` when nothing matches. Definitions are cached on first
    /// load; concurrent first loads may both compile, but every caller gets
    /// the one that was inserted first.
    pub fn get_component(
        &self,
        name: &str,
    ) -> Result<Option<Arc<ComponentDefinition>>, ComponentError> {
        let Some(canonical) = normalize_name(name) else {
            debug!(name, "invalid component name");
            return Ok(None);
        };

        if let Some(def) = self.read_cache().get(&canonical) {
            trace!(component = %canonical, "component cache hit");
            return Ok(Some(Arc::clone(def)));
        }

        let Some(path) = self.resolve_path(&canonical) else {
            debug!(component = %canonical, roots = ?self.roots, "component not found");
            return Ok(None);
        };

        let def = Arc::new(self.load(&canonical, &path)?);
        debug!(component = %canonical, path = %path.display(), "loaded component");

        let mut cache = self.write_cache();
        Ok(Some(Arc::clone(cache.entry(canonical).or_insert(def))))
    }

    /// Whether a component resolves; load failures count as absent
    pub fn has_component(&self, name: &str) -> bool {
        match self.get_component(name) {
            Ok(def) => def.is_some(),
            Err(e) => {
                debug!(name, error = %e, "component failed to load");
                false
            }
        }
    }

    /// First file matching the canonical name, by root then extension order
    pub fn resolve_path(&self, canonical: &str) -> Option<PathBuf> {
        let segments: Vec<&str> = canonical.split('.').collect();
        let (last, dirs) = segments.split_last()?;

        for root in &self.roots {
            let mut dir = root.clone();
            dir.extend(dirs);
            for ext in &self.extensions {
                let candidate = dir.join(format!("{}.{}", last, ext));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }

    fn load(&self, name: &str, path: &Path) -> Result<ComponentDefinition, ComponentError> {
        let source = std::fs::read_to_string(path).map_err(|e| ComponentError::FileRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let declaration =
            Declaration::from_source(&source).map_err(|e| ComponentError::MalformedDeclaration {
                name: name.to_string(),
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let template = self
            .parser
            .parse(&path.display().to_string(), &source)
            .map_err(|errors| ComponentError::Syntax {
                name: name.to_string(),
                path: path.to_path_buf(),
                errors,
            })?;

        Ok(ComponentDefinition {
            name: name.to_string(),
            template_path: path.to_path_buf(),
            description: declaration.description,
            strict: declaration.strict,
            props: declaration.props,
            slots: declaration.slots,
            template,
        })
    }

    /// Canonical names of every component under the roots, sorted
    ///
    /// When two roots provide the same name the first root wins.
    pub fn names(&self) -> Vec<String> {
        let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();
        for root in &self.roots {
            let mut files = Vec::new();
            collect_files(root, &mut files);
            for path in files {
                let Some(name) = self.name_for(root, &path) else {
                    continue;
                };
                match found.get(&name) {
                    Some(existing) if existing != &path => {
                        warn!(
                            component = %name,
                            used = %existing.display(),
                            shadowed = %path.display(),
                            "component defined more than once"
                        );
                    }
                    Some(_) => {}
                    None => {
                        found.insert(name, path);
                    }
                }
            }
        }
        found.into_keys().collect()
    }

    /// Canonical name of a file under `root`, if it has a component extension
    fn name_for(&self, root: &Path, path: &Path) -> Option<String> {
        let ext = path.extension()?.to_str()?;
        if !self.extensions.iter().any(|e| e == ext) {
            return None;
        }
        let relative = path.strip_prefix(root).ok()?.with_extension("");
        let segments = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        // `a.b.tpl` would canonicalize to `a.b`, which resolves to `a/b.tpl`
        if segments.iter().any(|s| s.contains('.')) {
            return None;
        }
        normalize_name(&segments.join("."))
    }

    /// Load every discovered component, stopping at the first failure
    pub fn preload(&self) -> Result<usize, ComponentError> {
        let names = self.names();
        for name in &names {
            self.get_component(name)?;
        }
        debug!(count = names.len(), "preloaded components");
        Ok(names.len())
    }

    /// Drop one cached definition so the next lookup reloads it
    pub fn invalidate(&self, name: &str) -> bool {
        match normalize_name(name) {
            Some(canonical) => self.write_cache().remove(&canonical).is_some(),
            None => false,
        }
    }

    pub fn clear(&self) {
        self.write_cache().clear();
    }

    /// Number of cached definitions
    pub fn cached(&self) -> usize {
        self.read_cache().len()
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "skipping unreadable component directory");
            return;
        }
    };
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();
    for path in paths {
        if path.is_dir() {
            collect_files(&path, out);
        } else {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn registry(roots: Vec<PathBuf>) -> ComponentRegistry {
        ComponentRegistry::new(
            roots,
            vec!["tpl".to_string(), "html".to_string()],
            Arc::new(TemplateParser::default()),
        )
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("card"), Some("card".to_string()));
        assert_eq!(normalize_name("forms/input"), Some("forms.input".to_string()));
        assert_eq!(normalize_name("forms.input"), Some("forms.input".to_string()));
        assert_eq!(normalize_name(""), None);
        assert_eq!(normalize_name("../secret"), None);
        assert_eq!(normalize_name("a..b"), None);
        assert_eq!(normalize_name("a/"), None);
        assert_eq!(normalize_name("c:\\x"), None);
        assert_eq!(normalize_name("two words"), None);
    }

    #[test]
    fn test_resolves_nested_name_both_separators() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "forms/input.tpl", "<input>");
        let reg = registry(vec![dir.path().to_path_buf()]);

        let dotted = reg.get_component("forms.input").unwrap().expect("Should resolve");
        let slashed = reg.get_component("forms/input").unwrap().expect("Should resolve");
        assert_eq!(dotted.name, "forms.input");
        assert!(Arc::ptr_eq(&dotted, &slashed));
    }

    #[test]
    fn test_missing_component_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(vec![dir.path().to_path_buf()]);
        assert!(reg.get_component("nope").unwrap().is_none());
        assert!(!reg.has_component("nope"));
        assert!(!reg.has_component("../nope"));
    }

    #[test]
    fn test_root_and_extension_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write(first.path(), "card.html", "first-html");
        write(second.path(), "card.tpl", "second-tpl");
        write(second.path(), "badge.html", "second-html");
        write(second.path(), "badge.tpl", "second-tpl");
        let reg = registry(vec![first.path().to_path_buf(), second.path().to_path_buf()]);

        let card = reg.get_component("card").unwrap().unwrap();
        assert_eq!(card.template_path, first.path().join("card.html"));
        let badge = reg.get_component("badge").unwrap().unwrap();
        assert_eq!(badge.template_path, second.path().join("badge.tpl"));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Card.tpl", "x");
        let reg = registry(vec![dir.path().to_path_buf()]);
        assert!(reg.has_component("Card"));
        // Only meaningful on case-sensitive file systems
        if !dir.path().join("card.tpl").exists() {
            assert!(!reg.has_component("card"));
        }
    }

    #[test]
    fn test_definition_carries_declaration() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "alert.tpl",
            "{#---\nstrict = true\n[props.message]\ntype = \"string\"\nrequired = true\n---#}\n{{ message }}",
        );
        let reg = registry(vec![dir.path().to_path_buf()]);
        let def = reg.get_component("alert").unwrap().unwrap();
        assert!(def.strict);
        assert_eq!(def.props.names(), vec!["message"]);
        assert!(def.slots.is_empty());
    }

    #[test]
    fn test_malformed_declaration_is_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.tpl", "{#---\n[props.a]\ntype = \"huge\"\n---#}");
        let reg = registry(vec![dir.path().to_path_buf()]);

        let err = reg.get_component("bad").unwrap_err();
        match &err {
            ComponentError::MalformedDeclaration { name, path, message } => {
                assert_eq!(name, "bad");
                assert_eq!(path, &dir.path().join("bad.tpl"));
                assert!(message.contains("unknown type"));
            }
            other => panic!("Expected MalformedDeclaration, got {:?}", other),
        }
        assert!(!reg.has_component("bad"));
        assert_eq!(reg.cached(), 0);
    }

    #[test]
    fn test_syntax_error_is_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken.tpl", "{{ unclosed");
        let reg = registry(vec![dir.path().to_path_buf()]);
        assert!(matches!(
            reg.get_component("broken"),
            Err(ComponentError::Syntax { .. })
        ));
    }

    #[test]
    fn test_names_scan_and_preload() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write(first.path(), "card.tpl", "a");
        write(first.path(), "forms/input.tpl", "b");
        write(first.path(), "notes.txt", "ignored");
        write(second.path(), "card.tpl", "shadowed");
        write(second.path(), "alert.html", "c");
        let reg = registry(vec![first.path().to_path_buf(), second.path().to_path_buf()]);

        assert_eq!(reg.names(), vec!["alert", "card", "forms.input"]);
        assert_eq!(reg.preload().unwrap(), 3);
        assert_eq!(reg.cached(), 3);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "card.tpl", "old");
        let reg = registry(vec![dir.path().to_path_buf()]);

        let old = reg.get_component("card").unwrap().unwrap();
        write(dir.path(), "card.tpl", "new");
        let cached = reg.get_component("card").unwrap().unwrap();
        assert!(Arc::ptr_eq(&old, &cached));

        assert!(reg.invalidate("card"));
        let reloaded = reg.get_component("card").unwrap().unwrap();
        assert!(!Arc::ptr_eq(&old, &reloaded));

        reg.clear();
        assert_eq!(reg.cached(), 0);
    }

    #[test]
    fn test_concurrent_lookups_share_definition() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "card.tpl", "<div></div>");
        let reg = registry(vec![dir.path().to_path_buf()]);

        let defs: Vec<Arc<ComponentDefinition>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| reg.get_component("card").unwrap().unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(defs.iter().all(|d| Arc::ptr_eq(d, &defs[0])));
    }
}
