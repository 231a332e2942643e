//! Template Components CLI
//!
//! Usage:
//!   template-components [OPTIONS] [FILE]
//!
//! Options:
//!   -c, --config <FILE>      Config file (TOML, `[components]` table)
//!   -r, --root <DIR>         Component root searched before configured roots
//!   --strict                 Reject undeclared props everywhere
//!   --vars <JSON>            Variables for the template
//!   --component <NAME>       Render one component instead of a template
//!   --props <JSON>           Props for --component
//!   --content <TEXT>         Default slot content for --component
//!   -l, --list               List discovered components
//!   --describe <NAME>        Print a component's props and slots as JSON
//!   -v, --verbose            Debug logging on stderr
//!   -h, --help               Print help

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use serde_json::{json, Map, Value};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use template_components::{ComponentConfig, ComponentError, Environment, ParseError, RenderError};

#[derive(Parser)]
#[command(name = "template-components")]
#[command(about = "Render templates with reusable file-backed components")]
struct Cli {
    /// Template file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Config file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Component root, searched before configured roots (repeatable)
    #[arg(short, long = "root")]
    roots: Vec<PathBuf>,

    /// Reject undeclared props for every component
    #[arg(long)]
    strict: bool,

    /// Template variables as a JSON object
    #[arg(long)]
    vars: Option<String>,

    /// Render a single component by name
    #[arg(long, value_name = "NAME")]
    component: Option<String>,

    /// Props for --component as a JSON object
    #[arg(long, requires = "component")]
    props: Option<String>,

    /// Default slot content for --component
    #[arg(long, requires = "component")]
    content: Option<String>,

    /// List discovered components
    #[arg(short, long)]
    list: bool,

    /// Print the declared props and slots of a component
    #[arg(long, value_name = "NAME")]
    describe: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn init_tracing(verbose: bool) {
    let directive = if verbose {
        "template_components=debug"
    } else {
        "template_components=warn"
    };
    let filter = match directive.parse::<Directive>() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Parse a JSON object flag
fn parse_object(flag: &str, text: Option<&str>) -> Map<String, Value> {
    let Some(text) = text else {
        return Map::new();
    };
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map,
        Ok(_) => fail(format!("--{} must be a JSON object", flag)),
        Err(e) => fail(format!("invalid JSON in --{}: {}", flag, e)),
    }
}

/// Print syntax errors as source reports, everything else as one line
fn report(err: &RenderError, source: Option<(&str, &str)>) -> ! {
    let (errors, source, filename): (&[ParseError], String, String) = match err {
        RenderError::Parse { template, errors } => match source {
            Some((name, text)) if name == template.as_str() => {
                (errors, text.to_string(), name.to_string())
            }
            _ => fail(err),
        },
        RenderError::Component(ComponentError::Syntax { path, errors, .. }) => {
            match fs::read_to_string(path) {
                Ok(text) => (errors, text, path.display().to_string()),
                Err(_) => fail(err),
            }
        }
        _ => fail(err),
    };
    for error in errors {
        eprint!("{}", error.format(&source, &filename));
    }
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => match ComponentConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => fail(format!("loading config '{}': {}", path.display(), e)),
        },
        None => ComponentConfig::default(),
    };
    let config = cli
        .roots
        .iter()
        .rev()
        .fold(config, |config, root| config.with_root_first(root.clone()));
    let config = if cli.strict {
        config.with_strict_props(true)
    } else {
        config
    };

    let env = match Environment::new(config) {
        Ok(env) => env,
        Err(e) => fail(e),
    };

    if cli.list {
        for name in env.registry().names() {
            println!("{}", name);
        }
        return;
    }

    if let Some(name) = &cli.describe {
        let def = match env.get_component(name) {
            Ok(Some(def)) => def,
            Ok(None) => fail(ComponentError::NotFound { name: name.clone() }),
            Err(e) => report(&e.into(), None),
        };
        let description = json!({
            "name": def.name,
            "path": def.template_path.display().to_string(),
            "description": def.description,
            "strict": def.strict,
            "props": def.props.to_value(),
            "slots": def.slots.to_value(),
        });
        match serde_json::to_string_pretty(&description) {
            Ok(text) => println!("{}", text),
            Err(e) => fail(e),
        }
        return;
    }

    if let Some(name) = &cli.component {
        let props = parse_object("props", cli.props.as_deref());
        match env.render(name, props, cli.content.clone(), BTreeMap::new()) {
            Ok(out) => println!("{}", out),
            Err(e) => report(&e, None),
        }
        return;
    }

    let vars = parse_object("vars", cli.vars.as_deref());

    let (name, source) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (path.display().to_string(), content),
            Err(e) => fail(format!("reading file '{}': {}", path.display(), e)),
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => ("<stdin>".to_string(), buffer),
                Err(e) => fail(format!("reading from stdin: {}", e)),
            }
        }
    };

    let result = env
        .compile(&name, &source)
        .and_then(|template| env.render_template(&template, vars));
    match result {
        Ok(out) => print!("{}", out),
        Err(e) => report(&e, Some((&name, &source))),
    }
}
