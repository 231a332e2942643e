//! Components: file-backed template fragments with typed props and slots
//!
//! - [`registry`] resolves names to compiled definitions and caches them
//! - [`schema`] reads the declaration header of a component file
//! - [`tags`] parses invocation and slot tags
//! - [`binding`] validates props and binds slots for one render
//! - [`extension`] plugs all of it into an [`Environment`](crate::Environment)

pub mod binding;
pub mod extension;
pub mod registry;
pub mod schema;
pub mod tags;

pub use extension::ComponentExtension;
pub use registry::{normalize_name, ComponentDefinition, ComponentError, ComponentRegistry};
pub use schema::{Declaration, PropDef, PropSchema, PropType, SlotDef, SlotSchema};
pub use tags::{ComponentTagParser, SlotTagParser};
