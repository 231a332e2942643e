//! Template evaluation
//!
//! [`State`] walks a compiled node tree, evaluates expressions and renders
//! component invocations. [`value`] holds the value access and output rules.

pub mod state;
pub mod value;

pub use state::State;
pub use value::display_value;
