//! Definition loading for the crafting sim: a line-oriented text format
//! describing item types (with transforms and colors) and recipes, resolved
//! into a validated [`croft_core::registry::Registry`].

pub mod parser;

pub use parser::{DEFAULT_TICKS_PER_SECOND, DataError, load_registry, load_registry_file};
