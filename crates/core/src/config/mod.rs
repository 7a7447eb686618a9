//! Configuration loading and schema definitions
//!
//! Settings live in a TOML file; see [`ConfigSchema`] for the layout.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
