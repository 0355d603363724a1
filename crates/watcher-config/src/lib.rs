//! Configuration for the transaction watcher.
//!
//! Configuration is loaded from a TOML, JSON or YAML file, overridden from
//! `WATCHER_*` environment variables and validated before use. Every
//! component receives its settings explicitly at construction time.

pub mod loader;
pub mod types;

pub use loader::{load_config, ConfigLoader};
pub use types::*;
