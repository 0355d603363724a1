//! Logging setup for the watcher binaries.
//!
//! Everything in the workspace logs through `tracing`; this crate owns the
//! subscriber that turns those events into pretty or JSON lines.

pub mod tracing;

pub use crate::tracing::{init_tracing, TracingConfig};
