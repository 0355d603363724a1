//! Shared types for the transaction watcher workspace.
//!
//! This crate defines the vocabulary every other crate speaks: transaction
//! hashes, node-reported statuses, push notifications, submission payloads,
//! the collaborator traits the watcher is built against, and the error
//! types those collaborators return.

pub mod errors;
pub mod events;
pub mod hash;
pub mod source;
pub mod status;
pub mod submission;

pub use errors::*;
pub use events::*;
pub use hash::*;
pub use source::*;
pub use status::*;
pub use submission::*;
