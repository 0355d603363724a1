//! Transaction confirmation watching.
//!
//! A submitted transaction only becomes final once the network confirms it,
//! and a node's view of it is eventually consistent: a freshly announced hash
//! may be unknown for a while before it shows up as unconfirmed, partial,
//! confirmed or failed. This crate resolves that uncertainty to exactly one
//! [`WatchOutcome`].
//!
//! - [`TransactionWatcher`] polls a [`StatusSource`](watcher_types::StatusSource)
//!   at a constant interval with a bounded number of attempts.
//! - [`EventWatcher`] waits on a
//!   [`NotificationChannel`](watcher_types::NotificationChannel) instead.
//! - [`HybridWatcher`] runs both and resolves on whichever answers first.
//! - [`Announcer`] submits a signed payload and then watches its hash.

pub mod announcer;
pub mod error;
pub mod events;
pub mod hybrid;
pub mod request;
pub mod watcher;

pub use announcer::Announcer;
pub use error::WatchError;
pub use events::{unique_events, EventWatcher};
pub use hybrid::HybridWatcher;
pub use request::{WatchOutcome, WatchRequest};
pub use watcher::TransactionWatcher;
