//! Node-facing implementations of the watcher's collaborators.
//!
//! [`NodeClient`] talks to a node's REST API and serves as both the
//! [`StatusSource`](watcher_types::StatusSource) and the
//! [`Submitter`](watcher_types::Submitter). [`WsNotificationChannel`] keeps a
//! WebSocket connection to the node's event feed and implements
//! [`NotificationChannel`](watcher_types::NotificationChannel).

pub mod implementations;

pub use implementations::rest::NodeClient;
pub use implementations::websocket::WsNotificationChannel;
