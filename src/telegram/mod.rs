//! Telegram side of the tunnel
//!
//! - `client`: Bot API seam (`Connector`, `DocumentSender`) and its teloxide implementation
//! - `lifecycle`: lazily constructed, shared forwarding client
//! - `caption`: text attached to forwarded documents

pub mod caption;
pub mod client;
pub mod lifecycle;

pub use client::{Connector, DocumentSender, ForwardError, TelegramConnector};
pub use lifecycle::{ClientCell, ForwardingClient, LifecycleError};
