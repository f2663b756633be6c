//! Tunnel - HTTP upload endpoint that forwards files to a Telegram group
//!
//! A client posts one file to `/upload`; the server validates it, streams it
//! to scratch storage and sends it to the configured chat through the Bot API
//! with a caption describing the upload.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging, and filename validation
//! - `storage`: Scratch files that are removed on every exit path
//! - `telegram`: Bot API client, lazy client lifecycle, and captions
//! - `server`: axum router, upload handler, and health checks

pub mod cli;
pub mod core;
pub mod server;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, Settings};
pub use crate::server::{router, start_server, AppState};
