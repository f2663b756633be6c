//! Core utilities, configuration, and common functionality

pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

// Re-exports for convenience
pub use config::{ConfigReport, Settings};
pub use error::{AppError, AppResult};
pub use logging::{init_logger, log_configuration};
