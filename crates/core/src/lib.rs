//! Prism Core Library
//!
//! Foundational utilities shared by every Prism crate:
//! - Error handling (`PrismError`, `PrismResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{PrismError, PrismResult};
