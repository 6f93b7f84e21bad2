//! Network Configuration Backup Library
//!
//! Pulls running configurations from router and switch groups over SSH,
//! files them in a dated backup tree and optionally seals the tree in an
//! encrypted archive.

pub mod archive;
pub mod backup;
pub mod config;
pub mod console;
pub mod context;
pub mod fs;
pub mod groups;
pub mod inventory;
pub mod net;
pub mod orchestrator;
pub mod session;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use context::RunContext;
pub use utils::errors::{BackupError, SessionError};
pub type Result<T> = std::result::Result<T, BackupError>;
