//! Scry Common Types
//!
//! Shared types, error handling, logging and the IPC protocol used by all
//! Scry components.

pub mod error;
pub mod ipc;
pub mod logging;
pub mod types;

pub use error::{Error, Result};
pub use logging::{
    init_agent_logging, init_host_logging, init_logging, init_logging_from_file, LogConfig,
};
pub use types::*;

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, trace, warn};
