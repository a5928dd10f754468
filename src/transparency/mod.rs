//! Transparency module for the panic gesture agent.
//!
//! Exposes what the engine has observed and delivered, so a user can verify
//! that gesture detection is running.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, SharedTransparencyLog, TransparencyLog,
    TransparencyStats, HISTORY_LEN,
};
