//! Gesture-detection core.
//!
//! This module contains:
//! - The power-press detector (triple screen toggle)
//! - The chop detector (triple z-axis spike)
//! - The arbiter that turns detector output into emergency deliveries

pub mod arbiter;
pub mod chop;
pub mod detector;
pub mod power_press;

// Re-export commonly used types
pub use arbiter::{Arbiter, EmergencyDelivery, EmergencyTrigger};
pub use chop::ChopDetector;
pub use detector::{DetectorState, GestureSource, Triggered};
pub use power_press::PowerPressDetector;

/// Power-press: maximum gap (ms) between toggles of one sequence.
pub const RESET_WINDOW_MS: u64 = 2000;

/// Chop: minimum spacing (ms) between two counted chops.
pub const REFRACTORY_PERIOD_MS: u64 = 500;

/// Chop: |z| (m/s²) a sample must exceed to count.
pub const CHOP_THRESHOLD: f64 = 15.0;

/// Qualifying events needed for either gesture.
pub const TRIGGER_THRESHOLD: u32 = 3;
