//! Panic Gesture Agent - background detection of emergency gestures.
//!
//! This library turns raw screen-toggle and accelerometer signals into a
//! single emergency trigger that the application layer reacts to (contact
//! lookup, SMS dispatch, UI navigation).
//!
//! # Gestures
//!
//! - **Triple power press**: three screen on/off transitions, each within
//!   2 s of the previous one
//! - **Triple chop**: three z-axis spikes above 15 m/s², each at least
//!   500 ms after the previous counted chop
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Panic Gesture Agent                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌──────────────┐                         │
//! │  │ Screen source│──▶│ Power-press  │──┐                      │
//! │  └──────────────┘   │  detector    │  │   ┌─────────┐        │
//! │                     └──────────────┘  ├──▶│ Arbiter │──▶ sink│
//! │  ┌──────────────┐   ┌──────────────┐  │   └─────────┘        │
//! │  │ Motion source│──▶│    Chop      │──┘                      │
//! │  └──────────────┘   │  detector    │                         │
//! │                     └──────────────┘                         │
//! │           ▲ subscribe / unsubscribe: GestureEngine           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use panic_gesture_agent::{
//!     source::{ManualSource, MotionSample, ScreenToggleEvent, ScreenToggleKind},
//!     Config, GestureEngine, LogSink,
//! };
//!
//! let screen: Arc<ManualSource<ScreenToggleEvent>> = Arc::new(ManualSource::new("screen"));
//! let motion: Arc<ManualSource<MotionSample>> = Arc::new(ManualSource::new("accelerometer"));
//! let engine = GestureEngine::new(
//!     &Config::default(),
//!     screen.clone(),
//!     motion.clone(),
//!     Arc::new(LogSink),
//! )
//! .expect("valid config");
//!
//! engine.start().expect("sources available");
//!
//! // Wire these calls to the platform's screen broadcast.
//! for at in [0, 400, 800] {
//!     screen.emit(ScreenToggleEvent::new(ScreenToggleKind::ScreenOff, at));
//! }
//! ```

pub mod clock;
pub mod config;
pub mod core;
pub mod engine;
pub mod sink;
pub mod source;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use clock::{Clock, ManualClock, MonotonicClock, Timestamp};
pub use config::{Config, ConfigError, DetectorSettings, GestureSelection};
pub use self::core::{
    Arbiter, ChopDetector, DetectorState, EmergencyDelivery, EmergencyTrigger, GestureSource,
    PowerPressDetector, Triggered,
};
pub use engine::{EngineSnapshot, GestureEngine, LifecycleState, StartError};
pub use sink::{ChannelSink, DeliveryError, DeliverySink, FnSink, JsonLinesSink, LogSink};
pub use source::{
    ManualSource, MotionSample, ReplaySource, ScreenToggleEvent, ScreenToggleKind, SignalEvent,
    SignalSource, SourceError,
};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How to perform each gesture, for display to users.
pub const GESTURE_GUIDE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║               PANIC GESTURE AGENT - GESTURE GUIDE                ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  Either gesture sends an emergency alert to your chosen contact. ║
║                                                                  ║
║  ✓ TRIPLE POWER PRESS:                                           ║
║    • Press the power button three times                          ║
║    • Keep less than 2 seconds between presses                    ║
║    • Works with the screen on or off                             ║
║                                                                  ║
║  ✓ TRIPLE CHOP:                                                  ║
║    • Swing the phone sharply down-and-up three times             ║
║    • Leave at least half a second between swings                 ║
║                                                                  ║
║  Detection runs only while the background service is active.     ║
║  Review past activity with:                                      ║
║    panic-gesture status                                          ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_guide_contents() {
        assert!(GESTURE_GUIDE.contains("TRIPLE POWER PRESS"));
        assert!(GESTURE_GUIDE.contains("TRIPLE CHOP"));
        assert!(GESTURE_GUIDE.contains("2 seconds"));
        assert!(GESTURE_GUIDE.contains("Review past activity"));
        assert!(!GESTURE_GUIDE.contains("alive"));
    }
}
