//! Raw signal event types consumed by the gesture detectors.
//!
//! Screen events carry only the transition direction; motion samples carry
//! only the z-axis acceleration. Nothing else from the platform event is kept.

use crate::clock::{Clock, Timestamp};
use serde::{Deserialize, Serialize};

/// Direction of a screen transition.
///
/// Both directions count identically toward the power-press pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenToggleKind {
    #[serde(rename = "on")]
    ScreenOn,
    #[serde(rename = "off")]
    ScreenOff,
}

/// A screen-on or screen-off transition, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenToggleEvent {
    pub kind: ScreenToggleKind,
    /// Monotonic time of the transition
    pub at: Timestamp,
}

impl ScreenToggleEvent {
    pub fn new(kind: ScreenToggleKind, at: Timestamp) -> Self {
        Self { kind, at }
    }

    /// Stamp a transition with the clock's current time.
    pub fn now(kind: ScreenToggleKind, clock: &dyn Clock) -> Self {
        Self::new(kind, clock.now_ms())
    }
}

/// One accelerometer reading, reduced to its z axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Acceleration along z in m/s²
    #[serde(rename = "z", alias = "z_axis_acceleration")]
    pub z_axis_acceleration: f64,
    /// Monotonic time of the reading
    pub at: Timestamp,
}

impl MotionSample {
    pub fn new(z_axis_acceleration: f64, at: Timestamp) -> Self {
        Self {
            z_axis_acceleration,
            at,
        }
    }

    /// Build a sample from a full 3-axis vector, keeping only z.
    pub fn from_vector(values: [f64; 3], at: Timestamp) -> Self {
        Self::new(values[2], at)
    }

    pub fn now(z_axis_acceleration: f64, clock: &dyn Clock) -> Self {
        Self::new(z_axis_acceleration, clock.now_ms())
    }
}

/// Unified event type for recorded signal streams.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignalEvent {
    Screen(ScreenToggleEvent),
    Motion(MotionSample),
}

impl SignalEvent {
    pub fn timestamp(&self) -> Timestamp {
        match self {
            SignalEvent::Screen(e) => e.at,
            SignalEvent::Motion(s) => s.at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_motion_sample_keeps_only_z() {
        let sample = MotionSample::from_vector([1.0, -2.0, 18.5], 40);
        assert_eq!(sample.z_axis_acceleration, 18.5);
        assert_eq!(sample.at, 40);
    }

    #[test]
    fn test_events_stamped_from_clock() {
        let clock = ManualClock::new(1_500);
        let event = ScreenToggleEvent::now(ScreenToggleKind::ScreenOff, &clock);
        assert_eq!(event.at, 1_500);

        clock.advance(20);
        let sample = MotionSample::now(-16.0, &clock);
        assert_eq!(sample.at, 1_520);
    }

    #[test]
    fn test_signal_event_wire_format() {
        let screen: SignalEvent =
            serde_json::from_str(r#"{"type":"screen","kind":"off","at":12}"#).unwrap();
        assert_eq!(
            screen,
            SignalEvent::Screen(ScreenToggleEvent::new(ScreenToggleKind::ScreenOff, 12))
        );

        let motion: SignalEvent =
            serde_json::from_str(r#"{"type":"motion","z":-21.5,"at":900}"#).unwrap();
        assert_eq!(motion.timestamp(), 900);
        assert!(matches!(motion, SignalEvent::Motion(s) if s.z_axis_acceleration == -21.5));
    }
}
