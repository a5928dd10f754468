//! State and output shared by both gesture detectors.

use crate::clock::Timestamp;
use serde::{Deserialize, Serialize};

/// Which gesture produced a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureSource {
    /// Triple power-button press, seen as screen on/off transitions
    PowerPress,
    /// Triple accelerometer chop
    Chop,
}

impl GestureSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureSource::PowerPress => "power_press",
            GestureSource::Chop => "chop",
        }
    }
}

impl std::fmt::Display for GestureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detector reached its trigger threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triggered {
    pub source: GestureSource,
    /// Time of the event that completed the gesture
    pub at: Timestamp,
}

/// Counting state of one detector.
///
/// `count` stays within `[0, trigger_threshold)` between calls: reaching the
/// threshold resets it to 0 in the same step that emits [`Triggered`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorState {
    /// Qualifying events since the last reset or trigger
    pub count: u32,
    /// Time of the most recently accepted qualifying event
    pub last_event_time: Option<Timestamp>,
}

impl DetectorState {
    /// Count an accepted event. Returns true when `threshold` was reached,
    /// in which case the count is already back at 0.
    pub(crate) fn accept(&mut self, at: Timestamp, threshold: u32) -> bool {
        self.count += 1;
        self.last_event_time = Some(at);
        if self.count >= threshold {
            self.count = 0;
            true
        } else {
            false
        }
    }

    /// Milliseconds since the last accepted event, or `None` before the first.
    pub(crate) fn gap_to(&self, at: Timestamp) -> Option<i64> {
        self.last_event_time.map(|last| at.saturating_sub(last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_resets_at_threshold() {
        let mut state = DetectorState::default();
        assert!(!state.accept(10, 3));
        assert!(!state.accept(20, 3));
        assert_eq!(state.count, 2);
        assert!(state.accept(30, 3));
        assert_eq!(state.count, 0);
        assert_eq!(state.last_event_time, Some(30));
    }

    #[test]
    fn test_gap_before_first_event() {
        let state = DetectorState::default();
        assert_eq!(state.gap_to(1_000), None);
    }

    #[test]
    fn test_gesture_source_names() {
        assert_eq!(GestureSource::PowerPress.to_string(), "power_press");
        assert_eq!(
            serde_json::to_string(&GestureSource::Chop).unwrap(),
            "\"chop\""
        );
    }
}
