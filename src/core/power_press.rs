//! Triple power-press detection.
//!
//! Android gives no direct power-button callback, so a press is observed as a
//! screen-on or screen-off transition. Every transition counts: on/off/on in
//! quick succession is three events and triggers, even though it is only one
//! and a half full press cycles.

use super::detector::{DetectorState, GestureSource, Triggered};
use crate::config::DetectorSettings;
use crate::source::ScreenToggleEvent;

/// Debounced counter over screen transitions.
#[derive(Debug, Clone)]
pub struct PowerPressDetector {
    reset_window_ms: i64,
    trigger_threshold: u32,
    state: DetectorState,
}

impl PowerPressDetector {
    pub fn new(settings: &DetectorSettings) -> Self {
        Self {
            reset_window_ms: settings.reset_window_ms as i64,
            trigger_threshold: settings.trigger_threshold.max(1),
            state: DetectorState::default(),
        }
    }

    /// Process one screen transition.
    ///
    /// A gap longer than the reset window discards the partial sequence
    /// before the current event is counted. A negative gap (out-of-order
    /// delivery) never resets.
    pub fn on_screen_toggle(&mut self, event: ScreenToggleEvent) -> Option<Triggered> {
        if let Some(gap) = self.state.gap_to(event.at) {
            if gap > self.reset_window_ms && self.state.count > 0 {
                tracing::debug!(
                    gesture = "power_press",
                    gap_ms = gap,
                    discarded = self.state.count,
                    "stale press sequence discarded"
                );
                self.state.count = 0;
            }
        }

        let triggered = self.state.accept(event.at, self.trigger_threshold);
        tracing::debug!(
            gesture = "power_press",
            kind = ?event.kind,
            count = self.state.count,
            at_ms = event.at,
            "screen toggle counted"
        );

        triggered.then(|| Triggered {
            source: GestureSource::PowerPress,
            at: event.at,
        })
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ScreenToggleKind::{ScreenOff, ScreenOn};

    fn detector() -> PowerPressDetector {
        PowerPressDetector::new(&DetectorSettings::default())
    }

    fn off(at: i64) -> ScreenToggleEvent {
        ScreenToggleEvent::new(ScreenOff, at)
    }

    fn on(at: i64) -> ScreenToggleEvent {
        ScreenToggleEvent::new(ScreenOn, at)
    }

    #[test]
    fn test_three_toggles_within_window_trigger() {
        let mut d = detector();
        assert_eq!(d.on_screen_toggle(off(0)), None);
        assert_eq!(d.on_screen_toggle(on(500)), None);
        assert_eq!(
            d.on_screen_toggle(off(1000)),
            Some(Triggered {
                source: GestureSource::PowerPress,
                at: 1000
            })
        );
        assert_eq!(d.state().count, 0);
    }

    #[test]
    fn test_gap_beyond_window_restarts_sequence() {
        let mut d = detector();
        assert_eq!(d.on_screen_toggle(off(0)), None);
        assert_eq!(d.on_screen_toggle(on(500)), None);
        // 2500 ms gap: earlier presses no longer count
        assert_eq!(d.on_screen_toggle(off(3000)), None);
        assert_eq!(d.state().count, 1);
        assert_eq!(d.on_screen_toggle(on(3200)), None);
        let t = d.on_screen_toggle(off(3400)).expect("should trigger");
        assert_eq!(t.at, 3400);
    }

    #[test]
    fn test_gap_exactly_at_window_keeps_sequence() {
        let mut d = detector();
        d.on_screen_toggle(off(0));
        d.on_screen_toggle(on(2000));
        assert!(d.on_screen_toggle(off(4000)).is_some());
    }

    #[test]
    fn test_screen_on_and_off_count_alike() {
        let mut d = detector();
        d.on_screen_toggle(on(0));
        d.on_screen_toggle(on(100));
        assert!(d.on_screen_toggle(on(200)).is_some());
    }

    #[test]
    fn test_one_trigger_per_three_events() {
        let mut d = detector();
        let triggers = (0..9)
            .filter_map(|i| d.on_screen_toggle(off(i * 300)))
            .count();
        assert_eq!(triggers, 3);
        assert_eq!(d.state().count, 0);
    }

    #[test]
    fn test_out_of_order_event_still_counts() {
        let mut d = detector();
        d.on_screen_toggle(off(5000));
        d.on_screen_toggle(on(5100));
        // Negative gap: no reset, still counted
        assert!(d.on_screen_toggle(off(100)).is_some());
    }

    #[test]
    fn test_custom_threshold() {
        let settings = DetectorSettings {
            trigger_threshold: 5,
            ..DetectorSettings::default()
        };
        let mut d = PowerPressDetector::new(&settings);
        for i in 0..4 {
            assert_eq!(d.on_screen_toggle(off(i * 100)), None);
        }
        assert!(d.on_screen_toggle(off(400)).is_some());
    }
}
