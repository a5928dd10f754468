//! Triple chop detection on the accelerometer z axis.
//!
//! A chop is a sample with |z| above the threshold. After a chop is counted,
//! further samples are ignored until the refractory period has passed, so one
//! physical swing that spans several samples counts once.
//!
//! Unlike the power-press detector there is no staleness reset: three chops
//! trigger however far apart they are, as long as each one is outside the
//! refractory period of the previous one.

use super::detector::{DetectorState, GestureSource, Triggered};
use crate::config::DetectorSettings;
use crate::source::MotionSample;

/// Refractory-gated threshold counter over motion samples.
#[derive(Debug, Clone)]
pub struct ChopDetector {
    chop_threshold: f64,
    refractory_period_ms: i64,
    trigger_threshold: u32,
    state: DetectorState,
}

impl ChopDetector {
    pub fn new(settings: &DetectorSettings) -> Self {
        Self {
            chop_threshold: settings.chop_threshold,
            refractory_period_ms: settings.refractory_period_ms as i64,
            trigger_threshold: settings.trigger_threshold.max(1),
            state: DetectorState::default(),
        }
    }

    /// Process one motion sample.
    ///
    /// Samples at or below the threshold, and non-finite samples, leave the
    /// state untouched.
    pub fn on_motion_sample(&mut self, sample: MotionSample) -> Option<Triggered> {
        let z = sample.z_axis_acceleration;
        if !z.is_finite() || z.abs() <= self.chop_threshold {
            return None;
        }

        if let Some(gap) = self.state.gap_to(sample.at) {
            if gap <= self.refractory_period_ms {
                tracing::debug!(
                    gesture = "chop",
                    gap_ms = gap,
                    z,
                    "chop suppressed inside refractory period"
                );
                return None;
            }
        }

        let triggered = self.state.accept(sample.at, self.trigger_threshold);
        tracing::debug!(
            gesture = "chop",
            z,
            count = self.state.count,
            at_ms = sample.at,
            "chop counted"
        );

        triggered.then(|| Triggered {
            source: GestureSource::Chop,
            at: sample.at,
        })
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> ChopDetector {
        ChopDetector::new(&DetectorSettings::default())
    }

    fn chop(at: i64) -> MotionSample {
        MotionSample::new(20.0, at)
    }

    #[test]
    fn test_three_spaced_chops_trigger() {
        let mut d = detector();
        assert_eq!(d.on_motion_sample(chop(0)), None);
        assert_eq!(d.on_motion_sample(chop(600)), None);
        assert_eq!(
            d.on_motion_sample(chop(1200)),
            Some(Triggered {
                source: GestureSource::Chop,
                at: 1200
            })
        );
        assert_eq!(d.state().count, 0);
    }

    #[test]
    fn test_refractory_suppresses_close_samples() {
        let mut d = detector();
        d.on_motion_sample(chop(0));
        assert_eq!(d.on_motion_sample(chop(200)), None);
        assert_eq!(d.state().count, 1);
        assert_eq!(d.state().last_event_time, Some(0));
        assert_eq!(d.on_motion_sample(chop(600)), None);
        assert_eq!(d.state().count, 2);
    }

    #[test]
    fn test_refractory_boundary_is_inclusive() {
        let mut d = detector();
        d.on_motion_sample(chop(0));
        assert_eq!(d.on_motion_sample(chop(500)), None);
        assert_eq!(d.state().count, 1);
        d.on_motion_sample(chop(501));
        assert_eq!(d.state().count, 2);
    }

    #[test]
    fn test_weak_samples_do_not_mutate_state() {
        let mut d = detector();
        d.on_motion_sample(chop(0));
        let before = d.state();
        for (i, z) in [15.0, -15.0, 0.0, 9.81, -3.2].into_iter().enumerate() {
            assert_eq!(d.on_motion_sample(MotionSample::new(z, 1000 + i as i64)), None);
        }
        assert_eq!(d.state(), before);
    }

    #[test]
    fn test_negative_z_counts() {
        let mut d = detector();
        d.on_motion_sample(MotionSample::new(-16.0, 0));
        d.on_motion_sample(MotionSample::new(-16.0, 1000));
        assert!(d.on_motion_sample(MotionSample::new(-16.0, 2000)).is_some());
    }

    #[test]
    fn test_non_finite_samples_ignored() {
        let mut d = detector();
        for z in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(d.on_motion_sample(MotionSample::new(z, 0)), None);
        }
        assert_eq!(d.state(), DetectorState::default());
    }

    #[test]
    fn test_no_staleness_reset() {
        let mut d = detector();
        d.on_motion_sample(chop(0));
        d.on_motion_sample(chop(60_000));
        assert!(d.on_motion_sample(chop(3_600_000)).is_some());
    }
}
