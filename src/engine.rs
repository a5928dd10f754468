//! Lifecycle controller for the gesture engine.
//!
//! `start` subscribes fresh detectors to their signal sources and `stop`
//! unsubscribes and discards them, in step with the hosting background
//! service. No detector state survives a stop.
//!
//! Each detector sits behind its own mutex; the two never share a lock. A
//! callback that was already in flight when `stop` ran sees its session
//! marked inactive and returns without touching anything.

use crate::config::{Config, ConfigError, DetectorSettings, GestureSelection};
use crate::core::{Arbiter, ChopDetector, DetectorState, GestureSource, PowerPressDetector};
use crate::sink::DeliverySink;
use crate::source::{Handler, MotionSample, ScreenToggleEvent, SignalSource, SourceError};
use crate::transparency::{create_shared_log, SharedTransparencyLog};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Whether the engine is listening for gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Listening,
}

/// Failure to enter the listening state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    /// The configuration enables neither gesture
    NoGesturesEnabled,
    /// A signal source refused the subscription
    Subscription {
        gesture: GestureSource,
        source: SourceError,
    },
}

impl std::fmt::Display for StartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartError::NoGesturesEnabled => write!(f, "No gestures enabled"),
            StartError::Subscription { gesture, source } => {
                write!(f, "Could not subscribe {gesture} detector: {source}")
            }
        }
    }
}

impl std::error::Error for StartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartError::Subscription { source, .. } => Some(source),
            StartError::NoGesturesEnabled => None,
        }
    }
}

/// Detector states of the current listening session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSnapshot {
    /// `None` when the power-press gesture is disabled
    pub power_press: Option<DetectorState>,
    /// `None` when the chop gesture is disabled
    pub chop: Option<DetectorState>,
}

/// One start..stop period.
struct Session {
    active: Arc<AtomicBool>,
    power_press: Option<Arc<Mutex<PowerPressDetector>>>,
    chop: Option<Arc<Mutex<ChopDetector>>>,
}

/// Owns the detectors and their subscriptions.
pub struct GestureEngine {
    settings: DetectorSettings,
    gestures: GestureSelection,
    screen_source: Arc<dyn SignalSource<ScreenToggleEvent>>,
    motion_source: Arc<dyn SignalSource<MotionSample>>,
    arbiter: Arc<Arbiter>,
    log: SharedTransparencyLog,
    session: Mutex<Option<Session>>,
}

impl GestureEngine {
    /// Create a stopped engine.
    pub fn new(
        config: &Config,
        screen_source: Arc<dyn SignalSource<ScreenToggleEvent>>,
        motion_source: Arc<dyn SignalSource<MotionSample>>,
        sink: Arc<dyn DeliverySink>,
    ) -> Result<Self, ConfigError> {
        Self::with_transparency_log(
            config,
            screen_source,
            motion_source,
            sink,
            create_shared_log(),
        )
    }

    /// Create a stopped engine that records activity into `log`.
    pub fn with_transparency_log(
        config: &Config,
        screen_source: Arc<dyn SignalSource<ScreenToggleEvent>>,
        motion_source: Arc<dyn SignalSource<MotionSample>>,
        sink: Arc<dyn DeliverySink>,
        log: SharedTransparencyLog,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let arbiter = Arc::new(Arbiter::new(
            sink,
            config.min_delivery_interval,
            log.clone(),
        ));

        Ok(Self {
            settings: config.detectors,
            gestures: config.gestures,
            screen_source,
            motion_source,
            arbiter,
            log,
            session: Mutex::new(None),
        })
    }

    /// Subscribe fresh detectors and start listening.
    ///
    /// Does nothing if already listening. On failure any subscription made
    /// by this call is undone and the engine stays stopped.
    pub fn start(&self) -> Result<(), StartError> {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if session.is_some() {
            return Ok(());
        }
        if !self.gestures.any_enabled() {
            return Err(StartError::NoGesturesEnabled);
        }

        let active = Arc::new(AtomicBool::new(true));

        let power_press = if self.gestures.power_press {
            let detector = Arc::new(Mutex::new(PowerPressDetector::new(&self.settings)));
            let handler = self.screen_handler(detector.clone(), active.clone());
            if let Err(source) = self.screen_source.subscribe(handler) {
                active.store(false, Ordering::SeqCst);
                tracing::warn!(gesture = "power_press", "start failed: {source}");
                return Err(StartError::Subscription {
                    gesture: GestureSource::PowerPress,
                    source,
                });
            }
            Some(detector)
        } else {
            None
        };

        let chop = if self.gestures.chop {
            let detector = Arc::new(Mutex::new(ChopDetector::new(&self.settings)));
            let handler = self.motion_handler(detector.clone(), active.clone());
            if let Err(source) = self.motion_source.subscribe(handler) {
                active.store(false, Ordering::SeqCst);
                if power_press.is_some() {
                    self.screen_source.unsubscribe();
                }
                tracing::warn!(gesture = "chop", "start failed: {source}");
                return Err(StartError::Subscription {
                    gesture: GestureSource::Chop,
                    source,
                });
            }
            Some(detector)
        } else {
            None
        };

        tracing::info!(
            power_press = power_press.is_some(),
            chop = chop.is_some(),
            "gesture engine listening"
        );
        *session = Some(Session {
            active,
            power_press,
            chop,
        });
        Ok(())
    }

    /// Unsubscribe and discard the detectors. Does nothing if stopped.
    pub fn stop(&self) {
        let Some(session) = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };

        session.active.store(false, Ordering::SeqCst);
        if session.power_press.is_some() {
            self.screen_source.unsubscribe();
        }
        if session.chop.is_some() {
            self.motion_source.unsubscribe();
        }
        tracing::info!("gesture engine stopped");
    }

    pub fn state(&self) -> LifecycleState {
        if self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
        {
            LifecycleState::Listening
        } else {
            LifecycleState::Stopped
        }
    }

    /// Current detector states, or `None` while stopped.
    pub fn snapshot(&self) -> Option<EngineSnapshot> {
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        session.as_ref().map(|s| EngineSnapshot {
            power_press: s
                .power_press
                .as_ref()
                .map(|d| d.lock().unwrap_or_else(PoisonError::into_inner).state()),
            chop: s
                .chop
                .as_ref()
                .map(|d| d.lock().unwrap_or_else(PoisonError::into_inner).state()),
        })
    }

    pub fn gestures(&self) -> GestureSelection {
        self.gestures
    }

    pub fn transparency_log(&self) -> &SharedTransparencyLog {
        &self.log
    }

    fn screen_handler(
        &self,
        detector: Arc<Mutex<PowerPressDetector>>,
        active: Arc<AtomicBool>,
    ) -> Handler<ScreenToggleEvent> {
        let arbiter = self.arbiter.clone();
        let log = self.log.clone();
        Arc::new(move |event: ScreenToggleEvent| {
            if !active.load(Ordering::SeqCst) {
                tracing::debug!(gesture = "power_press", "late screen event ignored");
                return;
            }
            log.record_screen_toggle();
            // The detector lock is released before the arbiter runs.
            let triggered = detector
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .on_screen_toggle(event);
            if let Some(t) = triggered {
                log.record_trigger(t.source);
                arbiter.on_detector_output(t);
            }
        })
    }

    fn motion_handler(
        &self,
        detector: Arc<Mutex<ChopDetector>>,
        active: Arc<AtomicBool>,
    ) -> Handler<MotionSample> {
        let arbiter = self.arbiter.clone();
        let log = self.log.clone();
        Arc::new(move |sample: MotionSample| {
            if !active.load(Ordering::SeqCst) {
                tracing::debug!(gesture = "chop", "late motion sample ignored");
                return;
            }
            log.record_motion_sample();
            let triggered = detector
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .on_motion_sample(sample);
            if let Some(t) = triggered {
                log.record_trigger(t.source);
                arbiter.on_detector_output(t);
            }
        })
    }
}

impl Drop for GestureEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
