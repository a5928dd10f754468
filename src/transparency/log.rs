//! Activity log for the gesture engine.
//!
//! Tracks how many signals the engine has seen and how many triggers it has
//! delivered, so a user can check that detection is alive. Counters never
//! feed back into detection.

use crate::core::{EmergencyDelivery, GestureSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Number of recent deliveries kept in memory.
pub const HISTORY_LEN: usize = 32;

/// Activity statistics for the current session.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Screen transitions handed to the power-press detector
    screen_toggles: AtomicU64,
    /// Motion samples handed to the chop detector
    motion_samples: AtomicU64,
    power_press_triggers: AtomicU64,
    chop_triggers: AtomicU64,
    /// Triggers the sink accepted
    deliveries: AtomicU64,
    delivery_failures: AtomicU64,
    /// Triggers dropped by the arbiter's rate limit
    rate_limited: AtomicU64,
    /// Most recent successful deliveries, oldest first
    history: Mutex<VecDeque<EmergencyDelivery>>,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    /// Create a new transparency log.
    pub fn new() -> Self {
        Self {
            screen_toggles: AtomicU64::new(0),
            motion_samples: AtomicU64::new(0),
            power_press_triggers: AtomicU64::new(0),
            chop_triggers: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            history: Mutex::new(VecDeque::with_capacity(HISTORY_LEN)),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a transparency log with persistence.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("could not load previous transparency stats: {e}");
        }

        log
    }

    pub fn record_screen_toggle(&self) {
        self.screen_toggles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_motion_sample(&self) {
        self.motion_samples.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a detector reaching its threshold.
    pub fn record_trigger(&self, source: GestureSource) {
        let counter = match source {
            GestureSource::PowerPress => &self.power_press_triggers,
            GestureSource::Chop => &self.chop_triggers,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delivery the sink accepted.
    pub fn record_delivery(&self, delivery: &EmergencyDelivery) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        if history.len() == HISTORY_LEN {
            history.pop_front();
        }
        history.push_back(delivery.clone());
    }

    pub fn record_delivery_failure(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    /// Recent deliveries, oldest first.
    pub fn history(&self) -> Vec<EmergencyDelivery> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            screen_toggles: self.screen_toggles.load(Ordering::Relaxed),
            motion_samples: self.motion_samples.load(Ordering::Relaxed),
            power_press_triggers: self.power_press_triggers.load(Ordering::Relaxed),
            chop_triggers: self.chop_triggers.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Screen toggles seen: {}\n\
             - Motion samples seen: {}\n\
             - Power-press triggers: {}\n\
             - Chop triggers: {}\n\
             - Deliveries: {} ({} failed, {} rate limited)\n\
             - Session duration: {} seconds",
            stats.screen_toggles,
            stats.motion_samples,
            stats.power_press_triggers,
            stats.chop_triggers,
            stats.deliveries,
            stats.delivery_failures,
            stats.rate_limited,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                screen_toggles: stats.screen_toggles,
                motion_samples: stats.motion_samples,
                power_press_triggers: stats.power_press_triggers,
                chop_triggers: stats.chop_triggers,
                deliveries: stats.deliveries,
                delivery_failures: stats.delivery_failures,
                rate_limited: stats.rate_limited,
                recent_deliveries: self.history(),
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.screen_toggles
                    .store(persisted.screen_toggles, Ordering::Relaxed);
                self.motion_samples
                    .store(persisted.motion_samples, Ordering::Relaxed);
                self.power_press_triggers
                    .store(persisted.power_press_triggers, Ordering::Relaxed);
                self.chop_triggers
                    .store(persisted.chop_triggers, Ordering::Relaxed);
                self.deliveries.store(persisted.deliveries, Ordering::Relaxed);
                self.delivery_failures
                    .store(persisted.delivery_failures, Ordering::Relaxed);
                self.rate_limited
                    .store(persisted.rate_limited, Ordering::Relaxed);

                let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
                history.clear();
                let skip = persisted.recent_deliveries.len().saturating_sub(HISTORY_LEN);
                history.extend(persisted.recent_deliveries.into_iter().skip(skip));
            }
        }
        Ok(())
    }

    /// Reset all counters and forget the history.
    pub fn reset(&self) {
        self.screen_toggles.store(0, Ordering::Relaxed);
        self.motion_samples.store(0, Ordering::Relaxed);
        self.power_press_triggers.store(0, Ordering::Relaxed);
        self.chop_triggers.store(0, Ordering::Relaxed);
        self.deliveries.store(0, Ordering::Relaxed);
        self.delivery_failures.store(0, Ordering::Relaxed);
        self.rate_limited.store(0, Ordering::Relaxed);
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub screen_toggles: u64,
    pub motion_samples: u64,
    pub power_press_triggers: u64,
    pub chop_triggers: u64,
    pub deliveries: u64,
    pub delivery_failures: u64,
    pub rate_limited: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    screen_toggles: u64,
    motion_samples: u64,
    power_press_triggers: u64,
    chop_triggers: u64,
    deliveries: u64,
    delivery_failures: u64,
    rate_limited: u64,
    #[serde(default)]
    recent_deliveries: Vec<EmergencyDelivery>,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

/// Create a new shared transparency log.
pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

/// Create a new shared transparency log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}
