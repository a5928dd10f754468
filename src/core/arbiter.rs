//! Merges detector triggers into outward emergency deliveries.
//!
//! The arbiter is called on whatever thread the detector ran on (the host's
//! main thread for screen events, the sensor thread for motion samples). It
//! never calls the sink there: accepted deliveries go into an unbounded
//! queue drained by a dedicated dispatcher thread, so a slow sink cannot
//! stall a sensor callback.

use super::detector::{GestureSource, Triggered};
use crate::clock::Timestamp;
use crate::sink::DeliverySink;
use crate::transparency::SharedTransparencyLog;
use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use uuid::Uuid;

/// The signal handed to the application layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyTrigger {
    pub source: GestureSource,
    /// Monotonic time of the event that completed the gesture
    pub at: Timestamp,
}

impl From<Triggered> for EmergencyTrigger {
    fn from(t: Triggered) -> Self {
        Self {
            source: t.source,
            at: t.at,
        }
    }
}

/// One delivery of a trigger. The id lets a consumer drop duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyDelivery {
    pub id: Uuid,
    pub trigger: EmergencyTrigger,
    /// Wall-clock time the arbiter accepted the trigger
    pub issued_at: DateTime<Utc>,
}

impl EmergencyDelivery {
    pub fn new(trigger: EmergencyTrigger) -> Self {
        Self {
            id: Uuid::new_v4(),
            trigger,
            issued_at: Utc::now(),
        }
    }
}

pub struct Arbiter {
    /// 0 disables rate limiting
    min_interval_ms: i64,
    last_delivery: Mutex<Option<Timestamp>>,
    queue: Option<Sender<EmergencyDelivery>>,
    dispatcher: Option<JoinHandle<()>>,
    log: SharedTransparencyLog,
}

impl Arbiter {
    /// Create an arbiter and start its dispatcher thread.
    pub fn new(
        sink: Arc<dyn DeliverySink>,
        min_interval: Duration,
        log: SharedTransparencyLog,
    ) -> Self {
        let (sender, receiver) = unbounded();
        let dispatch_log = log.clone();
        let dispatcher = thread::spawn(move || dispatch(receiver, sink, dispatch_log));

        Self {
            min_interval_ms: min_interval.as_millis().min(i64::MAX as u128) as i64,
            last_delivery: Mutex::new(None),
            queue: Some(sender),
            dispatcher: Some(dispatcher),
            log,
        }
    }

    /// Accept a detector's trigger and queue it for the sink.
    ///
    /// Returns the queued delivery, or `None` if rate limiting dropped it.
    /// Without a minimum interval every trigger is delivered, including two
    /// near-simultaneous ones from different detectors.
    pub fn on_detector_output(&self, t: Triggered) -> Option<EmergencyDelivery> {
        if self.min_interval_ms > 0 {
            let mut last = self
                .last_delivery
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = *last {
                let gap = t.at.saturating_sub(previous);
                if gap < self.min_interval_ms {
                    tracing::info!(
                        gesture = %t.source,
                        gap_ms = gap,
                        "trigger dropped by delivery rate limit"
                    );
                    self.log.record_rate_limited();
                    return None;
                }
            }
            *last = Some(t.at);
        }

        let delivery = EmergencyDelivery::new(t.into());
        let queue = self.queue.as_ref()?;
        if queue.send(delivery.clone()).is_err() {
            tracing::warn!(gesture = %t.source, "dispatcher gone, trigger not delivered");
            return None;
        }

        tracing::info!(
            gesture = %t.source,
            at_ms = t.at,
            id = %delivery.id,
            "emergency trigger queued"
        );
        Some(delivery)
    }
}

impl Drop for Arbiter {
    fn drop(&mut self) {
        // Closing the queue lets the dispatcher drain what is left and exit.
        self.queue.take();
        if let Some(handle) = self.dispatcher.take() {
            let _ = handle.join();
        }
    }
}

fn dispatch(
    receiver: Receiver<EmergencyDelivery>,
    sink: Arc<dyn DeliverySink>,
    log: SharedTransparencyLog,
) {
    for delivery in receiver {
        match sink.deliver(&delivery) {
            Ok(()) => log.record_delivery(&delivery),
            Err(e) => {
                // Not retried: the detector already consumed the gesture.
                tracing::warn!(id = %delivery.id, "delivery failed: {e}");
                log.record_delivery_failure();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{ChannelSink, DeliveryError, FnSink};
    use crate::transparency::create_shared_log;

    fn trigger(source: GestureSource, at: Timestamp) -> Triggered {
        Triggered { source, at }
    }

    #[test]
    fn test_every_trigger_forwarded_without_rate_limit() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let log = create_shared_log();
        let arbiter = Arbiter::new(Arc::new(ChannelSink::new(tx)), Duration::ZERO, log.clone());

        assert!(arbiter
            .on_detector_output(trigger(GestureSource::PowerPress, 1000))
            .is_some());
        assert!(arbiter
            .on_detector_output(trigger(GestureSource::Chop, 1001))
            .is_some());
        drop(arbiter);

        let delivered: Vec<_> = rx.try_iter().map(|d| d.trigger.source).collect();
        assert_eq!(delivered, vec![GestureSource::PowerPress, GestureSource::Chop]);
        assert_eq!(log.stats().deliveries, 2);
    }

    #[test]
    fn test_rate_limit_drops_close_triggers() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let log = create_shared_log();
        let arbiter = Arbiter::new(
            Arc::new(ChannelSink::new(tx)),
            Duration::from_millis(5000),
            log.clone(),
        );

        assert!(arbiter
            .on_detector_output(trigger(GestureSource::PowerPress, 0))
            .is_some());
        assert!(arbiter
            .on_detector_output(trigger(GestureSource::Chop, 100))
            .is_none());
        assert!(arbiter
            .on_detector_output(trigger(GestureSource::Chop, 5000))
            .is_some());
        drop(arbiter);

        assert_eq!(rx.try_iter().count(), 2);
        assert_eq!(log.stats().rate_limited, 1);
    }

    #[test]
    fn test_slow_sink_does_not_block_caller() {
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
        let sink = FnSink::new(move |_d: &EmergencyDelivery| {
            // Block until the test releases the gate.
            let _ = gate_rx.recv();
            Ok(())
        });
        let arbiter = Arbiter::new(Arc::new(sink), Duration::ZERO, create_shared_log());

        for at in 0..5 {
            assert!(arbiter
                .on_detector_output(trigger(GestureSource::Chop, at))
                .is_some());
        }

        for _ in 0..5 {
            gate_tx.send(()).unwrap();
        }
        drop(arbiter);
    }

    #[test]
    fn test_sink_failure_is_counted_not_retried() {
        let attempts = Arc::new(Mutex::new(0));
        let a = attempts.clone();
        let sink = FnSink::new(move |_d: &EmergencyDelivery| {
            *a.lock().unwrap() += 1;
            Err(DeliveryError::new("ui channel closed"))
        });
        let log = create_shared_log();
        let arbiter = Arbiter::new(Arc::new(sink), Duration::ZERO, log.clone());

        assert!(arbiter
            .on_detector_output(trigger(GestureSource::PowerPress, 0))
            .is_some());
        drop(arbiter);

        assert_eq!(*attempts.lock().unwrap(), 1);
        assert_eq!(log.stats().delivery_failures, 1);
        assert_eq!(log.stats().deliveries, 0);
    }
}
