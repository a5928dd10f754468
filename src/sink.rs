//! Delivery sinks: where emergency triggers leave the engine.
//!
//! The application layer implements [`DeliverySink`] to react to a trigger
//! (on Android: forward it over the method channel to the UI, which picks
//! the contact and composes the SMS). Sinks are called from the arbiter's
//! dispatcher thread, never from a sensor callback.

use crate::core::EmergencyDelivery;
use crossbeam_channel::Sender;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// Action name the UI layer listens for.
pub const TRIGGER_ACTION: &str = "TRIGGER_EMERGENCY_SHARING";

/// Receiver of emergency deliveries.
pub trait DeliverySink: Send + Sync {
    fn deliver(&self, delivery: &EmergencyDelivery) -> Result<(), DeliveryError>;
}

/// A sink could not hand the trigger on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryError(pub String);

impl DeliveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Delivery failed: {}", self.0)
    }
}

impl std::error::Error for DeliveryError {}

/// Forwards deliveries into a channel, e.g. toward a UI event loop.
pub struct ChannelSink {
    sender: Sender<EmergencyDelivery>,
}

impl ChannelSink {
    pub fn new(sender: Sender<EmergencyDelivery>) -> Self {
        Self { sender }
    }
}

impl DeliverySink for ChannelSink {
    fn deliver(&self, delivery: &EmergencyDelivery) -> Result<(), DeliveryError> {
        self.sender
            .send(delivery.clone())
            .map_err(|_| DeliveryError::new("receiver disconnected"))
    }
}

/// Logs each delivery and does nothing else.
#[derive(Debug, Default)]
pub struct LogSink;

impl DeliverySink for LogSink {
    fn deliver(&self, delivery: &EmergencyDelivery) -> Result<(), DeliveryError> {
        tracing::info!(
            action = TRIGGER_ACTION,
            gesture = %delivery.trigger.source,
            id = %delivery.id,
            "emergency trigger delivered"
        );
        Ok(())
    }
}

/// Writes one JSON object per delivery, newline separated.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> DeliverySink for JsonLinesSink<W> {
    fn deliver(&self, delivery: &EmergencyDelivery) -> Result<(), DeliveryError> {
        let line = serde_json::json!({
            "action": TRIGGER_ACTION,
            "delivery": delivery,
        });
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        serde_json::to_writer(&mut *writer, &line).map_err(|e| DeliveryError::new(e.to_string()))?;
        writer
            .write_all(b"\n")
            .and_then(|_| writer.flush())
            .map_err(|e| DeliveryError::new(e.to_string()))
    }
}

/// Adapts a closure into a sink.
pub struct FnSink<F> {
    f: F,
}

impl<F> FnSink<F>
where
    F: Fn(&EmergencyDelivery) -> Result<(), DeliveryError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> DeliverySink for FnSink<F>
where
    F: Fn(&EmergencyDelivery) -> Result<(), DeliveryError> + Send + Sync,
{
    fn deliver(&self, delivery: &EmergencyDelivery) -> Result<(), DeliveryError> {
        (self.f)(delivery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EmergencyTrigger, GestureSource};

    fn delivery() -> EmergencyDelivery {
        EmergencyDelivery::new(EmergencyTrigger {
            source: GestureSource::Chop,
            at: 1200,
        })
    }

    #[test]
    fn test_channel_sink_forwards() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let sink = ChannelSink::new(tx);
        let d = delivery();
        sink.deliver(&d).unwrap();
        assert_eq!(rx.try_recv().unwrap(), d);
    }

    #[test]
    fn test_channel_sink_reports_disconnect() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        assert!(ChannelSink::new(tx).deliver(&delivery()).is_err());
    }

    #[test]
    fn test_json_lines_sink_output() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.deliver(&delivery()).unwrap();
        sink.deliver(&delivery()).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["action"], TRIGGER_ACTION);
        assert_eq!(first["delivery"]["trigger"]["source"], "chop");
        assert_eq!(first["delivery"]["trigger"]["at"], 1200);
    }
}
