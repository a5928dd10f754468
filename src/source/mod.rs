//! Signal sources feeding the gesture detectors.
//!
//! The host wires real platform events (screen broadcasts, accelerometer
//! callbacks) into a [`SignalSource`]. The engine subscribes a handler while
//! it is listening and unsubscribes it on stop.

pub mod manual;
pub mod replay;
pub mod types;

use std::sync::Arc;

pub use manual::ManualSource;
pub use replay::{ReplaySource, ReplayStats};
pub use types::{MotionSample, ScreenToggleEvent, ScreenToggleKind, SignalEvent};

/// Callback invoked by a source for every event it delivers.
///
/// Sources may call it from any thread, including concurrently with
/// handlers of other sources.
pub type Handler<E> = Arc<dyn Fn(E) + Send + Sync>;

/// A producer of raw events of type `E`.
pub trait SignalSource<E>: Send + Sync {
    /// Register the handler that receives every subsequent event.
    fn subscribe(&self, handler: Handler<E>) -> Result<(), SourceError>;

    /// Remove the current handler. Does nothing if none is registered.
    fn unsubscribe(&self);
}

/// Errors a source can report when asked to subscribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The underlying sensor or broadcast is not present on this device
    Unavailable(String),
    /// The platform refused access
    PermissionDenied(String),
    /// Someone is already subscribed
    AlreadySubscribed,
    /// A replay is already feeding this source
    AlreadyRunning,
    Io(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Unavailable(what) => write!(f, "Signal source unavailable: {what}"),
            SourceError::PermissionDenied(what) => write!(f, "Permission denied: {what}"),
            SourceError::AlreadySubscribed => write!(f, "Signal source already has a subscriber"),
            SourceError::AlreadyRunning => write!(f, "Replay is already running"),
            SourceError::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for SourceError {}
