//! Host-driven signal source.
//!
//! The embedding application calls [`ManualSource::emit`] from its own
//! platform callback (a broadcast receiver, a sensor listener) and the event
//! is forwarded to whoever is subscribed.

use super::{Handler, SignalSource, SourceError};
use std::sync::{Mutex, PoisonError, RwLock};

pub struct ManualSource<E> {
    name: &'static str,
    handler: RwLock<Option<Handler<E>>>,
    /// When set, `subscribe` fails with this error
    failure: Mutex<Option<SourceError>>,
}

impl<E> ManualSource<E> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handler: RwLock::new(None),
            failure: Mutex::new(None),
        }
    }

    /// Make every following `subscribe` fail, e.g. when the sensor is absent.
    pub fn set_failure(&self, failure: Option<SourceError>) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = failure;
    }

    /// Forward an event to the subscriber.
    ///
    /// Returns `false` when nobody is subscribed and the event was dropped.
    /// The handler runs on the calling thread without any source lock held.
    pub fn emit(&self, event: E) -> bool {
        let handler = self
            .handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match handler {
            Some(handler) => {
                handler(event);
                true
            }
            None => {
                tracing::trace!(source = self.name, "event dropped, no subscriber");
                false
            }
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<E: Send> SignalSource<E> for ManualSource<E> {
    fn subscribe(&self, handler: Handler<E>) -> Result<(), SourceError> {
        if let Some(err) = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(err);
        }

        let mut slot = self.handler.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(SourceError::AlreadySubscribed);
        }
        *slot = Some(handler);
        tracing::debug!(source = self.name, "subscribed");
        Ok(())
    }

    fn unsubscribe(&self) {
        let previous = self
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            tracing::debug!(source = self.name, "unsubscribed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_emit_without_subscriber_is_dropped() {
        let source: ManualSource<u32> = ManualSource::new("test");
        assert!(!source.emit(1));
    }

    #[test]
    fn test_subscribe_emit_unsubscribe() {
        let source: ManualSource<u32> = ManualSource::new("test");
        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();

        source
            .subscribe(Arc::new(move |v: u32| {
                s.fetch_add(v as usize, Ordering::SeqCst);
            }))
            .unwrap();
        assert!(source.is_subscribed());
        assert!(source.emit(2));
        assert!(source.emit(3));
        assert_eq!(seen.load(Ordering::SeqCst), 5);

        source.unsubscribe();
        assert!(!source.emit(10));
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_second_subscriber_rejected() {
        let source: ManualSource<u32> = ManualSource::new("test");
        source.subscribe(Arc::new(|_: u32| {})).unwrap();
        assert_eq!(
            source.subscribe(Arc::new(|_: u32| {})),
            Err(SourceError::AlreadySubscribed)
        );
    }

    #[test]
    fn test_configured_failure() {
        let source: ManualSource<u32> = ManualSource::new("accelerometer");
        source.set_failure(Some(SourceError::Unavailable("no accelerometer".into())));
        assert!(source.subscribe(Arc::new(|_: u32| {})).is_err());
        assert!(!source.is_subscribed());

        source.set_failure(None);
        assert!(source.subscribe(Arc::new(|_: u32| {})).is_ok());
    }
}
