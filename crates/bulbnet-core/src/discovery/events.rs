//! Device lifecycle notifications.
//!
//! Handlers run inline on whichever task triggered the event (the correlator
//! for discoveries, the sweep for losses) and must not block. A panicking
//! handler is logged and skipped; other handlers and other devices still get
//! their notifications.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::types::DeviceRecord;

/// Callback invoked with the record an event refers to.
pub type DeviceHandler = Arc<dyn Fn(&DeviceRecord) + Send + Sync>;

/// Which transition a handler listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEventKind {
    /// First correlated sighting of a device.
    Discovered,
    /// Device evicted after going silent.
    Lost,
}

impl DeviceEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceEventKind::Discovered => "discovered",
            DeviceEventKind::Lost => "lost",
        }
    }
}

/// Token returned on registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Registration {
    id: HandlerId,
    kind: DeviceEventKind,
    handler: DeviceHandler,
}

/// Handler registry for discovered/lost notifications.
#[derive(Default)]
pub struct DeviceEvents {
    next_id: AtomicU64,
    handlers: RwLock<Vec<Registration>>,
}

impl fmt::Debug for DeviceEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceEvents")
            .field("handlers", &self.len())
            .finish()
    }
}

impl DeviceEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: DeviceEventKind, handler: F) -> HandlerId
    where
        F: Fn(&DeviceRecord) + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Registration {
                id,
                kind,
                handler: Arc::new(handler),
            });
        id
    }

    /// Returns false if the id was not registered.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|registration| registration.id != id);
        handlers.len() != before
    }

    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `record` to every handler of `kind`, returning how many
    /// completed without panicking.
    pub(crate) fn emit(&self, kind: DeviceEventKind, record: &DeviceRecord) -> usize {
        // Snapshot so handlers may (un)subscribe without deadlocking.
        let handlers: Vec<DeviceHandler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|registration| registration.kind == kind)
            .map(|registration| registration.handler.clone())
            .collect();

        let mut delivered = 0;
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(record))) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::error!(
                    device = %record.identity(),
                    event = kind.as_str(),
                    "device event handler panicked"
                ),
            }
        }
        delivered
    }
}
