//! Discovery sessions and their correlation ids.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

/// Issues strictly increasing correlation ids, starting at 1.
///
/// Id 0 is never issued.
#[derive(Debug)]
pub struct SessionIdAllocator {
    next: AtomicU32,
}

impl SessionIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(1),
        }
    }

    pub fn next(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for SessionIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// One discovery attempt: a correlation id and its cancellation flag.
#[derive(Debug)]
struct DiscoverySession {
    id: u32,
    cancel: watch::Sender<bool>,
}

impl DiscoverySession {
    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}

/// Outcome of [`SessionTracker::begin`].
#[derive(Debug)]
pub enum SessionStart {
    /// A new session was created; the receiver observes its cancellation.
    Started {
        id: u32,
        cancel: watch::Receiver<bool>,
    },
    /// A session was already running and was left untouched.
    AlreadyRunning { id: u32 },
}

/// Holds the single active session, shared by the loop owner and the correlator.
#[derive(Debug, Default)]
pub struct SessionTracker {
    current: Mutex<Option<DiscoverySession>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<DiscoverySession>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a session unless a live one exists.
    pub fn begin(&self, allocator: &SessionIdAllocator) -> SessionStart {
        let mut slot = self.slot();

        if let Some(session) = slot.as_ref() {
            if !session.is_cancelled() {
                return SessionStart::AlreadyRunning { id: session.id };
            }
        }

        let id = allocator.next();
        let (cancel, receiver) = watch::channel(false);
        *slot = Some(DiscoverySession { id, cancel });

        SessionStart::Started {
            id,
            cancel: receiver,
        }
    }

    /// Cancel the active session, returning its id. No-op when idle.
    pub fn cancel(&self) -> Option<u32> {
        let session = self.slot().take()?;
        // The loop may already have exited; nobody listening is fine.
        let _ = session.cancel.send(true);
        Some(session.id)
    }

    /// Id of the live session, if any.
    pub fn active_id(&self) -> Option<u32> {
        self.slot()
            .as_ref()
            .filter(|session| !session.is_cancelled())
            .map(|session| session.id)
    }
}
