use std::sync::{Arc, PoisonError, RwLock};

use crate::session::{PlaybackSession, SessionHandle};

/// Holds the single active session handle shared by the command server and
/// the state reporter.
///
/// Constructed once and passed around as `Arc<SessionRegistry>`. The handle is
/// replaced wholesale on `set`, never mutated in place, so one RwLock is the
/// only synchronization needed. A poisoned lock still holds a valid handle and
/// is read through.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    current: RwLock<Option<SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last writer wins.
    pub fn set(&self, handle: SessionHandle) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Some(handle);
    }

    pub fn set_session(&self, session: &Arc<dyn PlaybackSession>) {
        tracing::debug!("Active session is now {}", session.id());
        self.set(SessionHandle::new(session));
    }

    pub fn get(&self) -> Option<SessionHandle> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
