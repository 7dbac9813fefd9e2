use std::sync::Arc;

use crate::session::PlaybackSession;

/// Source of currently active playback sessions, most relevant first.
///
/// Implementations own the sessions they return; callers downgrade them into
/// [`SessionHandle`](crate::session::SessionHandle)s and must not extend their
/// lifetime beyond the call.
pub trait SessionDiscovery: Send + Sync {
    fn active_sessions(&self) -> Vec<Arc<dyn PlaybackSession>>;
}

/// Discovery over a fixed list of sessions owned by the caller.
#[derive(Default)]
pub struct StaticDiscovery {
    sessions: Vec<Arc<dyn PlaybackSession>>,
}

impl StaticDiscovery {
    pub fn new(sessions: Vec<Arc<dyn PlaybackSession>>) -> Self {
        Self { sessions }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl SessionDiscovery for StaticDiscovery {
    fn active_sessions(&self) -> Vec<Arc<dyn PlaybackSession>> {
        self.sessions
            .iter()
            .filter(|s| s.is_active())
            .cloned()
            .collect()
    }
}
