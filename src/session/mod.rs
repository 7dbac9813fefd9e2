pub mod discovery;
pub mod local;
pub mod registry;

use std::sync::{Arc, Weak};

use tokio::sync::broadcast;

/// Track metadata as reported by the session. Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStatus {
    Stopped,
    Paused,
    Playing,
    Buffering,
}

/// Transport state: status plus playhead position in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
    pub status: TransportStatus,
    pub position_ms: u64,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        self.status == TransportStatus::Playing
    }
}

/// Change notification delivered to subscribers of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    MetadataChanged,
    PlaybackStateChanged,
}

/// Transport actions a remote client may trigger.
pub trait TransportControls: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn skip_to_next(&self);
    fn skip_to_previous(&self);
}

/// An externally owned playback session.
pub trait PlaybackSession: TransportControls {
    /// Identifier of the application owning the session, for logs.
    fn id(&self) -> &str;

    fn metadata(&self) -> Option<TrackMetadata>;

    fn playback_state(&self) -> Option<PlaybackState>;

    /// Receiver for metadata and transport-state change notifications.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;

    /// False once the owner has torn the session down even though the
    /// object is still alive.
    fn is_active(&self) -> bool {
        true
    }
}

/// Weak reference to a [`PlaybackSession`].
///
/// `upgrade` returns `None` both when the session was dropped and when it
/// reports itself inactive, so callers treat "stale" and "absent" alike.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Weak<dyn PlaybackSession>,
}

impl SessionHandle {
    pub fn new(session: &Arc<dyn PlaybackSession>) -> Self {
        Self {
            inner: Arc::downgrade(session),
        }
    }

    pub fn upgrade(&self) -> Option<Arc<dyn PlaybackSession>> {
        self.inner.upgrade().filter(|s| s.is_active())
    }

    pub fn is_stale(&self) -> bool {
        self.upgrade().is_none()
    }

    /// Whether both handles point at the same session object.
    pub fn same_session(&self, other: &SessionHandle) -> bool {
        Weak::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upgrade() {
            Some(session) => write!(f, "SessionHandle({})", session.id()),
            None => f.write_str("SessionHandle(<stale>)"),
        }
    }
}
