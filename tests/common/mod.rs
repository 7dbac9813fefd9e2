#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;

use mc2pc::session::{
    PlaybackSession, PlaybackState, SessionEvent, TrackMetadata, TransportControls,
    TransportStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Play,
    Pause,
    Next,
    Previous,
}

/// Session that records every transport call and reports whatever the test
/// sets.
pub struct RecordingSession {
    id: String,
    calls: Mutex<Vec<Call>>,
    metadata: Mutex<Option<TrackMetadata>>,
    state: Mutex<Option<PlaybackState>>,
    active: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

impl RecordingSession {
    pub fn new(id: &str) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            id: id.to_string(),
            calls: Mutex::new(Vec::new()),
            metadata: Mutex::new(None),
            state: Mutex::new(None),
            active: AtomicBool::new(true),
            events,
        })
    }

    /// Session already reporting `title` as playing at `position_ms`.
    pub fn playing(id: &str, title: &str, position_ms: u64) -> Arc<Self> {
        let session = Self::new(id);
        *session.metadata.lock().unwrap() = Some(metadata(title));
        *session.state.lock().unwrap() = Some(PlaybackState {
            status: TransportStatus::Playing,
            position_ms,
        });
        session
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_metadata(&self, metadata: Option<TrackMetadata>) {
        *self.metadata.lock().unwrap() = metadata;
        let _ = self.events.send(SessionEvent::MetadataChanged);
    }

    pub fn set_state(&self, state: Option<PlaybackState>) {
        *self.state.lock().unwrap() = state;
        let _ = self.events.send(SessionEvent::PlaybackStateChanged);
    }

    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn as_dyn(self: &Arc<Self>) -> Arc<dyn PlaybackSession> {
        Arc::clone(self) as Arc<dyn PlaybackSession>
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn metadata(title: &str) -> TrackMetadata {
    TrackMetadata {
        title: title.to_string(),
        artist: format!("{title} Artist"),
        album: format!("{title} Album"),
    }
}

impl TransportControls for RecordingSession {
    fn play(&self) {
        self.record(Call::Play);
    }
    fn pause(&self) {
        self.record(Call::Pause);
    }
    fn skip_to_next(&self) {
        self.record(Call::Next);
    }
    fn skip_to_previous(&self) {
        self.record(Call::Previous);
    }
}

impl PlaybackSession for RecordingSession {
    fn id(&self) -> &str {
        &self.id
    }
    fn metadata(&self) -> Option<TrackMetadata> {
        self.metadata.lock().unwrap().clone()
    }
    fn playback_state(&self) -> Option<PlaybackState> {
        *self.state.lock().unwrap()
    }
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
