use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use crate::session::{
    PlaybackSession, PlaybackState, SessionEvent, TrackMetadata, TransportControls,
    TransportStatus,
};

/// A `pause` this soon after a flipping `play` is absorbed into it.
pub const PAIR_WINDOW: Duration = Duration::from_millis(250);

/// Going back within this many milliseconds of the start selects the previous
/// track; later it restarts the current one.
pub const RESTART_THRESHOLD_MS: u64 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub metadata: TrackMetadata,
    pub duration_ms: Option<u64>,
}

#[derive(Debug)]
struct PlayerState {
    index: usize,
    status: TransportStatus,
    /// Position accumulated up to `started_at`.
    base_ms: u64,
    started_at: Option<Instant>,
    /// Set when the last `play` flipped Paused/Stopped to Playing.
    flipped_by_play: Option<Instant>,
}

/// In-process playlist player exposed as a [`PlaybackSession`].
///
/// Positions are derived from a monotonic clock while playing, so nothing
/// ticks in the background. A `pause` arriving within [`PAIR_WINDOW`] of a
/// `play` that changed state is absorbed: the pair counts as a single flip,
/// which is how the play-pause keycode toggles this transport.
pub struct LocalPlayer {
    id: String,
    tracks: Vec<Track>,
    state: Mutex<PlayerState>,
    events: broadcast::Sender<SessionEvent>,
}

impl LocalPlayer {
    pub fn new(id: impl Into<String>, tracks: Vec<Track>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            id: id.into(),
            tracks,
            state: Mutex::new(PlayerState {
                index: 0,
                status: TransportStatus::Stopped,
                base_ms: 0,
                started_at: None,
                flipped_by_play: None,
            }),
            events,
        }
    }

    pub fn current_index(&self) -> usize {
        self.lock().index
    }

    /// Jump to `index` (wrapping), keeping the transport status.
    pub fn select(&self, index: usize) {
        if self.tracks.is_empty() {
            return;
        }
        {
            let mut state = self.lock();
            state.index = index % self.tracks.len();
            restart(&mut state);
            state.flipped_by_play = None;
        }
        self.notify(SessionEvent::MetadataChanged);
    }

    /// Move the playhead, clamped to the track duration.
    pub fn seek(&self, position_ms: u64) {
        if self.tracks.is_empty() {
            return;
        }
        {
            let mut state = self.lock();
            state.base_ms = match self.tracks[state.index].duration_ms {
                Some(duration) => position_ms.min(duration),
                None => position_ms,
            };
            state.started_at = (state.status == TransportStatus::Playing).then(Instant::now);
        }
        self.notify(SessionEvent::PlaybackStateChanged);
    }

    /// One track forward or back (wrapping). The restart-or-previous decision
    /// and the move happen under the same lock.
    fn step(&self, back: bool) {
        let len = self.tracks.len();
        if len == 0 {
            return;
        }
        let event = {
            let mut state = self.lock();
            let event = if back && self.position_ms(&state) > RESTART_THRESHOLD_MS {
                SessionEvent::PlaybackStateChanged
            } else {
                state.index = if back {
                    (state.index + len - 1) % len
                } else {
                    (state.index + 1) % len
                };
                SessionEvent::MetadataChanged
            };
            restart(&mut state);
            state.flipped_by_play = None;
            event
        };
        self.notify(event);
    }

    fn lock(&self) -> MutexGuard<'_, PlayerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn position_ms(&self, state: &PlayerState) -> u64 {
        let running = state
            .started_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        let position = state.base_ms.saturating_add(running);
        match self.tracks.get(state.index).and_then(|t| t.duration_ms) {
            Some(duration) => position.min(duration),
            None => position,
        }
    }
}

fn restart(state: &mut PlayerState) {
    state.base_ms = 0;
    state.started_at = (state.status == TransportStatus::Playing).then(Instant::now);
}

impl TransportControls for LocalPlayer {
    fn play(&self) {
        if self.tracks.is_empty() {
            return;
        }
        {
            let mut state = self.lock();
            if state.status == TransportStatus::Playing {
                state.flipped_by_play = None;
                return;
            }
            state.status = TransportStatus::Playing;
            state.started_at = Some(Instant::now());
            state.flipped_by_play = Some(Instant::now());
        }
        tracing::debug!("{}: playing", self.id);
        self.notify(SessionEvent::PlaybackStateChanged);
    }

    fn pause(&self) {
        {
            let mut state = self.lock();
            if let Some(at) = state.flipped_by_play.take() {
                if at.elapsed() <= PAIR_WINDOW {
                    return;
                }
            }
            if state.status != TransportStatus::Playing {
                return;
            }
            state.base_ms = self.position_ms(&state);
            state.started_at = None;
            state.status = TransportStatus::Paused;
        }
        tracing::debug!("{}: paused", self.id);
        self.notify(SessionEvent::PlaybackStateChanged);
    }

    fn skip_to_next(&self) {
        self.step(false);
    }

    /// Restarts the current track once past [`RESTART_THRESHOLD_MS`],
    /// otherwise selects the previous one.
    fn skip_to_previous(&self) {
        self.step(true);
    }
}

impl PlaybackSession for LocalPlayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> Option<TrackMetadata> {
        let index = self.lock().index;
        self.tracks.get(index).map(|t| t.metadata.clone())
    }

    fn playback_state(&self) -> Option<PlaybackState> {
        if self.tracks.is_empty() {
            return None;
        }
        let state = self.lock();
        Some(PlaybackState {
            status: state.status,
            position_ms: self.position_ms(&state),
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
