use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::MissedTickBehavior;

use crate::session::discovery::SessionDiscovery;
use crate::session::registry::SessionRegistry;
use crate::session::{SessionEvent, SessionHandle};
use crate::sink::SnapshotSink;
use crate::snapshot::PlaybackSnapshot;

pub const DEFAULT_HEARTBEAT: Duration = Duration::from_millis(1000);

struct Subscription {
    handle: SessionHandle,
    events: broadcast::Receiver<SessionEvent>,
}

/// Pushes playback snapshots to a sink on every session change and on a
/// fixed heartbeat.
pub struct StateReporter {
    registry: Arc<SessionRegistry>,
    sink: Arc<dyn SnapshotSink>,
    heartbeat: Duration,
    subscription: Option<Subscription>,
}

impl StateReporter {
    pub fn new(
        registry: Arc<SessionRegistry>,
        sink: Arc<dyn SnapshotSink>,
        heartbeat: Duration,
    ) -> Self {
        Self {
            registry,
            sink,
            // tokio intervals reject a zero period
            heartbeat: if heartbeat.is_zero() {
                DEFAULT_HEARTBEAT
            } else {
                heartbeat
            },
            subscription: None,
        }
    }

    /// One-shot discovery at startup. The first session found becomes the
    /// active one and the subscription target. Returns false when nothing
    /// was found; discovery is not retried.
    pub fn attach(&mut self, discovery: &dyn SessionDiscovery) -> bool {
        let sessions = discovery.active_sessions();
        tracing::info!("Active sessions: {}", sessions.len());

        let Some(first) = sessions.first() else {
            tracing::info!("No active media session");
            return false;
        };
        tracing::info!("Active session: {}", first.id());
        self.registry.set_session(first);
        self.follow_registry();
        true
    }

    /// Build a snapshot from the registry's current session and push it.
    /// Returns what was pushed; `None` when no complete snapshot exists.
    pub fn push_current(&self) -> Option<PlaybackSnapshot> {
        let session = self.registry.get()?.upgrade()?;
        let Some(snapshot) = PlaybackSnapshot::from_session(session.as_ref()) else {
            tracing::trace!("{}: metadata or transport state unavailable", session.id());
            return None;
        };
        self.sink.push(&snapshot);
        Some(snapshot)
    }

    /// Heartbeat and event loop. Runs until `shutdown_rx` fires.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut heartbeat = tokio::time::interval(self.heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    self.follow_registry();
                    self.push_current();
                }

                event = next_event(&mut self.subscription) => {
                    match event {
                        Ok(event) => {
                            tracing::debug!("Session event: {:?}", event);
                            self.follow_registry();
                            self.push_current();
                        }
                        Err(RecvError::Lagged(missed)) => {
                            tracing::debug!("Session events lagged by {}", missed);
                            self.follow_registry();
                            self.push_current();
                        }
                        Err(RecvError::Closed) => {
                            tracing::debug!("Session event channel closed");
                            self.subscription = None;
                        }
                    }
                }

                _ = shutdown_rx.recv() => {
                    tracing::debug!("State reporter: shutdown signal received");
                    return;
                }
            }
        }
    }

    /// Keep the subscription pointed at the registry's current session.
    fn follow_registry(&mut self) {
        let current = self.registry.get();
        let up_to_date = match (&current, &self.subscription) {
            (Some(handle), Some(sub)) => handle.same_session(&sub.handle),
            (None, None) => true,
            _ => false,
        };
        if up_to_date {
            return;
        }

        self.subscription = current.and_then(|handle| {
            let session = handle.upgrade()?;
            tracing::debug!("Subscribing to {}", session.id());
            Some(Subscription {
                events: session.subscribe(),
                handle,
            })
        });
    }
}

/// Next event from the subscription, or never when there is none.
async fn next_event(subscription: &mut Option<Subscription>) -> Result<SessionEvent, RecvError> {
    match subscription {
        Some(sub) => sub.events.recv().await,
        None => std::future::pending().await,
    }
}
