use std::io::{Stdout, Write};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::snapshot::PlaybackSnapshot;

/// Tracing target carrying snapshot records; consumers filter on it.
pub const RECORD_TARGET: &str = "USB_MUSIC";

/// Outbound destination for snapshots. `push` must not block.
pub trait SnapshotSink: Send + Sync {
    fn push(&self, snapshot: &PlaybackSnapshot);
}

/// Emits each record as an info event on [`RECORD_TARGET`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl SnapshotSink for TracingSink {
    fn push(&self, snapshot: &PlaybackSnapshot) {
        tracing::info!(target: RECORD_TARGET, "{}", snapshot.to_record());
    }
}

/// Writes one record per line to `W`, flushing after each.
#[derive(Debug)]
pub struct LineSink<W> {
    out: Mutex<W>,
}

pub type StdoutSink = LineSink<Stdout>;

impl LineSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> SnapshotSink for LineSink<W> {
    fn push(&self, snapshot: &PlaybackSnapshot) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{}", snapshot.to_record()).and_then(|_| out.flush()) {
            tracing::debug!("line sink write failed: {}", e);
        }
    }
}

/// Forwards snapshots into an unbounded channel. Sends after the receiver
/// is gone are dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<PlaybackSnapshot>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PlaybackSnapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SnapshotSink for ChannelSink {
    fn push(&self, snapshot: &PlaybackSnapshot) {
        let _ = self.tx.send(snapshot.clone());
    }
}
