use serde::{Deserialize, Serialize};

use crate::session::{PlaybackSession, PlaybackState, TrackMetadata};

/// One playback state record as emitted on the state channel.
///
/// Field names on the wire are `title`, `artist`, `album`, `position` (ms) and
/// `state` (true while playing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub title: String,
    pub artist: String,
    pub album: String,
    #[serde(rename = "position")]
    pub position_ms: u64,
    #[serde(rename = "state")]
    pub is_playing: bool,
}

impl PlaybackSnapshot {
    /// Combine metadata and transport state. Either missing yields `None`;
    /// partial records are never produced.
    pub fn build(metadata: Option<TrackMetadata>, state: Option<PlaybackState>) -> Option<Self> {
        let (metadata, state) = (metadata?, state?);
        Some(Self {
            title: metadata.title,
            artist: metadata.artist,
            album: metadata.album,
            position_ms: state.position_ms,
            is_playing: state.is_playing(),
        })
    }

    pub fn from_session(session: &dyn PlaybackSession) -> Option<Self> {
        Self::build(session.metadata(), session.playback_state())
    }

    /// Single-line JSON record.
    pub fn to_record(&self) -> String {
        // Five plain fields; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Position as `m:ss`.
    pub fn position_label(&self) -> String {
        let secs = self.position_ms / 1000;
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("no record in line")]
    Missing,
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decode the record carried by one tailed sink line.
///
/// Anything before the first `{` is treated as a log prefix (timestamp, level,
/// tag) and skipped.
pub fn parse_record_line(line: &str) -> Result<PlaybackSnapshot, RecordError> {
    let start = line.find('{').ok_or(RecordError::Missing)?;
    let end = line.rfind('}').ok_or(RecordError::Missing)?;
    if end < start {
        return Err(RecordError::Missing);
    }
    Ok(serde_json::from_str(&line[start..=end])?)
}
