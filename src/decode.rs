use std::fmt;

use crate::lrc::{self, LyricLine};
use crate::snapshot::{self, PlaybackSnapshot};

/// One record recovered from a sink line, plus the lyric line that became
/// current with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub snapshot: PlaybackSnapshot,
    /// Set only when the current lyric line changed since the previous record.
    pub lyric: Option<LyricLine>,
}

impl fmt::Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.snapshot;
        write!(
            f,
            "{} - {} [{}] {} {}",
            s.title,
            s.artist,
            s.album,
            s.position_label(),
            if s.is_playing { "playing" } else { "paused" }
        )?;
        if let Some(lyric) = &self.lyric {
            for line in lyric.display_text().lines() {
                write!(f, "\n  {}", line)?;
            }
        }
        Ok(())
    }
}

/// Turns tailed sink output into records, skipping everything else.
///
/// With lyrics loaded, the line current at each record's position is reported
/// once, when it changes. A new title resets the lyric cursor.
#[derive(Debug, Default)]
pub struct Decoder {
    lyrics: Vec<LyricLine>,
    title: Option<String>,
    lyric_index: Option<usize>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lyrics(lyrics: Vec<LyricLine>) -> Self {
        Self {
            lyrics,
            ..Self::default()
        }
    }

    /// Decode one line. `None` for lines that carry no record.
    pub fn feed(&mut self, line: &str) -> Option<Decoded> {
        let snapshot = match snapshot::parse_record_line(line) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::trace!("Skipping line: {}", e);
                return None;
            }
        };

        if self.title.as_deref() != Some(snapshot.title.as_str()) {
            self.title = Some(snapshot.title.clone());
            self.lyric_index = None;
        }

        let index = lrc::index_at(&self.lyrics, snapshot.position_ms);
        let lyric = if index != self.lyric_index {
            self.lyric_index = index;
            index.map(|i| self.lyrics[i].clone())
        } else {
            None
        };

        Some(Decoded { snapshot, lyric })
    }
}

/// Records carried by `lines`, in order. Lines without one are dropped.
pub fn records<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<PlaybackSnapshot> {
    let mut decoder = Decoder::new();
    lines
        .into_iter()
        .filter_map(|line| decoder.feed(line))
        .map(|decoded| decoded.snapshot)
        .collect()
}
