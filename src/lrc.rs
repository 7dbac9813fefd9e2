use std::sync::LazyLock;

use regex::Regex;

/// Translation lines within this distance of an original line are merged into it.
pub const TRANSLATION_WINDOW_MS: u64 = 500;

static TIME_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\d{2}):(\d{2})(?:\.(\d{2,3}))?\]").expect("time tag pattern is valid")
});

/// One timed lyric line, optionally carrying its translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    pub time_ms: u64,
    pub text: String,
    pub translation: Option<String>,
}

impl LyricLine {
    /// Text followed by the translation on its own line, when there is one.
    pub fn display_text(&self) -> String {
        match &self.translation {
            Some(translation) => format!("{}\n{}", self.text, translation),
            None => self.text.clone(),
        }
    }
}

/// Parse LRC content into lines sorted by time.
///
/// Accepts `[mm:ss]`, `[mm:ss.xx]` (centiseconds) and `[mm:ss.xxx]`
/// (milliseconds). A line with several tags yields one entry per tag. Lines
/// without a tag, or with nothing left once tags are removed, are skipped.
pub fn parse(content: &str) -> Vec<LyricLine> {
    let mut lines = Vec::new();

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let times: Vec<u64> = TIME_TAG.captures_iter(line).map(|c| tag_ms(&c)).collect();
        if times.is_empty() {
            continue;
        }
        let text = TIME_TAG.replace_all(line, "").trim().to_string();
        if text.is_empty() {
            continue;
        }
        lines.extend(times.into_iter().map(|time_ms| LyricLine {
            time_ms,
            text: text.clone(),
            translation: None,
        }));
    }

    lines.sort_by_key(|l| l.time_ms);
    lines
}

fn tag_ms(caps: &regex::Captures<'_>) -> u64 {
    let number = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    let fraction = match caps.get(3).map(|m| m.as_str().len()) {
        Some(2) => number(3) * 10,
        Some(3) => number(3),
        _ => 0,
    };
    (number(1) * 60 + number(2)) * 1000 + fraction
}

/// Parse `original` and attach, to each line, the first translation line
/// strictly less than [`TRANSLATION_WINDOW_MS`] away.
pub fn parse_with_translation(original: &str, translation: Option<&str>) -> Vec<LyricLine> {
    let mut lines = parse(original);
    let Some(translation) = translation.filter(|t| !t.trim().is_empty()) else {
        return lines;
    };
    let translated = parse(translation);

    for line in &mut lines {
        line.translation = translated
            .iter()
            .find(|t| t.time_ms.abs_diff(line.time_ms) < TRANSLATION_WINDOW_MS)
            .map(|t| t.text.clone());
    }
    lines
}

/// Index of the line playing at `position_ms`: the last one starting at or
/// before it. `None` before the first line.
pub fn index_at(lines: &[LyricLine], position_ms: u64) -> Option<usize> {
    lines
        .partition_point(|l| l.time_ms <= position_ms)
        .checked_sub(1)
}

pub fn line_at(lines: &[LyricLine], position_ms: u64) -> Option<&LyricLine> {
    index_at(lines, position_ms).map(|i| &lines[i])
}
