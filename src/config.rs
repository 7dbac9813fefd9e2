use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::reporter::DEFAULT_HEARTBEAT;
use crate::server::DEFAULT_PORT;
use crate::session::local::Track;
use crate::session::TrackMetadata;

fn default_player_name() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|os| os.into_string().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or_default();
    if host.is_empty() {
        "mc2pc".to_string()
    } else {
        format!("mc2pc@{}", host)
    }
}

/// Where snapshot records are emitted.
#[derive(Deserialize, clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Structured log line on the `USB_MUSIC` target
    #[default]
    Log,
    /// One JSON record per line on stdout
    Stdout,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TrackConfig {
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    pub duration_ms: Option<u64>,
}

impl From<TrackConfig> for Track {
    fn from(t: TrackConfig) -> Self {
        Track {
            metadata: TrackMetadata {
                title: t.title,
                artist: t.artist,
                album: t.album,
            },
            duration_ms: t.duration_ms,
        }
    }
}

#[derive(Deserialize, Default, Debug)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub localhost: Option<bool>,
    pub heartbeat_ms: Option<u64>,
    pub read_timeout_ms: Option<u64>,
    pub sink: Option<SinkKind>,
    pub player_name: Option<String>,
    #[serde(default)]
    pub tracks: Vec<TrackConfig>,
}

#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub localhost: bool,
    pub heartbeat: Duration,
    /// `None` waits on a silent client indefinitely.
    pub read_timeout: Option<Duration>,
    pub sink: SinkKind,
    pub player_name: String,
    pub tracks: Vec<Track>,
}

impl Config {
    pub fn resolve(file: Option<FileConfig>, args: &crate::cli::ServeArgs) -> Self {
        let file = file.unwrap_or_default();
        Config {
            port: args.port.or(file.port).unwrap_or(DEFAULT_PORT),
            localhost: args.localhost || file.localhost.unwrap_or(false),
            heartbeat: args
                .heartbeat_ms
                .or(file.heartbeat_ms)
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_HEARTBEAT),
            read_timeout: args
                .read_timeout_ms
                .or(file.read_timeout_ms)
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            sink: args.sink.or(file.sink).unwrap_or_default(),
            player_name: file.player_name.unwrap_or_else(default_player_name),
            tracks: file.tracks.into_iter().map(Track::from).collect(),
        }
    }
}

pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_owned());
    }
    let cwd_config = PathBuf::from("mc2pc.toml");
    if cwd_config.exists() {
        return Some(cwd_config);
    }
    dirs::config_dir()
        .map(|dir| dir.join("mc2pc").join("config.toml"))
        .filter(|path| path.exists())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}
