use std::str::FromStr;

use crate::session::SessionHandle;

pub const KEYCODE_PLAY_PAUSE: i32 = 85;
pub const KEYCODE_NEXT: i32 = 87;
pub const KEYCODE_PREVIOUS: i32 = 88;

/// Playback action decoded from a keycode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    PlayPause,
    Next,
    Previous,
    Unknown(i32),
}

impl Command {
    pub fn from_code(code: i32) -> Self {
        match code {
            KEYCODE_PLAY_PAUSE => Command::PlayPause,
            KEYCODE_NEXT => Command::Next,
            KEYCODE_PREVIOUS => Command::Previous,
            other => Command::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Command::PlayPause => KEYCODE_PLAY_PAUSE,
            Command::Next => KEYCODE_NEXT,
            Command::Previous => KEYCODE_PREVIOUS,
            Command::Unknown(code) => code,
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("connection closed before a command was received")]
    Empty,
    #[error("command token too long")]
    TooLong,
    #[error("not an integer keycode: {0:?}")]
    NotInteger(String),
}

/// Parse one keycode token (surrounding whitespace allowed).
pub fn parse_token(token: &str) -> Result<Command, CommandError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(CommandError::Empty);
    }
    token
        .parse::<i32>()
        .map(Command::from_code)
        .map_err(|_| CommandError::NotInteger(token.to_string()))
}

/// Accepts the action names used on the command line as well as raw codes.
impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "play-pause" | "playpause" | "toggle" => Ok(Command::PlayPause),
            "next" => Ok(Command::Next),
            "previous" | "prev" => Ok(Command::Previous),
            _ => parse_token(s),
        }
    }
}

/// Apply `cmd` to the session behind `handle`.
///
/// Absent or stale handles are a no-op. Play-pause issues `play` then `pause`
/// back to back; the transport collapses the pair into a single flip.
pub fn dispatch(cmd: Command, handle: Option<SessionHandle>) {
    let Some(session) = handle.as_ref().and_then(SessionHandle::upgrade) else {
        tracing::debug!("No active session, dropping {:?}", cmd);
        return;
    };

    match cmd {
        Command::PlayPause => {
            session.play();
            session.pause();
        }
        Command::Next => session.skip_to_next(),
        Command::Previous => session.skip_to_previous(),
        Command::Unknown(code) => {
            tracing::debug!("Ignoring unknown keycode {}", code);
            return;
        }
    }
    tracing::debug!("Dispatched {:?} to {}", cmd, session.id());
}
