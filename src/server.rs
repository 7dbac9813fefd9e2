use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use crate::command::{dispatch, parse_token, Command, CommandError};
use crate::session::registry::SessionRegistry;

pub const DEFAULT_PORT: u16 = 51234;

/// Longest token accepted, not counting redundant leading zeros; anything
/// longer cannot be a 32-bit keycode.
pub const MAX_TOKEN_LEN: usize = 32;

const LISTEN_BACKLOG: i32 = 16;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),
}

/// Per-connection failure. Logged and dropped; never affects the loop.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("no command within {0:?}")]
    TimedOut(Duration),
}

/// Command channel: a TCP listener that takes one keycode per connection.
///
/// Connections are served strictly one at a time. The accept loop reads the
/// token, dispatches it and drops the socket before accepting the next client,
/// so a client that never sends anything holds the channel until it closes or
/// the optional read timeout fires. Nothing is ever written back.
pub struct CommandServer {
    registry: Arc<SessionRegistry>,
    read_timeout: Option<Duration>,
}

impl CommandServer {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            read_timeout: None,
        }
    }

    /// Bound how long a single client may take to deliver its token.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Bind a listener with SO_REUSEADDR so a restarted server can take the
    /// port back while old connections sit in TIME_WAIT.
    pub fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
        let bind_err = |source: std::io::Error| ServerError::Bind { addr, source };

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(bind_err)?;
        socket.set_reuse_address(true).map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;
        socket.bind(&addr.into()).map_err(bind_err)?;
        socket.listen(LISTEN_BACKLOG).map_err(bind_err)?;

        let std_listener: std::net::TcpListener = socket.into();
        TcpListener::from_std(std_listener).map_err(bind_err)
    }

    /// Bind all IPv4 interfaces on `port` and serve until shutdown.
    pub async fn start(
        &self,
        port: u16,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let listener = Self::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))?;
        self.serve(listener, shutdown_rx).await
    }

    /// Accept loop. Returns `Ok` on shutdown and `Err` when accepting fails;
    /// the listener is not re-created.
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Command channel listening on {}", addr);
        }

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => accepted.map_err(ServerError::Accept)?,
                _ = shutdown_rx.recv() => {
                    tracing::debug!("Command channel: shutdown signal received");
                    return Ok(());
                }
            };
            self.handle_connection(stream, peer).await;
        }
    }

    async fn handle_connection(&self, mut stream: TcpStream, peer: SocketAddr) {
        let result = match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, read_command(&mut stream))
                .await
                .unwrap_or(Err(ConnectionError::TimedOut(limit))),
            None => read_command(&mut stream).await,
        };

        match result {
            Ok(cmd) => {
                tracing::debug!("{}: keycode {}", peer, cmd.code());
                dispatch(cmd, self.registry.get());
            }
            Err(e) => tracing::debug!("{}: {}", peer, e),
        }
        // stream dropped here: connection closed before the next accept
    }
}

/// Read one whitespace-delimited token and decode it.
///
/// Leading whitespace is skipped; the token ends at the next whitespace byte
/// or end of stream. Anything after the token is ignored. Leading zeros are
/// collapsed to one as they arrive, so zero-padded codes stay under the cap.
pub async fn read_command<R>(reader: &mut R) -> Result<Command, ConnectionError>
where
    R: AsyncRead + Unpin,
{
    let mut token = Vec::with_capacity(MAX_TOKEN_LEN);
    let mut buf = [0u8; 64];

    'read: loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        for &byte in &buf[..n] {
            if byte.is_ascii_whitespace() {
                if token.is_empty() {
                    continue;
                }
                break 'read;
            }
            let digits = match token.first() {
                Some(b'-' | b'+') => &token[1..],
                _ => &token[..],
            };
            if byte == b'0' && digits == b"0" {
                continue;
            }
            if token.len() == MAX_TOKEN_LEN {
                return Err(CommandError::TooLong.into());
            }
            token.push(byte);
        }
    }

    Ok(parse_token(&String::from_utf8_lossy(&token))?)
}
