use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::command::Command;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out connecting to {0}")]
    Timeout(String),
    #[error("failed to send command: {0}")]
    Write(#[from] std::io::Error),
}

/// Send one command to a device's command channel and close.
///
/// The protocol has no reply, so success only means the bytes were handed
/// to the peer.
pub async fn send_command(addr: &str, cmd: Command, timeout: Duration) -> Result<(), ClientError> {
    let mut stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| ClientError::Timeout(addr.to_string()))?
        .map_err(|source| ClientError::Connect {
            addr: addr.to_string(),
            source,
        })?;

    stream.write_all(format!("{}\n", cmd.code()).as_bytes()).await?;
    stream.shutdown().await?;
    tracing::debug!("Sent keycode {} to {}", cmd.code(), addr);
    Ok(())
}
