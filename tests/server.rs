mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use common::{eventually, Call, RecordingSession};
use mc2pc::client::send_command;
use mc2pc::command::{Command, CommandError};
use mc2pc::server::{read_command, CommandServer, ConnectionError, ServerError};
use mc2pc::session::registry::SessionRegistry;

struct Running {
    addr: SocketAddr,
    registry: Arc<SessionRegistry>,
    shutdown_tx: broadcast::Sender<()>,
    task: tokio::task::JoinHandle<Result<(), ServerError>>,
}

fn start_server(read_timeout: Option<Duration>) -> Running {
    let registry = Arc::new(SessionRegistry::new());
    let listener = CommandServer::bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let server = CommandServer::new(Arc::clone(&registry)).with_read_timeout(read_timeout);
    let task = tokio::spawn(async move { server.serve(listener, shutdown_rx).await });
    Running {
        addr,
        registry,
        shutdown_tx,
        task,
    }
}

async fn send_raw(addr: SocketAddr, bytes: &[u8]) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(bytes).await.unwrap();
    stream.shutdown().await.unwrap();
}

// ── read_command ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn read_command_takes_first_token_only() {
    let mut input: &[u8] = b"  \n87 88 garbage";
    assert_eq!(read_command(&mut input).await.unwrap(), Command::Next);
}

#[tokio::test]
async fn read_command_accepts_token_at_end_of_stream() {
    let mut input: &[u8] = b"85";
    assert_eq!(read_command(&mut input).await.unwrap(), Command::PlayPause);
}

#[tokio::test]
async fn read_command_empty_stream_is_error() {
    let mut input: &[u8] = b"";
    assert!(matches!(
        read_command(&mut input).await,
        Err(ConnectionError::Command(CommandError::Empty))
    ));
}

#[tokio::test]
async fn read_command_rejects_oversized_token() {
    let long = "8".repeat(100);
    let mut input = long.as_bytes();
    assert!(matches!(
        read_command(&mut input).await,
        Err(ConnectionError::Command(CommandError::TooLong))
    ));
}

#[tokio::test]
async fn read_command_accepts_zero_padded_code() {
    let padded = format!("{:0>40}\n", 85);
    let mut input = padded.as_bytes();
    assert_eq!(read_command(&mut input).await.unwrap(), Command::PlayPause);

    let signed = format!("+{:0>60}", 87);
    let mut input = signed.as_bytes();
    assert_eq!(read_command(&mut input).await.unwrap(), Command::Next);
}

#[tokio::test]
async fn read_command_keeps_a_lone_zero() {
    let zeros = "0".repeat(50);
    let mut input = zeros.as_bytes();
    assert_eq!(read_command(&mut input).await.unwrap(), Command::Unknown(0));
}

// ── accept loop ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn play_pause_reaches_registered_session() {
    let server = start_server(None);
    let session = RecordingSession::new("player");
    server.registry.set_session(&session.as_dyn());

    send_raw(server.addr, b"85").await;

    assert!(eventually(|| session.calls() == vec![Call::Play, Call::Pause]).await);
}

#[tokio::test]
async fn server_closes_connection_without_reply() {
    use tokio::io::AsyncReadExt;

    let server = start_server(None);
    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(b"999\n").await.unwrap();

    let mut buf = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut buf)).await;
    assert!(read.is_ok(), "server did not close the connection");
    assert!(buf.is_empty());
}

#[tokio::test]
async fn unknown_code_makes_no_call() {
    let server = start_server(None);
    let session = RecordingSession::new("player");
    server.registry.set_session(&session.as_dyn());

    send_raw(server.addr, b"999").await;
    send_raw(server.addr, b"87").await;

    assert!(eventually(|| session.calls() == vec![Call::Next]).await);
}

#[tokio::test]
async fn no_session_does_not_stop_server() {
    let server = start_server(None);
    send_raw(server.addr, b"87").await;

    let session = RecordingSession::new("late");
    server.registry.set_session(&session.as_dyn());
    send_raw(server.addr, b"88").await;

    assert!(eventually(|| session.calls() == vec![Call::Previous]).await);
    assert!(!server.task.is_finished());
}

#[tokio::test]
async fn malformed_input_is_dropped_and_loop_continues() {
    let server = start_server(None);
    let session = RecordingSession::new("player");
    server.registry.set_session(&session.as_dyn());

    send_raw(server.addr, b"next\n").await;
    send_raw(server.addr, b"").await;
    send_raw(server.addr, b"\xff\xfe").await;
    send_raw(server.addr, b"87\n").await;

    assert!(eventually(|| session.calls() == vec![Call::Next]).await);
}

#[tokio::test]
async fn connections_are_served_one_at_a_time() {
    let server = start_server(None);
    let session = RecordingSession::new("player");
    server.registry.set_session(&session.as_dyn());

    // First client connects and stays silent; it now owns the accept loop.
    let mut first = TcpStream::connect(server.addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Second client's bytes sit in the backlog until the first is done.
    send_raw(server.addr, b"87").await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(session.calls().is_empty());

    first.write_all(b"88").await.unwrap();
    first.shutdown().await.unwrap();

    assert!(eventually(|| session.calls() == vec![Call::Previous, Call::Next]).await);
}

#[tokio::test]
async fn read_timeout_releases_silent_client() {
    let server = start_server(Some(Duration::from_millis(100)));
    let session = RecordingSession::new("player");
    server.registry.set_session(&session.as_dyn());

    let _silent = TcpStream::connect(server.addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    send_raw(server.addr, b"87").await;

    assert!(eventually(|| session.calls() == vec![Call::Next]).await);
}

#[tokio::test]
async fn client_send_command_round_trip() {
    let server = start_server(None);
    let session = RecordingSession::new("player");
    server.registry.set_session(&session.as_dyn());

    send_command(&server.addr.to_string(), Command::PlayPause, Duration::from_secs(2))
        .await
        .unwrap();

    assert!(eventually(|| session.calls() == vec![Call::Play, Call::Pause]).await);
}

#[tokio::test]
async fn shutdown_ends_accept_loop() {
    let server = start_server(None);
    server.shutdown_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(2), server.task)
        .await
        .expect("server did not stop");
    assert!(result.unwrap().is_ok());
}

#[tokio::test]
async fn bind_conflict_is_reported() {
    let holder = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = holder.local_addr().unwrap();
    assert!(matches!(
        CommandServer::bind(addr),
        Err(ServerError::Bind { .. })
    ));
}

#[tokio::test]
async fn start_binds_and_stops_on_shutdown() {
    let server = CommandServer::new(Arc::new(SessionRegistry::new()));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(async move { server.start(0, shutdown_rx).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("server did not stop");
    assert!(result.unwrap().is_ok());
}
