use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use mc2pc::cli::{self, CliCommand, DecodeArgs, SendArgs, ServeArgs};
use mc2pc::config::{self, SinkKind};
use mc2pc::reporter::StateReporter;
use mc2pc::server::CommandServer;
use mc2pc::session::discovery::StaticDiscovery;
use mc2pc::session::local::LocalPlayer;
use mc2pc::session::registry::SessionRegistry;
use mc2pc::session::PlaybackSession;
use mc2pc::sink::{SnapshotSink, StdoutSink, TracingSink};
use mc2pc::decode::Decoder;
use mc2pc::{client, lrc};

/// Set to true once the first Ctrl+C is received. Second Ctrl+C force-exits.
static SHUTTING_DOWN: AtomicBool = AtomicBool::new(false);

async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Ctrl+C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
    if SHUTTING_DOWN.swap(true, Ordering::SeqCst) {
        eprintln!("\nmc2pc: forced exit");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn main() {
    // stderr keeps stdout free for the stdout sink and `decode` output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();

    match args.command {
        CliCommand::Serve(serve) => run_serve(serve).await,
        CliCommand::Send(send) => run_send(send).await,
        CliCommand::Decode(decode) => run_decode(decode).await,
    }
}

async fn run_serve(args: ServeArgs) {
    let file_config = config::find_config_file(args.config.as_deref()).and_then(|path| {
        match config::load_config(&path) {
            Ok(cfg) => {
                tracing::debug!("Loaded config from {}", path.display());
                Some(cfg)
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file: {}", e);
                None
            }
        }
    });
    let config = config::Config::resolve(file_config, &args);

    if config.tracks.is_empty() {
        tracing::warn!("No tracks configured; the local player has nothing to report");
    }
    let player: Arc<dyn PlaybackSession> =
        Arc::new(LocalPlayer::new(config.player_name.clone(), config.tracks.clone()));
    // Owns the session for the lifetime of the process; everything else holds weak handles.
    let discovery = StaticDiscovery::new(vec![player]);

    let registry = Arc::new(SessionRegistry::new());
    let sink: Arc<dyn SnapshotSink> = match config.sink {
        SinkKind::Log => Arc::new(TracingSink),
        SinkKind::Stdout => Arc::new(StdoutSink::stdout()),
    };

    let mut reporter = StateReporter::new(Arc::clone(&registry), sink, config.heartbeat);
    reporter.attach(&discovery);

    let ip = if config.localhost {
        Ipv4Addr::LOCALHOST
    } else {
        Ipv4Addr::UNSPECIFIED
    };
    let listener = CommandServer::bind(SocketAddr::from((ip, config.port))).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(1);
    });

    tracing::info!(
        "mc2pc \"{}\" on port {} (heartbeat {} ms)",
        config.player_name,
        config.port,
        config.heartbeat.as_millis()
    );

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(4);

    let server = CommandServer::new(Arc::clone(&registry)).with_read_timeout(config.read_timeout);
    let server_rx = shutdown_tx.subscribe();
    let mut server_task = tokio::spawn(async move { server.serve(listener, server_rx).await });

    let reporter_rx = shutdown_tx.subscribe();
    let reporter_task = tokio::spawn(reporter.run(reporter_rx));

    tokio::select! {
        _ = wait_for_shutdown() => {
            tracing::info!("Shutting down...");
        }
        result = &mut server_task => {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    eprintln!("error: command channel stopped: {}", e);
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("error: command channel task failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    let _ = shutdown_tx.send(());
    let _ = tokio::time::timeout(Duration::from_secs(1), reporter_task).await;

    tracing::info!("Goodbye.");
    // A command client still mid-read keeps the server task alive; process exit ends it.
    drop(discovery);
}

async fn run_send(args: SendArgs) {
    let addr = format!("{}:{}", args.host, args.port);
    let timeout = Duration::from_millis(args.timeout_ms);
    if let Err(e) = client::send_command(&addr, args.command, timeout).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
    tracing::info!("Sent {:?} ({}) to {}", args.command, args.command.code(), addr);
}

fn read_file_or_exit(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("error: failed to read {}: {}", path.display(), e);
        std::process::exit(1);
    })
}

async fn run_decode(args: DecodeArgs) {
    let mut decoder = match &args.lyrics {
        Some(path) => {
            let original = read_file_or_exit(path);
            let translation = args.translation.as_deref().map(read_file_or_exit);
            let lines = lrc::parse_with_translation(&original, translation.as_deref());
            tracing::info!("Loaded {} lyric lines from {}", lines.len(), path.display());
            Decoder::with_lyrics(lines)
        }
        None => Decoder::new(),
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                eprintln!("error: failed to read stdin: {}", e);
                std::process::exit(1);
            }
        };
        if let Some(decoded) = decoder.feed(&line) {
            println!("{}", decoded);
        }
    }
}
