use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::command::Command;
use crate::config::SinkKind;
use crate::server::DEFAULT_PORT;

#[derive(Parser, Debug)]
#[command(
    name = "mc2pc",
    about = "Remote media keys and now-playing records over the local network",
    long_about = None,
    version = env!("GIT_VERSION"),
    arg_required_else_help = true,
)]
pub struct Args {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the command channel and state reporter for the local player
    Serve(ServeArgs),
    /// Send one media key to a running device
    Send(SendArgs),
    /// Decode state records from sink lines on stdin
    Decode(DecodeArgs),
}

#[derive(clap::Args, Debug, Default)]
pub struct ServeArgs {
    /// TCP port for the command channel [default: 51234]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to TOML config file (overrides default search: ./mc2pc.toml, ~/.config/mc2pc/config.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Bind to localhost only (127.0.0.1) instead of all interfaces
    #[arg(long)]
    pub localhost: bool,

    /// Snapshot heartbeat period in milliseconds (0 uses the default) [default: 1000]
    #[arg(long, value_name = "MS")]
    pub heartbeat_ms: Option<u64>,

    /// Drop command clients that send nothing for this long (0 disables) [default: disabled]
    #[arg(long, value_name = "MS")]
    pub read_timeout_ms: Option<u64>,

    /// Where to emit state records [default: log]
    #[arg(long, value_enum)]
    pub sink: Option<SinkKind>,
}

#[derive(clap::Args, Debug)]
pub struct SendArgs {
    /// play-pause, next, previous, or a raw keycode
    #[arg(allow_hyphen_values = true)]
    pub command: Command,

    /// Device address
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Device command port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Connect timeout in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 3000)]
    pub timeout_ms: u64,
}

#[derive(clap::Args, Debug, Default)]
pub struct DecodeArgs {
    /// LRC lyrics for the playing track; the current line is printed as it changes
    #[arg(long, value_name = "FILE")]
    pub lyrics: Option<PathBuf>,

    /// LRC translation merged into lines within 0.5 s of the original
    #[arg(long, value_name = "FILE", requires = "lyrics")]
    pub translation: Option<PathBuf>,
}
