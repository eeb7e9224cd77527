//! Configuration: the `NetconfSocket <path>` directive file, CLI overrides,
//! and an environment variable fallback (§6).

use clap::Parser;
use log::{debug, warn};
use std::fs;
use std::path::Path;

pub const DEFAULT_SOCKET_PATH: &str = "/tmp/netconfd.sock";
const SOCKET_DIRECTIVE: &str = "NetconfSocket";

#[derive(Debug, Parser)]
#[command(name = "netconfd", version, about = "NETCONF session broker daemon")]
pub struct Cli {
    #[arg(short, long, help = "Path to the netconfd config file")]
    pub config: Option<String>,
    #[arg(long, help = "Overrides the listening socket path")]
    pub socket_path: Option<String>,
    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase log verbosity (-v, -vv)")]
    pub verbose: u8,
    #[arg(short, long, help = "Disable logging below warn level")]
    pub quiet: bool,
}

/// Resolution order: `--socket-path` > `NetconfSocket` directive in
/// `--config` > `NETCONFD_SOCKET` env var > [`DEFAULT_SOCKET_PATH`].
pub fn resolve_socket_path(cli: &Cli) -> String {
    if let Some(path) = &cli.socket_path {
        return path.clone();
    }
    if let Some(config_path) = &cli.config {
        if let Some(path) = read_directive(Path::new(config_path)) {
            return path;
        }
    }
    if let Ok(path) = std::env::var("NETCONFD_SOCKET") {
        return path;
    }
    DEFAULT_SOCKET_PATH.to_string()
}

/// Parses one `NetconfSocket <path>` directive out of a plain-text config
/// file: one directive per non-blank, non-`#`-comment line.
fn read_directive(path: &Path) -> Option<String> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            warn!("could not read config file '{}': {err}", path.display());
            return None;
        }
    };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, char::is_whitespace);
        let directive = parts.next().unwrap_or_default();
        if directive == SOCKET_DIRECTIVE {
            let value = parts.next().unwrap_or_default().trim();
            if !value.is_empty() {
                debug!("read socket path '{value}' from '{}'", path.display());
                return Some(value.to_string());
            }
        }
    }
    None
}

pub fn log_level(cli: &Cli) -> &'static str {
    if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
