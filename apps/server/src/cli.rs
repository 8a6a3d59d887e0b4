use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(version, about = "Keeps idle-suspending hosts awake with periodic wakeup requests")]
pub struct Cli {
    /// Path to the TOML config, defaults to ~/.config/keepalive/config.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Serve the HTTP API and run scheduled passes in-process (default)
    Serve,
    /// Run a single scheduled pass and exit, for an external scheduler
    Tick,
    /// Delete every key in the configured store
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_is_implied() {
        let cli = Cli::try_parse_from(["keepalive-server"]).unwrap();
        assert_eq!(cli.command, None);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_config_after_subcommand() {
        let cli = Cli::try_parse_from(["keepalive-server", "tick", "--config", "/tmp/k.toml"]).unwrap();
        assert_eq!(cli.command, Some(Command::Tick));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/k.toml")));
    }
}
