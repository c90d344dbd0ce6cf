use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser, Debug)]
#[command(name = "wapair", about = "Pair WhatsApp gateway sessions")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List configured gateway hosts
    Hosts,
    /// Create a connection and wait for its QR code to be scanned
    Connect(commands::connect::ConnectArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Hosts => commands::hosts::run(),
        Commands::Connect(args) => commands::connect::run(args).await,
        Commands::Config(args) => commands::config::run(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_hosts() {
        let cli = Cli::parse_from(["wapair", "hosts"]);
        assert!(matches!(cli.command, Commands::Hosts));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_connect_with_index_and_qr_out() {
        let cli = Cli::parse_from([
            "wapair",
            "-v",
            "connect",
            "--name",
            "shop1",
            "--host-index",
            "1",
            "--qr-out",
            "qr.png",
        ]);

        assert!(cli.verbose);
        let Commands::Connect(args) = cli.command else {
            panic!("expected connect command");
        };
        assert_eq!(args.name, "shop1");
        assert_eq!(args.host_index, Some(1));
        assert!(args.host.is_none());
        assert_eq!(args.qr_out, Some(PathBuf::from("qr.png")));
    }

    #[test]
    fn test_connect_requires_name() {
        assert!(Cli::try_parse_from(["wapair", "connect"]).is_err());
    }

    #[test]
    fn test_connect_host_conflicts_with_index() {
        let result = Cli::try_parse_from([
            "wapair",
            "connect",
            "--name",
            "shop1",
            "--host",
            "http://h1",
            "--host-index",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_config_show() {
        let cli = Cli::parse_from(["wapair", "config", "show"]);
        assert!(matches!(
            cli.command,
            Commands::Config(commands::config::ConfigArgs {
                command: commands::config::ConfigCommands::Show
            })
        ));
    }
}
