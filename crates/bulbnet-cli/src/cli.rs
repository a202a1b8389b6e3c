//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// bulbnet - discover lights on the local network
#[derive(Parser, Debug)]
#[command(name = "bulbnet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output (debug logging unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Discovery config file (JSON)
    #[arg(long, global = true, env = "BULBNET_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover devices on the network
    Discover(DiscoverArgs),

    /// Show the broadcast addresses probes are sent to
    Targets,

    /// Discovery configuration file
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Watch mode - report devices as they appear and disappear
    #[arg(short, long)]
    pub watch: bool,

    /// Discovery duration in seconds (ignored in watch mode)
    #[arg(short, long, default_value = "5")]
    pub duration: u64,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write the effective configuration to the config file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_defaults() {
        let cli = Cli::try_parse_from(["bulbnet", "discover"]).unwrap();
        match cli.command {
            Commands::Discover(args) => {
                assert!(!args.watch);
                assert_eq!(args.duration, 5);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(!cli.json);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "bulbnet",
            "discover",
            "--watch",
            "--json",
            "--config",
            "/tmp/bulbnet.json",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/bulbnet.json")));
        assert!(matches!(cli.command, Commands::Discover(DiscoverArgs { watch: true, .. })));
    }

    #[test]
    fn test_config_init_force() {
        let cli = Cli::try_parse_from(["bulbnet", "config", "init", "--force"]).unwrap();
        match cli.command {
            Commands::Config(ConfigArgs {
                command: ConfigCommands::Init(args),
            }) => assert!(args.force),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["bulbnet", "flash"]).is_err());
    }
}
