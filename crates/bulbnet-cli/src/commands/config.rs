//! Config command implementation.

use std::path::{Path, PathBuf};

use bulbnet_core::config::{default_config_path, DiscoveryConfig};

use crate::cli::{ConfigArgs, ConfigCommands};
use crate::error::{CliError, Result};
use crate::output::get_formatter;

/// Run the config command
pub async fn run_config(
    args: ConfigArgs,
    config: &DiscoveryConfig,
    path: Option<&Path>,
    json: bool,
) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            println!("{}", format_config(config));
            Ok(())
        }
        ConfigCommands::Init(init) => {
            let path = resolve_path(path)?;
            write_config(config, &path, init.force).await?;
            println!(
                "{}",
                get_formatter(json).format_message(&format!("Wrote {}", path.display()))
            );
            Ok(())
        }
    }
}

fn format_config(config: &DiscoveryConfig) -> String {
    serde_json::to_string_pretty(config).unwrap_or_else(|_| "{}".to_string())
}

fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
    path.map(Path::to_path_buf)
        .or_else(default_config_path)
        .ok_or_else(|| {
            CliError::InvalidArgument("no config directory available; pass --config".to_string())
        })
}

/// Save `config` to `path`, refusing to replace an existing file unless forced.
async fn write_config(config: &DiscoveryConfig, path: &Path, force: bool) -> Result<()> {
    if !force && tokio::fs::try_exists(path).await? {
        return Err(CliError::InvalidArgument(format!(
            "{} already exists; use --force to overwrite",
            path.display()
        )));
    }

    config.save(path).await?;
    tracing::debug!(path = %path.display(), "config written");
    Ok(())
}
