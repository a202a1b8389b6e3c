//! Targets command implementation.

use bulbnet_core::config::DiscoveryConfig;
use bulbnet_core::discovery::resolve_broadcast_targets;

use crate::error::Result;
use crate::output::get_formatter;

/// Print where probes would be sent with the current config.
pub fn run_targets(config: &DiscoveryConfig, json: bool) -> Result<()> {
    let formatter = get_formatter(json);

    let (targets, source) = match &config.broadcast_targets {
        Some(fixed) => (fixed.clone(), "config"),
        None => (resolve_broadcast_targets(), "interfaces"),
    };

    println!("{}", formatter.format_targets(&targets, config.device_port, source));
    Ok(())
}
