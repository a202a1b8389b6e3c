//! Discover command implementation.

use std::time::Duration;

use bulbnet_core::config::DiscoveryConfig;
use bulbnet_core::discovery::{DeviceEventKind, DiscoveryService};
use bulbnet_core::types::DeviceRecord;
use colored::*;
use tokio::sync::mpsc;

use crate::cli::DiscoverArgs;
use crate::error::{CliError, Result};
use crate::output::{get_formatter, OutputFormatter};

/// Run the discover command
pub async fn run_discover(args: DiscoverArgs, config: DiscoveryConfig, json: bool) -> Result<()> {
    let formatter = get_formatter(json);

    if args.watch {
        run_watch_mode(config, formatter.as_ref(), json).await
    } else {
        if args.duration == 0 {
            return Err(CliError::InvalidArgument(
                "duration must be at least 1 second".to_string(),
            ));
        }
        run_oneshot_mode(config, Duration::from_secs(args.duration), formatter.as_ref(), json).await
    }
}

async fn run_oneshot_mode(
    config: DiscoveryConfig,
    duration: Duration,
    formatter: &dyn OutputFormatter,
    json: bool,
) -> Result<()> {
    if !json {
        eprintln!("Discovering devices for {} seconds...", duration.as_secs());
    }

    let devices = DiscoveryService::discover_once(config, duration).await?;

    println!("{}", formatter.format_devices(&devices));

    if devices.is_empty() {
        return Err(CliError::NoDevicesFound);
    }

    Ok(())
}

async fn run_watch_mode(
    config: DiscoveryConfig,
    formatter: &dyn OutputFormatter,
    json: bool,
) -> Result<()> {
    let service = DiscoveryService::bind(config).await?;

    // Handlers run on the discovery tasks; forward events to this one for printing.
    let (tx, mut rx) = mpsc::unbounded_channel::<(DeviceEventKind, DeviceRecord)>();
    let discovered = tx.clone();
    service.on_device_discovered(move |record| {
        let _ = discovered.send((DeviceEventKind::Discovered, record.clone()));
    });
    service.on_device_lost(move |record| {
        let _ = tx.send((DeviceEventKind::Lost, record.clone()));
    });

    let session = service.start()?;
    if !json {
        eprintln!(
            "{} (session {}, press Ctrl+C to stop)\n",
            "Watching for devices".bold(),
            session
        );
    }

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some((kind, record)) => println!("{}", formatter.format_event(kind, &record)),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    service.shutdown().await;

    let devices = service.list().await;
    if !json {
        eprintln!();
        eprintln!("{}", formatter.format_message(&format!(
            "Stopped; {} device(s) currently known",
            devices.len()
        )));
    }

    Ok(())
}
