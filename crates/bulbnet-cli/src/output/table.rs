//! Table-formatted output for CLI.

use std::net::Ipv4Addr;

use bulbnet_core::discovery::DeviceEventKind;
use bulbnet_core::types::DeviceRecord;
use chrono::{DateTime, Utc};
use colored::*;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use super::OutputFormatter;

pub struct TableOutput;

impl TableOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TableOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TableOutput {
    fn format_devices(&self, devices: &[DeviceRecord]) -> String {
        if devices.is_empty() {
            return "No devices found.".to_string();
        }

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Host", "Address", "Service", "Port", "Last Seen"]);

        for device in devices {
            table.add_row(vec![
                Cell::new(device.host()),
                Cell::new(device.identity()).fg(Color::Cyan),
                Cell::new(device.service_name()),
                Cell::new(device.port()),
                Cell::new(device.seen_at().format("%H:%M:%S")),
            ]);
        }

        format!("{}\n\nFound {} device(s)", table, devices.len())
    }

    fn format_event(&self, kind: DeviceEventKind, device: &DeviceRecord) -> String {
        describe_event(
            kind,
            &device.identity().to_string(),
            device.host(),
            device.seen_at(),
            Utc::now(),
        )
    }

    fn format_targets(&self, targets: &[Ipv4Addr], port: u16, source: &str) -> String {
        if targets.is_empty() {
            return "No broadcast targets.".to_string();
        }

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Broadcast Address", "Port"]);

        for target in targets {
            table.add_row(vec![Cell::new(target), Cell::new(port)]);
        }

        format!("{}\n\nFrom {}", table, source.bold())
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

/// Discoveries are stamped with the sighting; losses with the eviction time
/// plus when the device was last heard from.
fn describe_event(
    kind: DeviceEventKind,
    identity: &str,
    host: &str,
    seen_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> String {
    match kind {
        DeviceEventKind::Discovered => format!(
            "{} {} {} {}",
            seen_at.format("%H:%M:%S").to_string().dimmed(),
            "[+] discovered".green(),
            identity,
            host
        ),
        DeviceEventKind::Lost => format!(
            "{} {} {} {} (last seen {})",
            now.format("%H:%M:%S").to_string().dimmed(),
            "[-] lost      ".red(),
            identity,
            host,
            seen_at.format("%H:%M:%S")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_empty_devices() {
        assert_eq!(TableOutput::new().format_devices(&[]), "No devices found.");
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, h, m, s).unwrap()
    }

    #[test]
    fn test_lost_event_stamped_with_eviction_time() {
        let line = describe_event(
            DeviceEventKind::Lost,
            "D0:73:D5:00:00:01",
            "192.168.1.20",
            at(10, 0, 0),
            at(10, 5, 1),
        );

        assert!(line.contains("10:05:01"));
        assert!(line.contains("(last seen 10:00:00)"));
        assert!(line.contains("D0:73:D5:00:00:01 192.168.1.20"));
    }

    #[test]
    fn test_discovered_event_stamped_with_sighting() {
        let line = describe_event(
            DeviceEventKind::Discovered,
            "D0:73:D5:00:00:01",
            "192.168.1.20",
            at(10, 0, 0),
            at(10, 5, 1),
        );

        assert!(line.contains("10:00:00"));
        assert!(!line.contains("10:05:01"));
        assert!(!line.contains("last seen"));
    }

    #[test]
    fn test_targets_listed() {
        let out = TableOutput::new().format_targets(
            &[Ipv4Addr::new(10, 0, 0, 255), Ipv4Addr::new(192, 168, 1, 255)],
            56700,
            "interfaces",
        );
        assert!(out.contains("10.0.0.255"));
        assert!(out.contains("192.168.1.255"));
        assert!(out.contains("56700"));
    }
}
