//! JSON-formatted output for CLI.

use std::net::Ipv4Addr;

use bulbnet_core::discovery::DeviceEventKind;
use bulbnet_core::types::DeviceRecord;
use serde::Serialize;
use serde_json::json;

use super::OutputFormatter;

pub struct JsonOutput;

impl JsonOutput {
    pub fn new() -> Self {
        Self
    }

    fn to_json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for JsonOutput {
    fn format_devices(&self, devices: &[DeviceRecord]) -> String {
        let output = json!({
            "devices": devices,
            "count": devices.len()
        });
        Self::to_json(&output)
    }

    /// One compact line per event (NDJSON).
    fn format_event(&self, kind: DeviceEventKind, device: &DeviceRecord) -> String {
        let output = json!({
            "event": kind.as_str(),
            "device": device
        });
        serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_targets(&self, targets: &[Ipv4Addr], port: u16, source: &str) -> String {
        Self::to_json(&json!({
            "targets": targets,
            "port": port,
            "source": source
        }))
    }

    fn format_message(&self, message: &str) -> String {
        Self::to_json(&json!({ "message": message }))
    }
}
