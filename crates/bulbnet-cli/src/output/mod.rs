//! Output formatting for CLI results.

pub mod json;
pub mod table;

use std::net::Ipv4Addr;

pub use json::JsonOutput;
pub use table::TableOutput;

use bulbnet_core::discovery::DeviceEventKind;
use bulbnet_core::types::DeviceRecord;

/// Output formatter trait
pub trait OutputFormatter {
    /// Format device list
    fn format_devices(&self, devices: &[DeviceRecord]) -> String;

    /// Format a single discovered/lost event (watch mode)
    fn format_event(&self, kind: DeviceEventKind, device: &DeviceRecord) -> String;

    /// Format the broadcast targets and where they came from
    fn format_targets(&self, targets: &[Ipv4Addr], port: u16, source: &str) -> String;

    /// Format a generic message
    fn format_message(&self, message: &str) -> String;
}

/// Get the appropriate formatter based on JSON flag
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonOutput::new())
    } else {
        Box::new(TableOutput::new())
    }
}
