//! Command implementations.

pub mod config;
pub mod discover;
pub mod targets;

pub use config::run_config;
pub use discover::run_discover;
pub use targets::run_targets;
