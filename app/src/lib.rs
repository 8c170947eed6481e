//! xrate Application
//!
//! Configuration, logging and wiring for the `xrate` binary.

pub mod app;
pub mod config;
pub mod telemetry;

pub use app::App;
pub use config::{AppConfig, ConfigError, LogFormat, ProviderEntry};
