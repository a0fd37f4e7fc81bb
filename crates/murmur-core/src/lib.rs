//! Core types and configuration for murmur.
//!
//! This crate provides platform-agnostic types that can be used across
//! all murmur sub-crates.

mod config;
mod segment;
mod state;

pub use config::{BACKEND_URL_ENV, Config, ConfigManager, DEFAULT_BACKEND_URL};
pub use segment::{Segment, Transcript};
pub use state::CaptureState;

/// Application name
pub const APP_NAME: &str = "murmur";

/// Pretty application name for display
pub const APP_NAME_PRETTY: &str = "Murmur";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";
