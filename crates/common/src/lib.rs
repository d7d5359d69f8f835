//! Shared configuration and platform helpers for the Gemini web client
//!
//! This crate holds the option surface recognized by the client library and
//! the platform-specific paths where that configuration is discovered.

pub mod config;
pub mod platform;

pub use config::{Config, ConfigError};
