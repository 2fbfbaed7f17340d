//! Core domain types for multi-chain connection and balance tracking.
//!
//! This crate provides:
//! - Chain, account and balance types (`types` module)
//! - The user-facing error taxonomy (`error` module)
//! - The catalog of known chains (`registry` module)
//! - The `ChainClient` transport capability (`client` module)
//! - Display helpers for UI frontends (`display` module)
//!
//! With the `persistence` feature enabled:
//! - Configuration management (`config` module)

pub mod client;
pub mod display;
pub mod error;
pub mod registry;
pub mod types;

#[cfg(feature = "persistence")]
pub mod config;

pub use client::*;
pub use display::*;
pub use error::*;
pub use registry::*;
pub use types::*;

#[cfg(feature = "persistence")]
pub use config::{AppConfig, ConfigError};
