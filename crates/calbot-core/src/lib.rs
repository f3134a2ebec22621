//! # CalBot Core
//! Core traits, types, and configuration shared by the CalBot crates.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::CalBotConfig;
pub use error::{CalBotError, Result};
