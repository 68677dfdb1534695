//! Docker Compose input
//!
//! This module reads compose files (versions 2 and 3) and normalizes them
//! into a [`ComposeFile`] for the converter.

pub mod config;
pub mod parser;

pub use config::{ComposeConfig, ComposeFile, ServiceConfig};
pub use parser::{ComposeParser, LoadOptions};
