//! sloppose - docker-compose to sloppy.io converter
//!
//! Translates compose files (versions 2 and 3) into sloppy.io project files.
//! Besides mapping the schema, it discovers which apps talk to each other by
//! looking at connection strings inside environment variables and turns them
//! into sloppy dependencies:
//!
//! - Compose loading (version checks, interpolation, env files)
//! - Schema mapping to sloppy apps
//! - Dependency linking
//! - Deterministic YAML/JSON output

pub mod cli;
pub mod compose;
pub mod error;
pub mod sloppy;

pub use error::{Result, SlopposeError};
