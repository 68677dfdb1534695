//! sloppy.io project files
//!
//! Mapping from compose services to sloppy apps, dependency linking and
//! output.

pub mod file;
pub mod linker;
pub mod mapper;
pub mod writer;

pub use file::{App, SloppyFile};
pub use linker::LinkTable;
pub use mapper::SchemaMapper;
pub use writer::{OutputFormat, SloppyWriter};

use crate::compose::ComposeFile;
use crate::error::Result;

/// Convert a loaded compose project into a resolved sloppy project file
pub fn convert(compose: &ComposeFile) -> Result<SloppyFile> {
    let mut file = SchemaMapper::map_file(compose)?;
    linker::resolve(compose, &mut file)?;
    Ok(file)
}
