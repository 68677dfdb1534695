//! `version` command

use super::Command;
use crate::error::Result;

/// Build name, set at compile time through `SLOPPOSE_BUILD`
pub const BUILD_NAME: &str = match option_env!("SLOPPOSE_BUILD") {
    Some(name) => name,
    None => "dev",
};

pub struct Version;

pub fn factory() -> Box<dyn Command> {
    Box::new(Version)
}

impl Version {
    pub fn text() -> String {
        format!("Version: v{}, Build: {}", env!("CARGO_PKG_VERSION"), BUILD_NAME)
    }
}

impl Command for Version {
    fn synopsis(&self) -> &'static str {
        "Prints the sloppose version"
    }

    fn help(&self) -> String {
        "Usage: sloppose version".to_string()
    }

    fn run(&self, _args: &[String]) -> Result<()> {
        println!("{}", Self::text());
        Ok(())
    }
}
