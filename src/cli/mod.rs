//! Command line commands
//!
//! Commands live in a [`CommandRegistry`] built once at startup and handed
//! to the dispatcher in `main`.

pub mod convert;
pub mod version;

use crate::error::Result;
use std::collections::BTreeMap;

/// A runnable sub command
pub trait Command {
    /// One line description for the usage listing
    fn synopsis(&self) -> &'static str;

    /// Full help text
    fn help(&self) -> String;

    /// Run with the arguments following the command name
    fn run(&self, args: &[String]) -> Result<()>;
}

/// Creates a command instance
pub type CommandFactory = fn() -> Box<dyn Command>;

/// Command name to factory
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, CommandFactory>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with all built-in commands
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("convert", convert::factory);
        registry.register("version", version::factory);
        registry
    }

    pub fn register(&mut self, name: &'static str, factory: CommandFactory) {
        self.commands.insert(name, factory);
    }

    /// Instantiate the command registered under `name`
    pub fn get(&self, name: &str) -> Option<Box<dyn Command>> {
        self.commands.get(name).map(|factory| factory())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }

    /// Usage text listing every command
    pub fn usage(&self) -> String {
        let mut out = String::from("Usage: sloppose [--debug] <command> [args]\n\nAvailable commands:\n");
        for (name, factory) in &self.commands {
            out.push_str(&format!("  {:<12}{}\n", name, factory().synopsis()));
        }
        out
    }
}
