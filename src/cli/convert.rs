//! `convert` command

use super::Command;
use crate::compose::{ComposeParser, LoadOptions};
use crate::error::{Result, SlopposeError};
use crate::sloppy::{self, SloppyWriter};
use clap::{CommandFactory as _, Parser};
use std::path::{Path, PathBuf};

/// Converts a docker-compose.yml to a sloppy.io compatible yml format
#[derive(Parser, Debug, Default)]
#[command(name = "sloppose convert", no_binary_name = true)]
pub struct ConvertArgs {
    /// Output path, defaults to <projectname>.yml in the working directory
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Project name, defaults to the working directory name
    #[arg(short = 'p', long = "projectname")]
    pub project_name: Option<String>,

    /// Compose files, defaults to docker-compose.yml
    pub files: Vec<PathBuf>,
}

pub struct Convert;

pub fn factory() -> Box<dyn Command> {
    Box::new(Convert)
}

impl Command for Convert {
    fn synopsis(&self) -> &'static str {
        "Converts a docker-compose.yml to a sloppy.io compatible yml format"
    }

    fn help(&self) -> String {
        ConvertArgs::command().render_help().to_string()
    }

    fn run(&self, args: &[String]) -> Result<()> {
        let args = match ConvertArgs::try_parse_from(args) {
            Ok(args) => args,
            Err(e) if e.kind() == clap::error::ErrorKind::DisplayHelp => {
                println!("{}", self.help());
                return Ok(());
            }
            Err(e) => return Err(SlopposeError::Usage(e.to_string())),
        };

        let working_dir = std::env::current_dir()?;
        let options = LoadOptions::from_env(args.project_name.clone(), working_dir);
        let written = execute(&args, &options)?;
        println!("Written {}", written.display());
        Ok(())
    }
}

/// Run the whole conversion. Nothing is written unless every step
/// succeeds.
pub fn execute(args: &ConvertArgs, options: &LoadOptions) -> Result<PathBuf> {
    let files = compose_files(&args.files, &options.working_dir)?;
    let documents = ComposeParser::read_files(&files)?;
    let compose = ComposeParser::load(&documents, options)?;
    let file = sloppy::convert(&compose)?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(file.project.to_lowercase()));
    SloppyWriter::write_file(&file, &options.working_dir.join(output))
}

fn compose_files(files: &[PathBuf], working_dir: &Path) -> Result<Vec<PathBuf>> {
    if files.is_empty() {
        let default = ComposeParser::find_compose_file(working_dir).ok_or_else(|| {
            SlopposeError::Input(format!(
                "no compose file found in {}",
                working_dir.display()
            ))
        })?;
        return Ok(vec![default]);
    }

    Ok(files.iter().map(|f| working_dir.join(f)).collect())
}
