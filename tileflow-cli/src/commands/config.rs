//! `tileflow config` subcommands.

use std::path::PathBuf;

use clap::Subcommand;
use tileflow::config::{config_file_path, ConfigFile};

use super::load_config;
use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Config file location (default: ~/.tileflow/config.ini)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show {
        /// Config file location (default: ~/.tileflow/config.ini)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Print the default configuration file path
    Path,
}

pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { path, force } => {
            let path = path.unwrap_or_else(config_file_path);
            let file = ConfigFile::init(&path, force)?;
            println!("Wrote {}", file.path().display());
        }
        ConfigCommands::Show { path } => {
            let file = load_config(path.as_deref())?;
            print!("{}", render(&file));
        }
        ConfigCommands::Path => println!("{}", config_file_path().display()),
    }
    Ok(())
}

fn render(file: &ConfigFile) -> String {
    let origin = if file.is_on_disk() {
        format!("# Loaded from {}\n", file.path().display())
    } else {
        format!("# {} not found, showing defaults\n", file.path().display())
    };
    origin + &file.render()
}
