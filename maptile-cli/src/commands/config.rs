//! Configuration file commands.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use maptile::config::config_file_path;
use maptile::ManagerConfig;

use super::common::load_config;
use crate::error::CliError;

/// Config action subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the configuration file location
    Path,
    /// Print the effective configuration as INI
    Show,
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand against `path` or the default location.
pub fn run(action: ConfigAction, path: Option<&Path>) -> Result<(), CliError> {
    let path: PathBuf = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);

    match action {
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Show => {
            let config = load_config(Some(&path))?;
            print!("{}", config.to_ini_string());
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            ManagerConfig::default().save_to(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }
    Ok(())
}
