//! maptile CLI - Command-line interface
//!
//! Thin front end over the maptile library: tile URLs, coordinate math,
//! viewport fetches and place search.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use maptile::logging::{default_log_dir, init_logging, LoggingGuard, DEFAULT_LOG_FILE};

use commands::common::load_config;
use commands::config::ConfigAction;
use commands::coord::CoordAction;
use commands::fetch::FetchArgs;
use commands::search::SearchArgs;
use commands::url::UrlArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "maptile")]
#[command(version = maptile::VERSION)]
#[command(about = "Map tile URLs, coordinates, downloads and place search", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.config/maptile/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the URL of a tile
    Url(UrlArgs),
    /// Convert between coordinates, tiles and quadkeys
    Coord {
        #[command(subcommand)]
        action: CoordAction,
    },
    /// Download the tiles covering a viewport
    Fetch(FetchArgs),
    /// Look up a place name
    Search(SearchArgs),
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Url(args) => commands::url::run(args, load_config(config_path)?),
        Commands::Coord { action } => commands::coord::run(action),
        Commands::Fetch(args) => {
            let _guard = start_logging()?;
            commands::fetch::run(args, load_config(config_path)?).await
        }
        Commands::Search(args) => {
            let _guard = start_logging()?;
            commands::search::run(args, load_config(config_path)?).await
        }
        Commands::Config { action } => commands::config::run(action, config_path),
    }
}

/// Logging is only set up for commands that touch the network.
fn start_logging() -> Result<LoggingGuard, CliError> {
    let log_dir = default_log_dir();
    let guard = init_logging(&log_dir, DEFAULT_LOG_FILE)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;
    tracing::debug!(log_dir = %log_dir.display(), "Logging initialized");
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use commands::common::ProviderType;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_url_with_provider() {
        let cli = parse(&["maptile", "url", "301", "384", "10", "--provider", "bing"]);
        match cli.command {
            Commands::Url(args) => {
                assert_eq!((args.x, args.y, args.zoom), (301, 384, 10));
                assert_eq!(args.provider.provider, Some(ProviderType::Bing));
            }
            _ => panic!("expected url command"),
        }
    }

    #[test]
    fn test_coord_accepts_negative_values() {
        let cli = parse(&["maptile", "coord", "to-tile", "40.7128", "-74.0060", "10"]);
        match cli.command {
            Commands::Coord {
                action: CoordAction::ToTile { lat, lon, zoom },
            } => {
                assert_eq!(lat, 40.7128);
                assert_eq!(lon, -74.0060);
                assert_eq!(zoom, 10);
            }
            _ => panic!("expected coord to-tile"),
        }
    }

    #[test]
    fn test_fetch_defaults_and_global_config() {
        let cli = parse(&[
            "maptile", "fetch", "--lat", "-33.86", "--lon", "151.2", "--zoom", "12", "--config",
            "/tmp/m.ini",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/m.ini")));
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.lat, -33.86);
                assert_eq!((args.width, args.height), (800.0, 600.0));
                assert!(args.output.is_none());
            }
            _ => panic!("expected fetch command"),
        }
    }

    #[test]
    fn test_search_joins_words() {
        let cli = parse(&["maptile", "search", "Eiffel", "Tower", "--json"]);
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.query.join(" "), "Eiffel Tower");
                assert!(args.json);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn test_search_requires_query() {
        assert!(Cli::try_parse_from(["maptile", "search"]).is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!(Cli::try_parse_from(["maptile", "url", "0", "0", "0", "--provider", "here"]).is_err());
    }
}
