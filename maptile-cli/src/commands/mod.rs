//! CLI command implementations.
//!
//! Each submodule handles one command:
//! - `url`: Print the URL of a tile for a provider
//! - `coord`: Convert between coordinates, tiles and quadkeys
//! - `fetch`: Download every tile covering a viewport
//! - `search`: Resolve a place name to coordinates
//! - `config`: Inspect or create the configuration file

pub mod common;
pub mod config;
pub mod coord;
pub mod fetch;
pub mod search;
pub mod url;
