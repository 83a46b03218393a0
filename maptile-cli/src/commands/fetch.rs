//! Fetch every tile covering a viewport.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use maptile::provider::AsyncHttpClient;
use maptile::{ManagerConfig, MapEvent, MapTileManager, TileKey, TileStatus, Viewport};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

use super::common::{create_manager, resolve_provider, ProviderArgs};
use crate::error::CliError;

/// Arguments for `maptile fetch`.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Latitude of the view center
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude of the view center
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Zoom level
    #[arg(long)]
    pub zoom: u8,

    /// Viewport width in pixels
    #[arg(long, default_value = "800")]
    pub width: f64,

    /// Viewport height in pixels
    #[arg(long, default_value = "600")]
    pub height: f64,

    /// Directory to write tiles into as {z}_{x}_{y}.<ext>
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

/// Load the visible tiles for a view and optionally save them.
pub async fn run(args: FetchArgs, config: ManagerConfig) -> Result<(), CliError> {
    let config = resolve_provider(&args.provider, config)?
        .with_center(args.lat, args.lon)
        .with_zoom(args.zoom)
        .with_viewport(Viewport::new(0.0, 0.0, args.width, args.height));
    let manager = create_manager(config)?;

    let center = manager.center();
    println!(
        "Fetching {} tiles around {:.4}, {:.4} at zoom {}",
        manager.provider().map(|p| p.name()).unwrap_or("unconfigured"),
        center.latitude,
        center.longitude,
        manager.zoom()
    );

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉ "),
    );
    let outcome = fetch_view(&manager, &bar).await?;
    bar.finish_and_clear();

    println!(
        "{} {} loaded, {} failed",
        style("Done:").green().bold(),
        outcome.loaded(),
        outcome.failed()
    );
    for (key, status) in &outcome.results {
        if let TileStatus::Failed(error) = status {
            println!("  {} {}: {}", style("✗").red(), key, error);
        }
    }
    println!("{}", manager.stats());

    if let Some(dir) = &args.output {
        let written = write_tiles(dir, &outcome)?;
        println!("Wrote {} tiles to {}", written, dir.display());
    }

    println!("{}", style(manager.attribution()).dim());
    Ok(())
}

/// Statuses and image bytes gathered while loading one view.
struct FetchOutcome {
    results: Vec<(TileKey, TileStatus)>,
    images: HashMap<TileKey, Vec<u8>>,
}

impl FetchOutcome {
    fn loaded(&self) -> usize {
        self.results.iter().filter(|(_, s)| s.is_loaded()).count()
    }

    fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, s)| matches!(s, TileStatus::Failed(_)))
            .count()
    }

    fn collect(&mut self, event: MapEvent) {
        if let MapEvent::TileLoaded(record) = event {
            if let Some(data) = record.image_data {
                self.images.insert(record.key, data.to_vec());
            }
        }
    }
}

/// Load every tile in the manager's current view.
///
/// Image bytes are taken from `TileLoaded` events as tiles arrive, so a view
/// larger than the memory cache still yields every tile. The cache is also
/// grown to the visible count so tiles whose events were dropped can be
/// read back.
async fn fetch_view<C>(
    manager: &MapTileManager<C>,
    bar: &ProgressBar,
) -> Result<FetchOutcome, CliError>
where
    C: AsyncHttpClient + Clone + 'static,
{
    let visible = manager.visible_tile_count();
    if visible > manager.cache_capacity() as u64 {
        let capacity = usize::try_from(visible).unwrap_or(usize::MAX);
        manager
            .set_cache_size(capacity)
            .map_err(|e| CliError::Config(e.to_string()))?;
        debug!(capacity, "Grew tile cache to fit the view");
    }

    let mut events = manager.subscribe();
    let load = manager.load_visible_tiles()?;
    bar.set_length(load.started.len() as u64);

    let mut outcome = FetchOutcome {
        results: Vec::new(),
        images: HashMap::new(),
    };
    let wait = load.wait();
    tokio::pin!(wait);
    let mut listening = true;
    outcome.results = loop {
        tokio::select! {
            results = &mut wait => break results,
            event = events.recv(), if listening => match event {
                Ok(event @ MapEvent::TileLoaded(_)) => {
                    bar.inc(1);
                    outcome.collect(event);
                }
                Ok(MapEvent::TileFailed { record, error }) => {
                    bar.set_message(format!("{} failed: {}", record.key, error));
                    bar.inc(1);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => bar.inc(skipped),
                Err(RecvError::Closed) => listening = false,
            },
        }
    };

    // Events published just before the last load finished
    loop {
        match events.try_recv() {
            Ok(event) => outcome.collect(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }

    for (key, status) in &outcome.results {
        if status.is_loaded() && !outcome.images.contains_key(key) {
            if let Some(data) = manager
                .get_tile(key.x, key.y, key.zoom)
                .and_then(|record| record.image_data)
            {
                outcome.images.insert(*key, data.to_vec());
            }
        }
    }
    Ok(outcome)
}

fn write_tiles(dir: &Path, outcome: &FetchOutcome) -> Result<usize, CliError> {
    fs::create_dir_all(dir).map_err(|error| CliError::FileWrite {
        path: dir.display().to_string(),
        error,
    })?;

    let mut written = 0;
    for (key, _) in outcome.results.iter().filter(|(_, s)| s.is_loaded()) {
        let Some(data) = outcome.images.get(key) else {
            warn!(tile = %key, "Loaded tile has no image data to write");
            continue;
        };
        let path = dir.join(format!(
            "{}_{}_{}.{}",
            key.zoom,
            key.x,
            key.y,
            extension_for(data)
        ));
        fs::write(&path, data).map_err(|error| CliError::FileWrite {
            path: path.display().to_string(),
            error,
        })?;
        written += 1;
    }
    Ok(written)
}

/// File extension for the image format the bytes start with.
fn extension_for(data: &[u8]) -> &'static str {
    image::guess_format(data)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("bin")
}
