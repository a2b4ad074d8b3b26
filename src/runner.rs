use crate::api::spotify::SpotifySource;
use crate::api::tidal::TidalDestination;
use crate::api::{DestinationCatalog, SourceCatalog};
use crate::config::Config;
use crate::error::ImportError;
use crate::importer::{ImportSummary, PlaylistImporter};
use crate::reader::fetch_playlist_tracks;
use crate::util::{destination_playlist_name, extract_playlist_id};
use tracing::{error, info, warn};

/// Per-batch tallies, for the closing log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Authenticate both services. Either failure aborts the whole run.
pub async fn connect_services(
    cfg: &Config,
) -> Result<(SpotifySource, TidalDestination), ImportError> {
    info!("Authenticating with Spotify...");
    let spotify = SpotifySource::new(
        cfg.spotify_client_id.clone(),
        cfg.spotify_client_secret.clone(),
    );
    spotify
        .authenticate()
        .await
        .map_err(|e| ImportError::authentication("Spotify", e))?;
    info!("Spotify authentication successful.");

    info!("Authenticating with Tidal...");
    let tidal = TidalDestination::new(cfg.tidal_client_id.clone(), cfg.tidal_client_secret.clone())
        .with_country_code(&cfg.country_code)
        .with_search_limit(cfg.search_limit);
    tidal
        .authenticate()
        .await
        .map_err(|e| ImportError::authentication("Tidal", e))?;
    info!("Tidal authentication successful.");

    Ok((spotify, tidal))
}

/// Drives one import per playlist URL, in order.
pub struct Runner<'a> {
    source: &'a dyn SourceCatalog,
    destination: &'a dyn DestinationCatalog,
    cfg: &'a Config,
}

impl<'a> Runner<'a> {
    pub fn new(
        source: &'a dyn SourceCatalog,
        destination: &'a dyn DestinationCatalog,
        cfg: &'a Config,
    ) -> Self {
        Self { source, destination, cfg }
    }

    /// Process every URL. A failing playlist is logged and the batch moves on.
    pub async fn run(&self, urls: &[String]) -> RunSummary {
        let mut summary = RunSummary::default();
        for url in urls {
            let Some(playlist_id) = extract_playlist_id(url) else {
                warn!("Invalid Spotify playlist URL: {}", url);
                summary.skipped += 1;
                continue;
            };
            info!("--- Processing playlist: {} ---", playlist_id);
            match self.import_playlist(&playlist_id).await {
                Ok(_) => summary.imported += 1,
                Err(e) => {
                    error!("Failed to import {}: {}", playlist_id, e);
                    summary.failed += 1;
                }
            }
        }
        info!(
            "Run finished: {} imported, {} skipped, {} failed",
            summary.imported, summary.skipped, summary.failed
        );
        summary
    }

    pub async fn import_playlist(&self, playlist_id: &str) -> Result<ImportSummary, ImportError> {
        let source_name = self
            .source
            .playlist_name(playlist_id)
            .await
            .map_err(|e| ImportError::fetch(playlist_id, e))?;
        let tracks = fetch_playlist_tracks(self.source, playlist_id)
            .await
            .map_err(|e| ImportError::fetch(playlist_id, e))?;
        let name = destination_playlist_name(&self.cfg.playlist_name_prefix, &source_name);
        let description = &self.cfg.playlist_description;
        PlaylistImporter::new(self.destination, description, self.cfg.report_dir.clone())
            .with_track_delay(self.cfg.track_delay())
            .import(&name, &tracks)
            .await
    }
}
