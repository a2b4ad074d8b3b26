use crate::api::DestinationCatalog;
use crate::error::ImportError;
use crate::matcher::match_track;
use crate::models::{MatchOutcome, MissReason, MissRecord, TrackRecord};
use crate::report;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

/// Outcome of importing one source playlist.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub playlist_name: String,
    pub playlist_id: String,
    pub total: usize,
    pub added: usize,
    pub misses: Vec<MissRecord>,
    /// Path of the missing-tracks CSV, if one was written.
    pub report_path: Option<PathBuf>,
}

impl ImportSummary {
    pub fn describe(&self) -> String {
        format!("Successfully added {} of {} tracks", self.added, self.total)
    }
}

/// Creates a destination playlist and fills it one track at a time.
pub struct PlaylistImporter<'a> {
    destination: &'a dyn DestinationCatalog,
    description: String,
    track_delay: Duration,
    report_dir: PathBuf,
}

impl<'a> PlaylistImporter<'a> {
    pub fn new(
        destination: &'a dyn DestinationCatalog,
        description: &str,
        report_dir: PathBuf,
    ) -> Self {
        Self {
            destination,
            description: description.to_string(),
            track_delay: Duration::from_secs(1),
            report_dir,
        }
    }

    pub fn with_track_delay(mut self, delay: Duration) -> Self {
        self.track_delay = delay;
        self
    }

    /// Import `tracks` into a new playlist called `playlist_name`.
    ///
    /// Fails only when the playlist itself cannot be created; in that case
    /// no track is searched and no report is written. Per-track failures end
    /// up in `ImportSummary::misses`, and a report write failure is logged
    /// without affecting the result.
    pub async fn import(
        &self,
        playlist_name: &str,
        tracks: &[TrackRecord],
    ) -> Result<ImportSummary, ImportError> {
        info!("Creating {} playlist: {}", self.destination.name(), playlist_name);
        let playlist_id = self
            .destination
            .create_playlist(playlist_name, &self.description)
            .await
            .map_err(|e| ImportError::PlaylistCreate {
                name: playlist_name.to_string(),
                message: format!("{:#}", e),
            })?;
        info!("Created playlist: {} ({})", playlist_name, playlist_id);

        let mut added = 0;
        let mut misses = Vec::new();
        for t in tracks {
            let query = t.search_query();
            info!("Searching: {}", query);
            let reason = match match_track(self.destination, t).await {
                MatchOutcome::Matched(c) => {
                    match self.destination.add_track(&playlist_id, &c.id).await {
                        Ok(()) => {
                            added += 1;
                            info!("  Added: {} by {}", t.title, t.artist);
                            None
                        }
                        Err(e) => Some(MissReason::Error(format!("{:#}", e))),
                    }
                }
                MatchOutcome::Miss(reason) => Some(reason),
            };
            if let Some(reason) = reason {
                match &reason {
                    MissReason::Error(msg) => warn!("  Error processing {}: {}", query, msg),
                    MissReason::NotFound { .. } => info!("  Not found: {}", query),
                    MissReason::NoExactMatch => info!("  No exact match found: {}", query),
                }
                misses.push(MissRecord::new(t, &reason));
            }
            // Uniform pacing, misses included.
            if !self.track_delay.is_zero() {
                tokio::time::sleep(self.track_delay).await;
            }
        }

        let report_path = match report::write_missing_tracks(&self.report_dir, &misses) {
            Ok(Some(p)) => {
                info!("Created CSV file with {} missing tracks: {}", misses.len(), p.display());
                Some(p)
            }
            Ok(None) => None,
            Err(e) => {
                error!("{}", e);
                None
            }
        };

        let summary = ImportSummary {
            playlist_name: playlist_name.to_string(),
            playlist_id,
            total: tracks.len(),
            added,
            misses,
            report_path,
        };
        info!("Import complete! {}", summary.describe());
        Ok(summary)
    }
}
