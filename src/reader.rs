use crate::api::SourceCatalog;
use crate::models::TrackRecord;
use anyhow::Result;
use tracing::{debug, info};

/// Read every track of a source playlist, following the page cursor until the
/// source reports no further page. Removed tracks (null payloads) are dropped
/// without a trace in the result.
pub async fn fetch_playlist_tracks(
    source: &dyn SourceCatalog,
    playlist_id: &str,
) -> Result<Vec<TrackRecord>> {
    info!("Fetching tracks from {}...", source.name());
    let mut page = source.first_page(playlist_id).await?;
    let mut tracks = Vec::new();
    loop {
        for item in page.items {
            match item {
                Some(t) => {
                    info!("Found: {} - {}", t.title, t.all_artists);
                    tracks.push(t);
                }
                None => debug!("skipping removed track in playlist {}", playlist_id),
            }
        }
        match page.next {
            Some(cursor) => page = source.next_page(&cursor).await?,
            None => break,
        }
    }
    Ok(tracks)
}
