pub mod mock;
pub mod spotify;
pub mod spotify_auth;
pub mod tidal;
pub mod tidal_auth;

use crate::models::{Candidate, TrackPage};
use anyhow::Result;

/// Read-only access to the catalog playlists are imported from.
/// Implementations: spotify::SpotifySource, mock::MockSource.
#[async_trait::async_trait]
pub trait SourceCatalog: Send + Sync {
    /// Display name of the playlist.
    async fn playlist_name(&self, playlist_id: &str) -> Result<String>;

    /// First page of playlist items.
    async fn first_page(&self, playlist_id: &str) -> Result<TrackPage>;

    /// Page behind a cursor previously returned in `TrackPage::next`.
    async fn next_page(&self, cursor: &str) -> Result<TrackPage>;

    fn name(&self) -> &str;
}

/// The catalog playlists are created in.
/// Implementations: tidal::TidalDestination, mock::MockDestination.
#[async_trait::async_trait]
pub trait DestinationCatalog: Send + Sync {
    /// Free-text track search; candidates in the order the service ranks them.
    async fn search_tracks(&self, query: &str) -> Result<Vec<Candidate>>;

    /// Create a new playlist and return its remote id. Never reuses an existing one.
    async fn create_playlist(&self, name: &str, description: &str) -> Result<String>;

    /// Append a single track to the end of a playlist.
    async fn add_track(&self, playlist_id: &str, track_id: &str) -> Result<()>;

    /// Service name used in console output and miss reasons.
    fn name(&self) -> &str;
}
