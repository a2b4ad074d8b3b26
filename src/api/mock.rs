use super::{DestinationCatalog, SourceCatalog};
use crate::models::{Candidate, TrackPage, TrackRecord};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::info;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct MockPlaylist {
    name: String,
    pages: Vec<Vec<Option<TrackRecord>>>,
}

/// In-memory source catalog used in tests. Each playlist is a list of pages;
/// cursors are `"<playlist_id>#<page index>"`.
#[derive(Default)]
pub struct MockSource {
    playlists: HashMap<String, MockPlaylist>,
    failing_pages: HashSet<(String, usize)>,
    page_requests: Mutex<usize>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_playlist(
        mut self,
        playlist_id: &str,
        name: &str,
        pages: Vec<Vec<Option<TrackRecord>>>,
    ) -> Self {
        self.playlists.insert(
            playlist_id.to_string(),
            MockPlaylist { name: name.to_string(), pages },
        );
        self
    }

    /// Make the page at `index` of `playlist_id` fail to load.
    pub fn with_page_failure(mut self, playlist_id: &str, index: usize) -> Self {
        self.failing_pages.insert((playlist_id.to_string(), index));
        self
    }

    /// Number of first/next page calls served so far.
    pub fn page_requests(&self) -> usize {
        *lock(&self.page_requests)
    }

    fn page(&self, playlist_id: &str, index: usize) -> Result<TrackPage> {
        *lock(&self.page_requests) += 1;
        let pl = self
            .playlists
            .get(playlist_id)
            .ok_or_else(|| anyhow!("playlist {} not found", playlist_id))?;
        if self.failing_pages.contains(&(playlist_id.to_string(), index)) {
            return Err(anyhow!("page {} of {} unavailable", index, playlist_id));
        }
        let items = pl.pages.get(index).cloned().unwrap_or_default();
        let next = if index + 1 < pl.pages.len() {
            Some(format!("{}#{}", playlist_id, index + 1))
        } else {
            None
        };
        Ok(TrackPage { items, next })
    }
}

#[async_trait]
impl SourceCatalog for MockSource {
    fn name(&self) -> &str {
        "mock-source"
    }

    async fn playlist_name(&self, playlist_id: &str) -> Result<String> {
        self.playlists
            .get(playlist_id)
            .map(|p| p.name.clone())
            .ok_or_else(|| anyhow!("playlist {} not found", playlist_id))
    }

    async fn first_page(&self, playlist_id: &str) -> Result<TrackPage> {
        self.page(playlist_id, 0)
    }

    async fn next_page(&self, cursor: &str) -> Result<TrackPage> {
        let (id, index) = cursor
            .rsplit_once('#')
            .ok_or_else(|| anyhow!("bad cursor {}", cursor))?;
        let index: usize = index.parse()?;
        self.page(id, index)
    }
}

/// In-memory destination catalog. Search results are keyed by the exact query
/// string; unknown queries return no candidates. Every call is recorded.
#[derive(Default)]
pub struct MockDestination {
    results: HashMap<String, Vec<Candidate>>,
    failing_queries: HashMap<String, String>,
    failing_creates: HashSet<String>,
    failing_adds: HashSet<String>,
    searches: Mutex<Vec<String>>,
    created: Mutex<Vec<(String, String)>>,
    added: Mutex<Vec<(String, String)>>,
}

impl MockDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, query: &str, candidates: Vec<Candidate>) -> Self {
        self.results.insert(query.to_string(), candidates);
        self
    }

    pub fn with_search_error(mut self, query: &str, message: &str) -> Self {
        self.failing_queries
            .insert(query.to_string(), message.to_string());
        self
    }

    /// Make `create_playlist` fail for this playlist name.
    pub fn with_create_failure(mut self, name: &str) -> Self {
        self.failing_creates.insert(name.to_string());
        self
    }

    pub fn with_add_failure(mut self, track_id: &str) -> Self {
        self.failing_adds.insert(track_id.to_string());
        self
    }

    pub fn searches(&self) -> Vec<String> {
        lock(&self.searches).clone()
    }

    /// (name, description) of every created playlist.
    pub fn created(&self) -> Vec<(String, String)> {
        lock(&self.created).clone()
    }

    /// (playlist id, track id) of every append.
    pub fn added(&self) -> Vec<(String, String)> {
        lock(&self.added).clone()
    }
}

#[async_trait]
impl DestinationCatalog for MockDestination {
    fn name(&self) -> &str {
        "Tidal"
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<Candidate>> {
        info!("MockDestination: search {}", query);
        lock(&self.searches).push(query.to_string());
        if let Some(msg) = self.failing_queries.get(query) {
            return Err(anyhow!("{}", msg));
        }
        Ok(self.results.get(query).cloned().unwrap_or_default())
    }

    async fn create_playlist(&self, name: &str, description: &str) -> Result<String> {
        info!("MockDestination: create_playlist {}", name);
        if self.failing_creates.contains(name) {
            return Err(anyhow!("create rejected for {}", name));
        }
        let mut created = lock(&self.created);
        created.push((name.to_string(), description.to_string()));
        Ok(format!("mock-playlist-{}", created.len()))
    }

    async fn add_track(&self, playlist_id: &str, track_id: &str) -> Result<()> {
        info!("MockDestination: add_track {} -> {}", playlist_id, track_id);
        if self.failing_adds.contains(track_id) {
            return Err(anyhow!("add rejected for {}", track_id));
        }
        lock(&self.added).push((playlist_id.to_string(), track_id.to_string()));
        Ok(())
    }
}
