use serde::{Deserialize, Serialize};
use std::fmt;

/// One track as read from the source playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub title: String,
    /// Primary (first listed) artist.
    pub artist: String,
    /// All artists in source order, joined with ", ".
    pub all_artists: String,
    pub album: String,
}

impl TrackRecord {
    /// Build a record from the source's ordered artist list.
    pub fn new(title: &str, artists: &[String], album: &str) -> Self {
        Self {
            title: title.to_string(),
            artist: artists.first().cloned().unwrap_or_default(),
            all_artists: artists.join(", "),
            album: album.to_string(),
        }
    }

    /// Free-text query sent to the destination catalog.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.title, self.artist)
    }
}

/// One page of source playlist items. `None` items are tracks the source
/// reports as removed or unavailable.
#[derive(Debug, Clone, Default)]
pub struct TrackPage {
    pub items: Vec<Option<TrackRecord>>,
    pub next: Option<String>,
}

/// A destination search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    NoExactMatch,
    NotFound { destination: String },
    Error(String),
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissReason::NoExactMatch => write!(f, "No exact match found"),
            MissReason::NotFound { destination } => write!(f, "Not found in {}", destination),
            MissReason::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}

/// A row of the missing-tracks report. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissRecord {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub reason: String,
}

impl MissRecord {
    pub fn new(track: &TrackRecord, reason: &MissReason) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.all_artists.clone(),
            album: track.album.clone(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched(Candidate),
    Miss(MissReason),
}
