use crate::api::DestinationCatalog;
use crate::models::{Candidate, MatchOutcome, MissReason, TrackRecord};

/// First candidate whose name equals the track title and which lists the
/// primary artist, both compared case-insensitively. Search order decides
/// between several qualifying candidates.
pub fn select_match<'a>(
    track: &TrackRecord,
    candidates: &'a [Candidate],
) -> Option<&'a Candidate> {
    let title = track.title.to_lowercase();
    let artist = track.artist.to_lowercase();
    candidates.iter().find(|c| {
        c.name.to_lowercase() == title && c.artists.iter().any(|a| a.to_lowercase() == artist)
    })
}

/// Search the destination for `track` and classify the result. Search
/// failures are folded into the outcome rather than returned.
pub async fn match_track(
    destination: &dyn DestinationCatalog,
    track: &TrackRecord,
) -> MatchOutcome {
    let candidates = match destination.search_tracks(&track.search_query()).await {
        Ok(c) => c,
        Err(e) => return MatchOutcome::Miss(MissReason::Error(format!("{:#}", e))),
    };
    if candidates.is_empty() {
        return MatchOutcome::Miss(MissReason::NotFound {
            destination: destination.name().to_string(),
        });
    }
    match select_match(track, &candidates) {
        Some(c) => MatchOutcome::Matched(c.clone()),
        None => MatchOutcome::Miss(MissReason::NoExactMatch),
    }
}
