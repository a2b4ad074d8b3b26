const PLAYLIST_MARKER: &str = "spotify.com/playlist/";

/// Extract the Spotify playlist id from a playlist URL.
/// Returns None when the string is not a Spotify playlist link.
pub fn extract_playlist_id(playlist_url: &str) -> Option<String> {
    if !playlist_url.contains(PLAYLIST_MARKER) {
        return None;
    }
    let tail = playlist_url.rsplit("playlist/").next().unwrap_or("");
    let id = tail.split('?').next().unwrap_or("");
    if id.is_empty() {
        return None;
    }
    Some(id.to_string())
}

/// Name of the destination playlist for a source playlist.
pub fn destination_playlist_name(prefix: &str, source_name: &str) -> String {
    format!("{}{}", prefix, source_name)
}
