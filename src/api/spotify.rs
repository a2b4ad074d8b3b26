use super::spotify_auth::{request_client_token, StoredToken};
use super::SourceCatalog;
use crate::models::{TrackPage, TrackRecord};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use std::env;

/// Read-only Spotify catalog client using the client-credentials grant.
/// Endpoints may be overridden by SPOTIFY_AUTH_BASE and SPOTIFY_API_BASE env vars
/// or `with_endpoints` (useful for tests).
pub struct SpotifySource {
    client: Client,
    client_id: String,
    client_secret: String,
    auth_base: String,
    api_base: String,
    token: tokio::sync::Mutex<Option<StoredToken>>,
}

impl SpotifySource {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client: Client::new(),
            client_id,
            client_secret,
            auth_base: Self::default_auth_base(),
            api_base: Self::default_api_base(),
            token: tokio::sync::Mutex::new(None),
        }
    }

    pub fn with_endpoints(mut self, auth_base: &str, api_base: &str) -> Self {
        self.auth_base = auth_base.trim_end_matches('/').to_string();
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn default_auth_base() -> String {
        env::var("SPOTIFY_AUTH_BASE").unwrap_or_else(|_| "https://accounts.spotify.com".into())
    }
    fn default_api_base() -> String {
        // include v1 path by default
        env::var("SPOTIFY_API_BASE").unwrap_or_else(|_| "https://api.spotify.com/v1".into())
    }

    /// Perform the credential exchange up front so bad credentials fail the
    /// run before any playlist is touched.
    pub async fn authenticate(&self) -> Result<()> {
        let st = request_client_token(
            &self.client,
            &self.auth_base,
            &self.client_id,
            &self.client_secret,
        )
        .await?;
        let mut lock = self.token.lock().await;
        *lock = Some(st);
        Ok(())
    }

    async fn ensure_token(&self) -> Result<()> {
        let mut lock = self.token.lock().await;
        let stale = match &*lock {
            Some(st) => st.is_near_expiry(),
            None => true,
        };
        if stale {
            debug!("Spotify token missing or near expiry, requesting a new one");
            let st = request_client_token(
                &self.client,
                &self.auth_base,
                &self.client_id,
                &self.client_secret,
            )
            .await?;
            *lock = Some(st);
        }
        Ok(())
    }

    async fn get_bearer(&self) -> Result<String> {
        self.ensure_token().await?;
        let lock = self.token.lock().await;
        let st = lock.as_ref().ok_or_else(|| anyhow!("no token loaded"))?;
        Ok(format!("Bearer {}", st.access_token))
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let bearer = self.get_bearer().await?;
        let resp = self
            .client
            .get(url)
            .header(AUTHORIZATION, &bearer)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("spotify request failed: {} => {}", status, txt));
        }
        Ok(resp.json().await?)
    }

    fn next_url(&self, cursor: &str) -> String {
        // Spotify hands back absolute URLs; accept relative ones for completeness.
        if cursor.starts_with("http") {
            cursor.to_string()
        } else {
            format!("{}{}", self.api_base, cursor)
        }
    }
}

/// Turn a `/playlists/{id}/tracks` response body into a page. Items whose
/// `track` is null become `None`.
pub fn parse_track_page(j: &serde_json::Value) -> TrackPage {
    let mut items = Vec::new();
    if let Some(arr) = j["items"].as_array() {
        for it in arr {
            let track = &it["track"];
            if track.is_null() {
                items.push(None);
                continue;
            }
            let title = track["name"].as_str().unwrap_or("");
            let artists: Vec<String> = track["artists"]
                .as_array()
                .map(|a| {
                    a.iter()
                        .filter_map(|ar| ar["name"].as_str())
                        .map(|s| s.to_string())
                        .collect()
                })
                .unwrap_or_default();
            let album = track["album"]["name"].as_str().unwrap_or("");
            items.push(Some(TrackRecord::new(title, &artists, album)));
        }
    }
    TrackPage {
        items,
        next: j["next"].as_str().map(|s| s.to_string()),
    }
}

#[async_trait]
impl SourceCatalog for SpotifySource {
    fn name(&self) -> &str {
        "Spotify"
    }

    async fn playlist_name(&self, playlist_id: &str) -> Result<String> {
        let url = format!("{}/playlists/{}?fields=name", self.api_base, playlist_id);
        let j = self.get_json(&url).await?;
        j["name"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("no name in playlist {}", playlist_id))
    }

    async fn first_page(&self, playlist_id: &str) -> Result<TrackPage> {
        let url = format!(
            "{}/playlists/{}/tracks?limit=100&additional_types=track",
            self.api_base, playlist_id
        );
        let j = self.get_json(&url).await?;
        Ok(parse_track_page(&j))
    }

    async fn next_page(&self, cursor: &str) -> Result<TrackPage> {
        let j = self.get_json(&self.next_url(cursor)).await?;
        Ok(parse_track_page(&j))
    }
}
