use super::tidal_auth::{self, StoredToken};
use super::DestinationCatalog;
use crate::models::Candidate;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, ETAG, IF_NONE_MATCH};
use reqwest::Client;

/// Tidal catalog client for search and playlist writes. Base URLs default to
/// the production API and can be overridden with TIDAL_API_BASE /
/// TIDAL_AUTH_BASE or `with_endpoints` (mockito in tests).
pub struct TidalDestination {
    client: Client,
    client_id: String,
    client_secret: String,
    auth_base: String,
    api_base: String,
    country_code: String,
    search_limit: u32,
    token: tokio::sync::Mutex<Option<StoredToken>>,
}

impl TidalDestination {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client: Client::new(),
            client_id,
            client_secret,
            auth_base: Self::default_auth_base(),
            api_base: Self::default_api_base(),
            country_code: "US".into(),
            search_limit: 10,
            token: tokio::sync::Mutex::new(None),
        }
    }

    pub fn with_endpoints(mut self, auth_base: &str, api_base: &str) -> Self {
        self.auth_base = auth_base.trim_end_matches('/').to_string();
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_country_code(mut self, country_code: &str) -> Self {
        self.country_code = country_code.to_string();
        self
    }

    pub fn with_search_limit(mut self, limit: u32) -> Self {
        self.search_limit = limit;
        self
    }

    /// Seed the session with an already issued token, skipping the device login.
    pub fn with_token(self, token: StoredToken) -> Self {
        Self {
            token: tokio::sync::Mutex::new(Some(token)),
            ..self
        }
    }

    fn default_api_base() -> String {
        std::env::var("TIDAL_API_BASE").unwrap_or_else(|_| "https://api.tidal.com/v1".into())
    }

    fn default_auth_base() -> String {
        std::env::var("TIDAL_AUTH_BASE").unwrap_or_else(|_| "https://auth.tidal.com".into())
    }

    /// Interactive device login. Prints the verification link and blocks
    /// until the user approves it in a browser.
    pub async fn authenticate(&self) -> Result<()> {
        let st = tidal_auth::run_tidal_auth(
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

    /// Refresh a token that is close to expiry. A refresh failure is only a
    /// warning while the old token is still valid; once it has expired the
    /// request fails here instead of reaching the API with a dead token.
    async fn ensure_token(&self) -> Result<()> {
        let mut lock = self.token.lock().await;
        let Some(st) = &*lock else {
            return Ok(());
        };
        if !st.is_near_expiry() {
            return Ok(());
        }
        let expired = st.is_expired();
        let refreshed = match &st.refresh_token {
            Some(_) => {
                log::debug!("Tidal token near expiry, attempting refresh");
                let mut cur = st.clone();
                match tidal_auth::refresh_token(
                    &self.client,
                    &self.auth_base,
                    &self.client_id,
                    &self.client_secret,
                    &mut cur,
                )
                .await
                {
                    Ok(()) => Some(cur),
                    Err(e) => {
                        log::warn!("Tidal token refresh failed: {}", e);
                        None
                    }
                }
            }
            None => None,
        };
        match refreshed {
            Some(cur) => *lock = Some(cur),
            None if expired => {
                log::warn!("Tidal token expired and could not be refreshed");
                return Err(anyhow!("tidal token expired; log in again"));
            }
            None => {}
        }
        Ok(())
    }

    async fn get_bearer(&self) -> Result<String> {
        self.ensure_token().await?;
        let lock = self.token.lock().await;
        let st = lock
            .as_ref()
            .ok_or_else(|| anyhow!("no tidal token loaded"))?;
        Ok(format!("Bearer {}", st.access_token))
    }

    async fn user_id(&self) -> Result<i64> {
        let lock = self.token.lock().await;
        lock.as_ref()
            .and_then(|t| t.user_id)
            .ok_or_else(|| anyhow!("no user_id in tidal session"))
    }

    fn rate_limited(resp: &reqwest::Response) -> anyhow::Error {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        anyhow!("rate_limited: retry_after={:?}", retry_after)
    }

    /// Fetch the playlist's current ETag and track count; item writes must
    /// carry the ETag in If-None-Match.
    async fn playlist_etag(&self, playlist_id: &str) -> Result<(String, u64)> {
        let bearer = self.get_bearer().await?;
        let url = format!(
            "{}/playlists/{}?countryCode={}",
            self.api_base, playlist_id, self.country_code
        );
        let resp = self
            .client
            .get(&url)
            .header(AUTHORIZATION, &bearer)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("tidal get playlist failed: {} => {}", status, txt));
        }
        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("no ETag on playlist {}", playlist_id))?;
        let j: serde_json::Value = resp.json().await?;
        let count = j["numberOfTracks"].as_u64().unwrap_or(0);
        Ok((etag, count))
    }
}

/// Extract candidates from a track search response. Accepts both the
/// `/search/tracks` shape (`items`) and the combined `/search` shape
/// (`tracks.items`).
pub fn parse_candidates(j: &serde_json::Value) -> Vec<Candidate> {
    let items = j["items"]
        .as_array()
        .or_else(|| j["tracks"]["items"].as_array());
    let Some(items) = items else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let id = item["id"]
                .as_i64()
                .map(|n| n.to_string())
                .or_else(|| item["id"].as_str().map(|s| s.to_string()))?;
            let name = item["title"].as_str().unwrap_or("").to_string();
            let artists = item["artists"]
                .as_array()
                .map(|a| {
                    a.iter()
                        .filter_map(|ar| ar["name"].as_str())
                        .map(|s| s.to_string())
                        .collect()
                })
                .unwrap_or_default();
            Some(Candidate { id, name, artists })
        })
        .collect()
}

#[async_trait]
impl DestinationCatalog for TidalDestination {
    fn name(&self) -> &str {
        "Tidal"
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<Candidate>> {
        let bearer = self.get_bearer().await?;
        let url = format!(
            "{}/search/tracks?query={}&limit={}&countryCode={}",
            self.api_base,
            urlencoding::encode(query),
            self.search_limit,
            self.country_code
        );
        let resp = self
            .client
            .get(&url)
            .header(AUTHORIZATION, &bearer)
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Self::rate_limited(&resp));
        }
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("tidal search failed: {} => {}", status, txt));
        }
        let j: serde_json::Value = resp.json().await?;
        Ok(parse_candidates(&j))
    }

    async fn create_playlist(&self, name: &str, description: &str) -> Result<String> {
        let user_id = self.user_id().await?;
        let bearer = self.get_bearer().await?;
        let url = format!(
            "{}/users/{}/playlists?countryCode={}",
            self.api_base, user_id, self.country_code
        );
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, &bearer)
            .form(&[("title", name), ("description", description)])
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Self::rate_limited(&resp));
        }
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("tidal create playlist failed: {} => {}", status, txt));
        }
        let j: serde_json::Value = resp.json().await?;
        let id = j
            .get("uuid")
            .and_then(|v| v.as_str())
            .or_else(|| j.get("data").and_then(|d| d.get("uuid")).and_then(|v| v.as_str()))
            .ok_or_else(|| anyhow!("no playlist uuid in response"))?;
        Ok(id.to_string())
    }

    async fn add_track(&self, playlist_id: &str, track_id: &str) -> Result<()> {
        let (etag, count) = self.playlist_etag(playlist_id).await?;
        let bearer = self.get_bearer().await?;
        let url = format!(
            "{}/playlists/{}/items?countryCode={}",
            self.api_base, playlist_id, self.country_code
        );
        let to_index = count.to_string();
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, &bearer)
            .header(IF_NONE_MATCH, etag)
            .form(&[
                ("trackIds", track_id),
                ("onArtifactNotFound", "FAIL"),
                ("onDupes", "SKIP"),
                ("toIndex", to_index.as_str()),
            ])
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Self::rate_limited(&resp));
        }
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("tidal add track failed: {} => {}", status, txt));
        }
        Ok(())
    }
}
