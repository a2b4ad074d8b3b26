use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::Deserialize;

/// Application-level Spotify token obtained through the client-credentials
/// grant. There is no refresh token; a new one is requested on expiry.
#[derive(Debug, Clone)]
pub struct StoredToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: i64, // epoch seconds
}

impl StoredToken {
    pub fn is_near_expiry(&self) -> bool {
        Utc::now().timestamp() + 30 >= self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: Option<String>,
    expires_in: Option<i64>,
}

/// Exchange client id/secret for an access token at `{auth_base}/api/token`.
pub async fn request_client_token(
    client: &Client,
    auth_base: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<StoredToken> {
    if client_id.is_empty() || client_secret.is_empty() {
        return Err(anyhow!("missing Spotify client_id or client_secret"));
    }
    let auth_header = format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{}:{}", client_id, client_secret))
    );
    let url = format!("{}/api/token", auth_base);
    let resp = client
        .post(&url)
        .header(AUTHORIZATION, auth_header)
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;
    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        return Err(anyhow!("token exchange failed: {} => {}", status, txt));
    }
    let tr: TokenResponse = resp.json().await?;
    Ok(StoredToken {
        access_token: tr.access_token,
        token_type: tr.token_type.unwrap_or_else(|| "Bearer".into()),
        expires_at: Utc::now().timestamp() + tr.expires_in.unwrap_or(3600),
    })
}
