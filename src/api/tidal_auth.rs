use anyhow::{anyhow, Result};
use base64::Engine;
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

const SCOPE: &str = "r_usr w_usr w_sub";

#[derive(Clone, Debug)]
pub struct StoredToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: i64, // epoch seconds
    pub refresh_token: Option<String>,
    pub user_id: Option<i64>,
}

impl StoredToken {
    pub fn is_near_expiry(&self) -> bool {
        Utc::now().timestamp() + 30 >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.expires_at
    }
}

/// Pending device login: the user opens `verification_url` and approves
/// while we poll the token endpoint with `device_code`.
#[derive(Clone, Debug)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    pub expires_in: u64,
    pub interval: u64,
}

pub async fn start_device_authorization(
    client: &Client,
    auth_base: &str,
    client_id: &str,
) -> Result<DeviceAuthorization> {
    if client_id.is_empty() {
        return Err(anyhow!("missing Tidal client_id"));
    }
    let url = format!("{}/v1/oauth2/device_authorization", auth_base);
    let resp = client
        .post(&url)
        .form(&[("client_id", client_id), ("scope", SCOPE)])
        .send()
        .await?;
    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        return Err(anyhow!("device authorization failed: {} => {}", status, txt));
    }
    let j: serde_json::Value = resp.json().await?;
    let device_code = j["deviceCode"]
        .as_str()
        .ok_or_else(|| anyhow!("no deviceCode"))?
        .to_string();
    let user_code = j["userCode"].as_str().unwrap_or("").to_string();
    // verificationUriComplete comes back without a scheme, e.g. "link.tidal.com/ABCDE".
    let raw = j["verificationUriComplete"]
        .as_str()
        .or_else(|| j["verificationUri"].as_str())
        .ok_or_else(|| anyhow!("no verification uri"))?;
    let verification_url = if raw.starts_with("http") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    Ok(DeviceAuthorization {
        device_code,
        user_code,
        verification_url,
        expires_in: j["expiresIn"].as_u64().unwrap_or(300),
        interval: j["interval"].as_u64().unwrap_or(2),
    })
}

/// Poll until the user approves the device, the code expires, or the server
/// rejects the request.
pub async fn poll_device_token(
    client: &Client,
    auth_base: &str,
    client_id: &str,
    client_secret: &str,
    device: &DeviceAuthorization,
) -> Result<StoredToken> {
    let url = format!("{}/v1/oauth2/token", auth_base);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(device.expires_in);
    let mut interval = device.interval;
    loop {
        let mut params = vec![
            ("client_id", client_id),
            ("device_code", device.device_code.as_str()),
            ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
            ("scope", SCOPE),
        ];
        if !client_secret.is_empty() {
            params.push(("client_secret", client_secret));
        }
        let resp = client.post(&url).form(&params).send().await?;
        let status = resp.status();
        let j: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
        if status.is_success() {
            return token_from_response(&j, None);
        }
        match j["error"].as_str() {
            Some("authorization_pending") => {}
            Some("slow_down") => interval += 5,
            _ => {
                return Err(anyhow!(
                    "device token request failed: {} => {}",
                    status,
                    j["error_description"].as_str().or_else(|| j["error"].as_str()).unwrap_or("")
                ))
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(anyhow!("device authorization expired before it was approved"));
        }
        debug!("Tidal device authorization pending; polling again in {}s", interval);
        tokio::time::sleep(Duration::from_secs(interval)).await;
    }
}

/// Full interactive login: print the verification link and wait for approval.
pub async fn run_tidal_auth(
    client: &Client,
    auth_base: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<StoredToken> {
    let device = start_device_authorization(client, auth_base, client_id).await?;
    println!("\nPlease visit this URL to authorize Tidal:\n\n{}\n", device.verification_url);
    if !device.user_code.is_empty() {
        println!("Code: {}", device.user_code);
    }
    let token = poll_device_token(client, auth_base, client_id, client_secret, &device).await?;
    info!("Tidal device authorization approved");
    Ok(token)
}

pub async fn refresh_token(
    client: &Client,
    auth_base: &str,
    client_id: &str,
    client_secret: &str,
    cur: &mut StoredToken,
) -> Result<()> {
    let refresh_token = cur
        .refresh_token
        .clone()
        .ok_or_else(|| anyhow!("no refresh token"))?;
    let params = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token.as_str()),
        ("client_id", client_id),
        ("scope", SCOPE),
    ];
    let auth_header = format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", client_id, client_secret))
    );
    let url = format!("{}/v1/oauth2/token", auth_base);
    let resp = client
        .post(&url)
        .header(AUTHORIZATION, auth_header)
        .form(&params)
        .send()
        .await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow!("Failed to refresh tidal token: {} - {}", status, body));
    }
    let j: serde_json::Value = resp.json().await?;
    *cur = token_from_response(&j, Some(cur))?;
    Ok(())
}

/// Build a token from an OAuth token response. Fields the refresh response
/// omits (refresh token, user id) are carried over from `prev`.
fn token_from_response(j: &serde_json::Value, prev: Option<&StoredToken>) -> Result<StoredToken> {
    let access_token = j["access_token"]
        .as_str()
        .ok_or_else(|| anyhow!("no access_token"))?
        .to_string();
    let expires_in = j["expires_in"].as_i64().unwrap_or(3600);
    let refresh_token = j["refresh_token"]
        .as_str()
        .map(|s| s.to_string())
        .or_else(|| prev.and_then(|p| p.refresh_token.clone()));
    let user_id = j["user_id"]
        .as_i64()
        .or_else(|| j["user"]["userId"].as_i64())
        .or_else(|| prev.and_then(|p| p.user_id));
    Ok(StoredToken {
        access_token,
        token_type: j["token_type"].as_str().unwrap_or("Bearer").to_string(),
        expires_at: Utc::now().timestamp() + expires_in,
        refresh_token,
        user_id,
    })
}
