use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub spotify_client_id: String,
    #[serde(default)]
    pub spotify_client_secret: String,
    #[serde(default)]
    pub tidal_client_id: String,
    #[serde(default)]
    pub tidal_client_secret: String,

    #[serde(default = "default_prefix")]
    pub playlist_name_prefix: String,
    #[serde(default = "default_description")]
    pub playlist_description: String,

    /// Pause after every track, matched or not.
    #[serde(default = "default_track_delay")]
    pub track_delay_ms: u64,
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Directory that receives missing_tracks_*.csv reports.
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
    /// Optional directory for a daily-rotated log file.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_prefix() -> String { "Imported: ".into() }
fn default_description() -> String { "Imported from Spotify".into() }
fn default_track_delay() -> u64 { 1000 }
fn default_search_limit() -> u32 { 10 }
fn default_country_code() -> String { "US".into() }
fn default_report_dir() -> PathBuf { ".".into() }

impl Default for Config {
    fn default() -> Self {
        Self {
            spotify_client_id: String::new(),
            spotify_client_secret: String::new(),
            tidal_client_id: String::new(),
            tidal_client_secret: String::new(),
            playlist_name_prefix: default_prefix(),
            playlist_description: default_description(),
            track_delay_ms: default_track_delay(),
            search_limit: default_search_limit(),
            country_code: default_country_code(),
            report_dir: default_report_dir(),
            log_dir: None,
        }
    }
}

impl Config {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        Ok(cfg)
    }

    /// Load `explicit` if given, otherwise the per-user config file when it
    /// exists, otherwise defaults. Empty credentials are then filled from the
    /// environment.
    pub fn resolve(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match explicit {
            Some(p) => Self::from_path(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_path(&p)?,
                _ => Self::default(),
            },
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn apply_env(&mut self) {
        fill_from_env(&mut self.spotify_client_id, "SPOTIFY_CLIENT_ID");
        fill_from_env(&mut self.spotify_client_secret, "SPOTIFY_CLIENT_SECRET");
        fill_from_env(&mut self.tidal_client_id, "TIDAL_CLIENT_ID");
        fill_from_env(&mut self.tidal_client_secret, "TIDAL_CLIENT_SECRET");
    }

    pub fn track_delay(&self) -> Duration {
        Duration::from_millis(self.track_delay_ms)
    }
}

fn fill_from_env(field: &mut String, var: &str) {
    if field.is_empty() {
        if let Ok(v) = std::env::var(var) {
            *field = v;
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("spotify-tidal-import").join("config.toml"))
}
