use thiserror::Error;

/// Failures surfaced by the import pipeline, from process-wide down to a
/// single report file. Per-track search failures never reach this type; they
/// become `MissReason::Error` rows instead.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("{service} authentication failed: {message}")]
    Authentication { service: String, message: String },
    #[error("failed to fetch playlist {playlist_id}: {message}")]
    Fetch { playlist_id: String, message: String },
    #[error("failed to create playlist {name}: {message}")]
    PlaylistCreate { name: String, message: String },
    #[error("failed to write report {path}: {message}")]
    ReportWrite { path: String, message: String },
}

impl ImportError {
    pub fn authentication(service: &str, err: anyhow::Error) -> Self {
        ImportError::Authentication {
            service: service.to_string(),
            message: format!("{:#}", err),
        }
    }

    pub fn fetch(playlist_id: &str, err: anyhow::Error) -> Self {
        ImportError::Fetch {
            playlist_id: playlist_id.to_string(),
            message: format!("{:#}", err),
        }
    }
}
