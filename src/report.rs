use crate::error::ImportError;
use crate::models::MissRecord;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

pub fn report_file_name(at: DateTime<Local>) -> String {
    format!("missing_tracks_{}.csv", at.format("%Y%m%d_%H%M%S"))
}

/// Write `misses` as CSV (`title,artist,album,reason`) into `dir`, named
/// after the current local time. Nothing is written for an empty list.
pub fn write_missing_tracks(
    dir: &Path,
    misses: &[MissRecord],
) -> Result<Option<PathBuf>, ImportError> {
    if misses.is_empty() {
        return Ok(None);
    }
    let path = dir.join(report_file_name(Local::now()));
    write_csv(&path, misses).map_err(|e| ImportError::ReportWrite {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(Some(path))
}

fn write_csv(path: &Path, misses: &[MissRecord]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    for m in misses {
        wtr.serialize(m)?;
    }
    wtr.flush()?;
    Ok(())
}
