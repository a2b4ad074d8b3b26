use anyhow::{Context, Result};
use clap::Parser;
use spotify_tidal_import as lib;
use lib::config::Config;
use lib::runner::{connect_services, Runner};
use std::path::{Path, PathBuf};
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "spotify-tidal-import",
    version,
    about = "Copy Spotify playlists into new Tidal playlists",
    after_help = "Example: spotify-tidal-import https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M"
)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Spotify playlist URLs to import, in order
    #[arg(required = true, num_args = 1.., value_name = "PLAYLIST_URL")]
    urls: Vec<String>,
}

fn open_log_file(dir: &Path) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("spotify-tidal-import.log")
        .build(dir)
        .with_context(|| format!("opening log dir {}", dir.display()))
}

/// Logs go to stdout and, when `log_dir` is set, to a daily-rotated file.
/// The returned guard must stay alive until exit so the file writer flushes.
fn init_logging(cfg: &Config) -> Result<Option<WorkerGuard>> {
    let _ = LogTracer::init();
    // Honor RUST_LOG if set, otherwise default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).with_writer(std::io::stdout);

    let (file_layer, guard) = match &cfg.log_dir {
        Some(dir) => {
            let file_appender = open_log_file(dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (Some(fmt::layer().with_ansi(false).with_writer(non_blocking)), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer);
    tracing_subscriber_global::set_global_default(subscriber)
        .context("failed to set global tracing subscriber")?;
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = Config::resolve(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(p) => format!("loading config from {}", p.display()),
        None => "loading default config".to_string(),
    })?;
    let _guard = init_logging(&cfg)?;

    let (spotify, tidal) = connect_services(&cfg).await?;
    let runner = Runner::new(&spotify, &tidal, &cfg);
    runner.run(&cli.urls).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unusable_log_dir_is_an_error() {
        let td = tempfile::tempdir().unwrap();
        let blocker = td.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let cfg = Config {
            log_dir: Some(blocker.join("logs")),
            ..Config::default()
        };
        let err = match init_logging(&cfg) {
            Ok(_) => panic!("log dir under a regular file should not open"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("opening log dir"));
    }

    #[test]
    fn log_file_opens_in_fresh_dir() {
        let td = tempfile::tempdir().unwrap();
        let dir = td.path().join("logs");
        open_log_file(&dir).expect("appender");
        assert!(dir.is_dir());
    }
}
