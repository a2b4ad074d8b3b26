use std::fs::File;
use std::io::Write;
use tempfile::tempdir;

use spotify_tidal_import::config::Config;

#[test]
fn config_from_path_parses_toml_with_defaults() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("cfg.toml");
    let mut f = File::create(&cfg_path).unwrap();
    let toml = r#"
spotify_client_id = "sid"
spotify_client_secret = "ssecret"
report_dir = "/tmp/reports"
"#;
    f.write_all(toml.as_bytes()).unwrap();
    let cfg = Config::from_path(&cfg_path).expect("parse config");
    assert_eq!(cfg.spotify_client_id, "sid");
    assert_eq!(cfg.report_dir.to_str().unwrap(), "/tmp/reports");
    assert_eq!(cfg.playlist_name_prefix, "Imported: ");
    assert_eq!(cfg.playlist_description, "Imported from Spotify");
    assert_eq!(cfg.track_delay_ms, 1000);
    assert_eq!(cfg.track_delay(), std::time::Duration::from_secs(1));
    assert_eq!(cfg.country_code, "US");
    assert!(cfg.log_dir.is_none());
}

#[test]
fn explicit_values_override_defaults() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("cfg.toml");
    std::fs::write(
        &cfg_path,
        r#"
playlist_name_prefix = "From Spotify - "
track_delay_ms = 250
log_dir = "/tmp/logs"
"#,
    )
    .unwrap();
    let cfg = Config::resolve(Some(&cfg_path)).expect("resolve");
    assert_eq!(cfg.playlist_name_prefix, "From Spotify - ");
    assert_eq!(cfg.track_delay_ms, 250);
    assert_eq!(cfg.log_dir.as_deref(), Some(std::path::Path::new("/tmp/logs")));
}

#[test]
fn missing_explicit_config_is_an_error() {
    let td = tempdir().unwrap();
    assert!(Config::resolve(Some(&td.path().join("nope.toml"))).is_err());
}

#[test]
fn malformed_config_is_an_error() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("cfg.toml");
    std::fs::write(&cfg_path, "track_delay_ms = \"soon\"").unwrap();
    assert!(Config::from_path(&cfg_path).is_err());
}
