use mockito::{Matcher, Server};
use serde_json::json;
use spotify_tidal_import::api::tidal::TidalDestination;
use spotify_tidal_import::api::tidal_auth::StoredToken;
use spotify_tidal_import::api::DestinationCatalog;
use spotify_tidal_import::matcher::match_track;
use spotify_tidal_import::models::{MatchOutcome, MissReason, TrackRecord};

fn session(base: &str) -> TidalDestination {
    let token = StoredToken {
        access_token: "valid".into(),
        token_type: "Bearer".into(),
        expires_at: chrono::Utc::now().timestamp() + 3600,
        refresh_token: None,
        user_id: Some(99),
    };
    TidalDestination::new("cid".into(), "csecret".into())
        .with_endpoints(base, base)
        .with_search_limit(5)
        .with_token(token)
}

#[test]
fn search_returns_candidates_in_order() {
    let mut server = Server::new();
    let base = server.url();
    let _m = server
        .mock("GET", "/search/tracks")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("query".into(), "Song Artist".into()),
            Matcher::UrlEncoded("limit".into(), "5".into()),
            Matcher::UrlEncoded("countryCode".into(), "US".into()),
        ]))
        .match_header("authorization", "Bearer valid")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [
                    { "id": 11, "title": "Song (Live)", "artists": [{ "name": "Artist" }] },
                    { "id": 12, "title": "song", "artists": [{ "name": "Guest" }, { "name": "ARTIST" }] }
                ]
            })
            .to_string(),
        )
        .create();

    let tidal = session(&base);
    let rt = tokio::runtime::Runtime::new().unwrap();
    let track = TrackRecord::new("Song", &["Artist".to_string()], "LP");
    let (cands, outcome) = rt.block_on(async {
        let cands = tidal.search_tracks("Song Artist").await.expect("search");
        let outcome = match_track(&tidal, &track).await;
        (cands, outcome)
    });
    assert_eq!(cands.len(), 2);
    assert_eq!(cands[0].id, "11");
    match outcome {
        MatchOutcome::Matched(c) => assert_eq!(c.id, "12"),
        other => panic!("expected match, got {:?}", other),
    }
}

#[test]
fn search_failure_is_an_error_miss() {
    let mut server = Server::new();
    let base = server.url();
    let _m = server
        .mock("GET", "/search/tracks")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body(r#"{"status":500}"#)
        .create();

    let tidal = session(&base);
    let rt = tokio::runtime::Runtime::new().unwrap();
    let track = TrackRecord::new("Song", &["Artist".to_string()], "LP");
    let outcome = rt.block_on(match_track(&tidal, &track));
    match outcome {
        MatchOutcome::Miss(MissReason::Error(msg)) => assert!(msg.contains("tidal search failed: 500")),
        other => panic!("expected error miss, got {:?}", other),
    }
}

#[test]
fn rate_limited_search_reports_retry_after() {
    let mut server = Server::new();
    let base = server.url();
    let _m = server
        .mock("GET", "/search/tracks")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_header("retry-after", "3")
        .create();

    let tidal = session(&base);
    let rt = tokio::runtime::Runtime::new().unwrap();
    let err = rt.block_on(tidal.search_tracks("x")).unwrap_err();
    assert!(err.to_string().contains("rate_limited"));
}

#[test]
fn create_playlist_posts_title_and_description() {
    let mut server = Server::new();
    let base = server.url();
    let m = server
        .mock("POST", "/users/99/playlists")
        .match_query(Matcher::Any)
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("title".into(), "Imported: Mix".into()),
            Matcher::UrlEncoded("description".into(), "Imported from Spotify".into()),
        ]))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({ "uuid": "pl-uuid", "title": "Imported: Mix" }).to_string())
        .create();

    let tidal = session(&base);
    let rt = tokio::runtime::Runtime::new().unwrap();
    let id = rt
        .block_on(tidal.create_playlist("Imported: Mix", "Imported from Spotify"))
        .expect("create");
    assert_eq!(id, "pl-uuid");
    m.assert();
}

#[test]
fn create_playlist_failure_is_an_error() {
    let mut server = Server::new();
    let base = server.url();
    let _m = server
        .mock("POST", "/users/99/playlists")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"userMessage":"expired"}"#)
        .create();

    let tidal = session(&base);
    let rt = tokio::runtime::Runtime::new().unwrap();
    let err = rt.block_on(tidal.create_playlist("P", "d")).unwrap_err();
    assert!(err.to_string().contains("tidal create playlist failed: 401"));
}

#[test]
fn add_track_sends_etag() {
    let mut server = Server::new();
    let base = server.url();
    let _m_get = server
        .mock("GET", "/playlists/pl-uuid")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("etag", "\"1700000000\"")
        .with_body(json!({ "uuid": "pl-uuid", "numberOfTracks": 4 }).to_string())
        .create();
    let m_add = server
        .mock("POST", "/playlists/pl-uuid/items")
        .match_query(Matcher::Any)
        .match_header("if-none-match", "\"1700000000\"")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("trackIds".into(), "12".into()),
            Matcher::UrlEncoded("toIndex".into(), "4".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "lastUpdated": 1700000001 }).to_string())
        .create();

    let tidal = session(&base);
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(tidal.add_track("pl-uuid", "12")).expect("add");
    m_add.assert();
}

#[test]
fn create_without_user_id_fails() {
    let tidal = TidalDestination::new("cid".into(), String::new())
        .with_endpoints("http://127.0.0.1:9", "http://127.0.0.1:9");
    let rt = tokio::runtime::Runtime::new().unwrap();
    let err = rt.block_on(tidal.create_playlist("P", "d")).unwrap_err();
    assert!(err.to_string().contains("no user_id"));
}

fn expired_session(base: &str, refresh: Option<&str>) -> TidalDestination {
    let token = StoredToken {
        access_token: "dead".into(),
        token_type: "Bearer".into(),
        expires_at: chrono::Utc::now().timestamp() - 60,
        refresh_token: refresh.map(|s| s.to_string()),
        user_id: Some(99),
    };
    TidalDestination::new("cid".into(), "csecret".into())
        .with_endpoints(base, base)
        .with_token(token)
}

#[test]
fn expired_token_without_refresh_fails_before_searching() {
    let mut server = Server::new();
    let base = server.url();
    let m_search = server
        .mock("GET", "/search/tracks")
        .match_query(Matcher::Any)
        .expect(0)
        .create();

    let tidal = expired_session(&base, None);
    let rt = tokio::runtime::Runtime::new().unwrap();
    let err = rt.block_on(tidal.search_tracks("Song Artist")).unwrap_err();
    assert!(err.to_string().contains("tidal token expired"));
    m_search.assert();
}

#[test]
fn expired_token_with_failed_refresh_fails() {
    let mut server = Server::new();
    let base = server.url();
    let _m_refresh = server
        .mock("POST", "/v1/oauth2/token")
        .with_status(400)
        .with_body(r#"{"error":"invalid_grant"}"#)
        .create();
    let m_search = server
        .mock("GET", "/search/tracks")
        .match_query(Matcher::Any)
        .expect(0)
        .create();

    let tidal = expired_session(&base, Some("stale-refresh"));
    let rt = tokio::runtime::Runtime::new().unwrap();
    let err = rt.block_on(tidal.search_tracks("Song Artist")).unwrap_err();
    assert!(err.to_string().contains("tidal token expired"));
    m_search.assert();
}

#[test]
fn expired_token_is_refreshed_before_searching() {
    let mut server = Server::new();
    let base = server.url();
    let _m_refresh = server
        .mock("POST", "/v1/oauth2/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "access_token": "renewed", "expires_in": 3600 }).to_string())
        .create();
    let m_search = server
        .mock("GET", "/search/tracks")
        .match_query(Matcher::Any)
        .match_header("authorization", "Bearer renewed")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "items": [] }).to_string())
        .create();

    let tidal = expired_session(&base, Some("good-refresh"));
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cands = rt.block_on(tidal.search_tracks("Song Artist")).expect("search");
    assert!(cands.is_empty());
    m_search.assert();
}
