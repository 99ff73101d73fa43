//! Integration tests for the HTTP platform client, against a mock server.

use std::path::Path;

use reel_reposter::config::Config;
use reel_reposter::content::MediaKind;
use reel_reposter::platform::{
    ContentSource, Credentials, HttpPlatformClient, LoginOutcome, MediaFetcher, PlatformError,
    Publisher, SessionCache, SessionState,
};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server_uri: &str, dir: &Path) -> Config {
    Config {
        api_base_url: server_uri.to_string(),
        download_dir: dir.join("downloads"),
        session_path: dir.join("session.json"),
        credentials_path: dir.join("credentials.json"),
        ..Config::for_testing()
    }
}

fn creds() -> Credentials {
    Credentials {
        username: "poster".to_string(),
        password: "hunter2".to_string(),
    }
}

fn login_ok(token: &str) -> Mock {
    Mock::given(method("POST"))
        .and(path("/api/v1/session"))
        .and(body_string_contains("poster"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": token,
        })))
}

#[tokio::test]
async fn test_fresh_login_caches_session() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    login_ok("tok-1").mount(&server).await;

    let config = test_config(&server.uri(), temp_dir.path());
    let cache = SessionCache::new(&config.session_path);
    let mut client = HttpPlatformClient::new(&config).unwrap();

    let outcome = client.login(&creds(), &cache).await.unwrap();
    assert_eq!(outcome, LoginOutcome::Fresh);

    let cached = cache.load().await.expect("session cached after login");
    assert_eq!(cached.username, "poster");
    assert_eq!(cached.token, "tok-1");
}

#[tokio::test]
async fn test_cached_session_resumed() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/session"))
        .and(header("authorization", "Bearer tok-cached"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), temp_dir.path());
    let cache = SessionCache::new(&config.session_path);
    cache
        .store(&SessionState {
            username: "poster".to_string(),
            token: "tok-cached".to_string(),
        })
        .await
        .unwrap();

    let mut client = HttpPlatformClient::new(&config).unwrap();
    let outcome = client.login(&creds(), &cache).await.unwrap();
    assert_eq!(outcome, LoginOutcome::Resumed);
}

#[tokio::test]
async fn test_stale_session_falls_back_to_fresh_login() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/session"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    login_ok("tok-new").mount(&server).await;

    let config = test_config(&server.uri(), temp_dir.path());
    let cache = SessionCache::new(&config.session_path);
    cache
        .store(&SessionState {
            username: "poster".to_string(),
            token: "tok-stale".to_string(),
        })
        .await
        .unwrap();

    let mut client = HttpPlatformClient::new(&config).unwrap();
    let outcome = client.login(&creds(), &cache).await.unwrap();
    assert_eq!(outcome, LoginOutcome::Fresh);

    // The stale token was replaced in the cache
    assert_eq!(cache.load().await.unwrap().token, "tok-new");
}

#[tokio::test]
async fn test_rejected_credentials_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/session"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), temp_dir.path());
    let cache = SessionCache::new(&config.session_path);
    let mut client = HttpPlatformClient::new(&config).unwrap();

    let err = client.login(&creds(), &cache).await.unwrap_err();
    assert!(matches!(err, PlatformError::LoginRejected(_)), "{err}");
}

#[tokio::test]
async fn test_query_by_tag_parses_records() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    login_ok("tok-1").mount(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/tags/viral/media"))
        .and(query_param("limit", "5"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [
                {
                    "pk": 101,
                    "code": "abc",
                    "kind": "video",
                    "permalink": "https://platform.example/p/abc/",
                    "video_url": "https://cdn.example/101.mp4",
                    "view_count": 9000,
                    "like_count": 120,
                    "comment_count": 7
                },
                {
                    "pk": 102,
                    "code": "def",
                    "kind": "image"
                }
            ]
        })))
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), temp_dir.path());
    let cache = SessionCache::new(&config.session_path);
    let mut client = HttpPlatformClient::new(&config).unwrap();
    client.login(&creds(), &cache).await.unwrap();

    let records = client.query_by_tag("viral", 5).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].pk, 101);
    assert_eq!(records[0].kind, MediaKind::Video);
    assert_eq!(records[0].view_count, 9000);
    assert_eq!(records[1].kind, MediaKind::Image);
    // Omitted counters default to zero
    assert_eq!(records[1].view_count, 0);
}

#[tokio::test]
async fn test_query_rate_limited() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    login_ok("tok-1").mount(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/tags/viral/media"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), temp_dir.path());
    let cache = SessionCache::new(&config.session_path);
    let mut client = HttpPlatformClient::new(&config).unwrap();
    client.login(&creds(), &cache).await.unwrap();

    let err = client.query_by_tag("viral", 5).await.unwrap_err();
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_fetch_streams_media_to_download_dir() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/videos/clip9.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"FAKE VIDEO BYTES".to_vec()))
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), temp_dir.path());
    tokio::fs::create_dir_all(&config.download_dir).await.unwrap();
    let client = HttpPlatformClient::new(&config).unwrap();

    let media_ref = format!("{}/videos/clip9.mp4", server.uri());
    let path = client.fetch(&media_ref).await.unwrap();

    assert_eq!(path.file_name().unwrap(), "clip9.mp4");
    let bytes = tokio::fs::read(&path).await.unwrap();
    assert_eq!(bytes, b"FAKE VIDEO BYTES");
}

#[tokio::test]
async fn test_fetch_missing_media_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/videos/gone.mp4"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), temp_dir.path());
    tokio::fs::create_dir_all(&config.download_dir).await.unwrap();
    let client = HttpPlatformClient::new(&config).unwrap();

    let media_ref = format!("{}/videos/gone.mp4", server.uri());
    let err = client.fetch(&media_ref).await.unwrap_err();
    assert!(matches!(err, PlatformError::Status { status: 404, .. }), "{err}");
}

#[tokio::test]
async fn test_publish_uploads_and_returns_post() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    login_ok("tok-1").mount(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/media"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "777",
            "url": "https://platform.example/p/777/"
        })))
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), temp_dir.path());
    let cache = SessionCache::new(&config.session_path);
    let mut client = HttpPlatformClient::new(&config).unwrap();
    client.login(&creds(), &cache).await.unwrap();

    let video_path = temp_dir.path().join("clip.mp4");
    tokio::fs::write(&video_path, b"FAKE VIDEO BYTES").await.unwrap();

    let posted = client
        .publish(&video_path, "This is peak content")
        .await
        .unwrap();
    assert_eq!(posted.id, "777");
    assert_eq!(posted.url, "https://platform.example/p/777/");
}

#[tokio::test]
async fn test_publish_requires_login() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    let config = test_config(&server.uri(), temp_dir.path());
    let client = HttpPlatformClient::new(&config).unwrap();

    let video_path = temp_dir.path().join("clip.mp4");
    tokio::fs::write(&video_path, b"x").await.unwrap();

    let err = client.publish(&video_path, "caption").await.unwrap_err();
    assert!(matches!(err, PlatformError::NotAuthenticated), "{err}");
}
