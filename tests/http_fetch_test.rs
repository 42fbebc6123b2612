use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, Request};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use medalscan::config::ScanConfig;
use medalscan::cookies::{Cookie, CookieJar};
use medalscan::fetch::{FetchError, Fetcher, HttpFetcher};
use medalscan::{ScanMessage, Scanner, Store};

#[derive(Deserialize)]
struct PageQuery {
    page: Option<usize>,
}

/// Two-page medal listing that only answers to the expected session cookie.
async fn medal_page(Query(query): Query<PageQuery>, req: Request) -> impl IntoResponse {
    let cookie = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if cookie != "uid=42; pass=secret" {
        return (StatusCode::FORBIDDEN, "login required".to_string()).into_response();
    }

    let body = match query.page {
        None => r#"<input value="购买"><input value="购买"><a href="?page=1">2</a>"#,
        Some(1) => r#"<input value="购买"><a href="?page=0">1</a>"#,
        Some(_) => "",
    };
    (StatusCode::OK, body.to_string()).into_response()
}

async fn echo_agent(req: Request) -> impl IntoResponse {
    req.headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

async fn slow_page() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "too late"
}

async fn start_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/medal.php", get(medal_page))
        .route("/agent", get(echo_agent))
        .route("/slow", get(slow_page));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

fn session_jar() -> CookieJar {
    CookieJar::new(vec![
        Cookie {
            name: "uid".into(),
            value: "42".into(),
            domain: "127.0.0.1".into(),
            path: "/".into(),
            secure: false,
        },
        Cookie {
            name: "pass".into(),
            value: "secret".into(),
            domain: "127.0.0.1".into(),
            path: "/".into(),
            secure: false,
        },
    ])
}

#[tokio::test]
async fn test_fetch_sends_user_agent() {
    let (addr, _handle) = start_server().await;
    let fetcher = HttpFetcher::new("medalscan-test/1.0", Duration::from_secs(2)).unwrap();

    let body = fetcher
        .get(&format!("http://{}/agent", addr), "")
        .await
        .unwrap();
    assert_eq!(body, "medalscan-test/1.0");
}

#[tokio::test]
async fn test_fetch_reports_status() {
    let (addr, _handle) = start_server().await;
    let fetcher = HttpFetcher::new("test", Duration::from_secs(2)).unwrap();

    let err = fetcher
        .get(&format!("http://{}/medal.php", addr), "uid=1")
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::Status(403));
}

#[tokio::test]
async fn test_fetch_times_out() {
    let (addr, _handle) = start_server().await;
    let fetcher = HttpFetcher::new("test", Duration::from_millis(200)).unwrap();

    let err = fetcher
        .get(&format!("http://{}/slow", addr), "")
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::Timeout);
}

#[tokio::test]
async fn test_fetch_connection_refused_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = HttpFetcher::new("test", Duration::from_secs(2)).unwrap();
    let err = fetcher
        .get(&format!("http://{}/medal.php", addr), "")
        .await
        .unwrap_err();
    let reason = match err {
        FetchError::Network(reason) => reason,
        other => panic!("expected a network error, got {:?}", other),
    };
    assert!(reason.starts_with("error sending request"), "{}", reason);
    #[cfg(unix)]
    assert!(reason.contains("Connection refused"), "{}", reason);
}

#[tokio::test]
async fn test_scan_against_live_server() {
    let (addr, _handle) = start_server().await;
    let url = format!("http://{}/medal.php", addr);

    let store = Arc::new(Store::open_in_memory().unwrap());
    store.set_sites(&[format!("Local|{}", url)]).unwrap();

    let config = ScanConfig {
        timeout: Duration::from_secs(2),
        ..ScanConfig::default()
    };
    let fetcher = HttpFetcher::new(config.user_agent.clone(), config.timeout).unwrap();
    let scanner = Scanner::new(config, session_jar(), fetcher);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let results = scanner.run(&store, &tx).await.unwrap();
    drop(tx);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].count, 3);
    assert_eq!(results[0].url, url);

    let mut logs = Vec::new();
    while let Some(message) = rx.recv().await {
        if let ScanMessage::ScanLog { text, .. } = message {
            logs.push(text);
        }
    }
    assert_eq!(logs, vec!["Local: 2 page(s), found 3 purchasable medal(s)"]);
}
