//! Server route tests
//!
//! Spins up the real router on an ephemeral port and exercises the landing
//! page, the health check, and the exposition endpoint over HTTP.

use std::sync::Arc;

use hadoop_exporter::collector::{AuthMode, Fetcher};
use hadoop_exporter::config::{AuthConfig, Config, ServerConfig, TargetConfig};
use hadoop_exporter::extractor::TargetKind;
use hadoop_exporter::poller::Poller;
use hadoop_exporter::server::{self, AppState};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JMX_BODY: &str = r#"{"beans":[{
    "name": "Hadoop:service=NameNode,name=FSNamesystem",
    "modelerType": "FSNamesystem",
    "MissingBlocks": 2,
    "tag.HAState": "active"
}]}"#;

/// Start a mock /jmx endpoint plus the exporter's router on an ephemeral
/// port. The mock server is returned so it stays alive for the test.
async fn spawn_app() -> (String, MockServer) {
    let jmx = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jmx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(JMX_BODY))
        .mount(&jmx)
        .await;

    let url = format!("{}/jmx", jmx.uri());
    let config = Config {
        server: ServerConfig::default(),
        target: TargetConfig {
            kind: TargetKind::NameNode,
            url: url.clone(),
            timeout_ms: 2000,
        },
        auth: AuthConfig::default(),
    };

    let poller = Poller::new(
        Fetcher::new(2000).unwrap(),
        AuthMode::Anonymous,
        url,
        TargetKind::NameNode,
    );
    let state = AppState {
        config: Arc::new(config),
        poller: Arc::new(poller),
    };

    let app = server::router(state, "/metrics");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), jmx)
}

#[tokio::test]
async fn test_root_links_metrics_path() {
    let (base, _jmx) = spawn_app().await;

    let response = reqwest::get(&base).await.unwrap();
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    assert!(body.contains("NameNode"));
    assert!(body.contains("href=\"/metrics\""));
    assert!(body.contains("href=\"/health\""));
}

#[tokio::test]
async fn test_health_reports_status_and_counters() {
    let (base, _jmx) = spawn_app().await;

    let response = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["scrapes"].is_u64());
    assert!(body["failures"].is_u64());
}

#[tokio::test]
async fn test_metrics_route_polls_and_renders() {
    let (base, _jmx) = spawn_app().await;

    let response = reqwest::get(format!("{}/metrics", base)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/plain; version=0.0.4; charset=utf-8")
    );

    let body = response.text().await.unwrap();
    assert!(body.contains("hdfs_namenode_fsname_system_missing_blocks 2"));
    assert!(body.contains("hdfs_namenode_fsname_system_hastate 1"));
    assert!(body.contains("hadoop_exporter_scrapes_total 1"));

    // A second scrape advances the exporter's own counter.
    let body = reqwest::get(format!("{}/metrics", base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("hadoop_exporter_scrapes_total 2"));
}
