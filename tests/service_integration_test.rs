use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};

use scene_composer::catalog::AssetCatalog;
use scene_composer::composer::SceneComposer;
use scene_composer::config::ComposerSettings;
use scene_composer::service::{serve, AppState};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

async fn start_server(max_retained_jobs: usize, max_body_bytes: usize) -> (SocketAddr, AppState) {
    let composer = Arc::new(SceneComposer::new(
        Arc::new(AssetCatalog::embedded()),
        ComposerSettings::default(),
    ));
    let state = AppState::new(composer, max_retained_jobs, max_body_bytes);
    state.health.set_ready(true).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_state = state.clone();
    tokio::spawn(async move {
        let _ = serve(listener, server_state).await;
    });

    (addr, state)
}

/// Send one HTTP/1.1 request and return (status, body)
async fn request(addr: SocketAddr, method: &str, path: &str, body: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let raw = format!(
        "{} {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        method,
        path,
        body.len(),
        body
    );
    stream.write_all(raw.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    timeout(TEST_TIMEOUT, stream.read_to_end(&mut response))
        .await
        .expect("response timed out")
        .unwrap();
    let text = String::from_utf8_lossy(&response).to_string();

    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap_or(0);
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();

    (status, body)
}

fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("invalid JSON body {:?}: {}", body, e))
}

#[tokio::test]
async fn test_health_and_ready() {
    let (addr, state) = start_server(8, 1024 * 1024).await;

    assert_eq!(request(addr, "GET", "/health", "").await, (200, "OK".to_string()));
    assert_eq!(request(addr, "GET", "/ready", "").await, (200, "Ready".to_string()));

    state.health.set_ready(false).await;
    assert_eq!(request(addr, "GET", "/ready", "").await.0, 503);

    assert_eq!(request(addr, "GET", "/nowhere", "").await.0, 404);
}

#[tokio::test]
async fn test_instant_compose() {
    let (addr, _) = start_server(8, 1024 * 1024).await;

    let (status, body) = request(
        addr,
        "POST",
        "/compose",
        r#"{"buildings":[{"floors":2}],"roadSequence":["straight"],"forestDensity":0.0,"seed":9}"#,
    )
    .await;
    assert_eq!(status, 200);

    let doc = json(&body);
    assert_eq!(doc["placeableAssets"].as_array().unwrap().len(), 12);
    assert_eq!(doc["foliage"].as_array().unwrap().len(), 0);
    assert_eq!(doc["placeableAssets"][0]["collisionProfile"], "BlockAllDynamic");
    assert_eq!(doc["placeableAssets"][0]["physicsEnabled"], false);
    let brightness = doc["defaultProperties"]["brightness"].as_f64().unwrap();
    assert!((brightness - 93.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_compose_errors_map_to_statuses() {
    let (addr, _) = start_server(8, 256).await;

    assert_eq!(request(addr, "POST", "/compose", "{not json").await.0, 400);
    assert_eq!(
        request(addr, "POST", "/compose", r#"{"buildings":[{"floors":-1}]}"#).await.0,
        400
    );
    assert_eq!(
        request(addr, "POST", "/compose", r#"{"forestDensity":2.0}"#).await.0,
        400
    );
    assert_eq!(
        request(addr, "POST", "/compose", r#"{"buildings":[{"floors":9}]}"#).await.0,
        422
    );

    let oversized = format!(r#"{{"roadSequence":["{}"]}}"#, "x".repeat(512));
    assert_eq!(request(addr, "POST", "/compose", &oversized).await.0, 413);

    assert_eq!(request(addr, "GET", "/compose", "").await.0, 405);
}

#[tokio::test]
async fn test_job_mode_round_trip() {
    let (addr, _) = start_server(8, 1024 * 1024).await;

    let (status, body) = request(
        addr,
        "POST",
        "/jobs",
        r#"{"buildings":[{"floors":1}],"roadSequence":["nonsense"],"forestDensity":0.2,"seed":3}"#,
    )
    .await;
    assert_eq!(status, 202);
    let job_id = json(&body)["jobId"].as_str().unwrap().to_string();

    let mut finished = None;
    for _ in 0..100 {
        let (status, body) = request(addr, "GET", &format!("/jobs/{}", job_id), "").await;
        assert_eq!(status, 200);
        let job = json(&body);
        if job["status"] == "done" || job["status"] == "error" {
            finished = Some(job);
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    let job = finished.expect("job never finished");
    assert_eq!(job["status"], "done");

    let (status, body) = request(addr, "GET", &format!("/jobs/{}/logs", job_id), "").await;
    assert_eq!(status, 200);
    let logs = json(&body)["logs"].as_array().unwrap().clone();
    assert!(logs.iter().any(|l| l.as_str().unwrap().contains("nonsense")));

    let (status, body) = request(addr, "GET", &format!("/jobs/{}/result", job_id), "").await;
    assert_eq!(status, 200);
    assert!(json(&body)["placeableAssets"].as_array().unwrap().len() >= 7);

    // Cancelling a finished job leaves it done
    let (status, body) = request(addr, "POST", &format!("/jobs/{}/cancel", job_id), "").await;
    assert_eq!(status, 200);
    assert_eq!(json(&body)["status"], "done");
}

#[tokio::test]
async fn test_unknown_and_cancelled_jobs() {
    let (addr, state) = start_server(8, 1024 * 1024).await;

    let missing = uuid::Uuid::new_v4();
    assert_eq!(request(addr, "GET", &format!("/jobs/{}", missing), "").await.0, 404);
    assert_eq!(request(addr, "GET", "/jobs/not-a-uuid", "").await.0, 404);

    // A queued job that is cancelled never produces a result
    let id = state.jobs.create().await.unwrap();
    let (status, body) = request(addr, "POST", &format!("/jobs/{}/cancel", id), "").await;
    assert_eq!(status, 200);
    assert_eq!(json(&body)["status"], "cancelled");

    let (status, body) = request(addr, "GET", &format!("/jobs/{}/result", id), "").await;
    assert_eq!(status, 409);
    assert_eq!(json(&body)["status"], "cancelled");
}

#[tokio::test]
async fn test_full_job_table_rejects_new_jobs() {
    let (addr, state) = start_server(1, 1024 * 1024).await;

    // Occupy the only slot with an unfinished job
    state.jobs.create().await.unwrap();

    let (status, _) = request(addr, "POST", "/jobs", "{}").await;
    assert_eq!(status, 503);
}
