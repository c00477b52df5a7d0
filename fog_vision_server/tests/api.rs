mod common;

use common::{checkerboard_png, file_form, spawn_server, uniform_png};
use fog_vision::{DetectionResult, Intensity, ThresholdConfig};
use fog_vision_server::ServerConfig;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn health_reports_ok() {
    let base = spawn_server(ServerConfig::default()).await;
    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .expect("request sent")
        .json()
        .await
        .expect("json body");
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn flat_image_is_heavy_fog_with_default_thresholds() {
    let base = spawn_server(ServerConfig::default()).await;
    let response = reqwest::Client::new()
        .post(format!("{base}/detect-fog"))
        .multipart(file_form(uniform_png(64, 48, 128)))
        .send()
        .await
        .expect("request sent");
    assert_eq!(response.status(), StatusCode::OK);

    let result: DetectionResult = response.json().await.expect("detection result");
    assert!(result.fog_detected);
    assert_eq!(result.intensity, Intensity::Heavy);
    assert_eq!(result.laplacian_variance, 0.0);
    assert_eq!(result.histogram_std_dev, 0.0);
    assert_eq!(result.histogram.len(), 256);
    assert_eq!(result.histogram.iter().sum::<u64>(), 64 * 48);
    assert_eq!(result.thresholds_used(), ThresholdConfig::default());
}

#[tokio::test]
async fn query_thresholds_override_server_defaults() {
    let defaults = ThresholdConfig::new(500.0, 60.0).expect("valid thresholds");
    let base = spawn_server(ServerConfig {
        thresholds: defaults,
        ..ServerConfig::default()
    })
    .await;

    let result: DetectionResult = reqwest::Client::new()
        .post(format!("{base}/detect-fog?laplacian_threshold=80"))
        .multipart(file_form(checkerboard_png(64, 64, 16)))
        .send()
        .await
        .expect("request sent")
        .json()
        .await
        .expect("detection result");
    assert_eq!(result.laplacian_threshold_used, 80.0);
    assert_eq!(result.std_dev_threshold_used, 60.0);
    assert_eq!(result.intensity, Intensity::Clear);
}

#[tokio::test]
async fn undecodable_upload_is_a_bad_request() {
    let base = spawn_server(ServerConfig::default()).await;
    let response = reqwest::Client::new()
        .post(format!("{base}/detect-fog"))
        .multipart(file_form(b"not an image at all".to_vec()))
        .send()
        .await
        .expect("request sent");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("json body");
    assert!(body["detail"].as_str().is_some());
}

#[tokio::test]
async fn missing_file_part_is_a_bad_request() {
    let base = spawn_server(ServerConfig::default()).await;
    let form = reqwest::multipart::Form::new().text("note", "no image here");
    let response = reqwest::Client::new()
        .post(format!("{base}/detect-fog"))
        .multipart(form)
        .send()
        .await
        .expect("request sent");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_thresholds_are_unprocessable() {
    let base = spawn_server(ServerConfig::default()).await;
    for query in ["laplacian_threshold=-5", "std_dev_threshold=0", "std_dev_threshold=abc"] {
        let response = reqwest::Client::new()
            .post(format!("{base}/detect-fog?{query}"))
            .multipart(file_form(uniform_png(8, 8, 10)))
            .send()
            .await
            .expect("request sent");
        assert_eq!(
            response.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "query {query}"
        );
        let body: Value = response.json().await.expect("json body");
        assert!(body["detail"].as_str().is_some(), "query {query}");
    }
}

#[tokio::test]
async fn oversized_upload_is_refused() {
    let base = spawn_server(ServerConfig {
        max_upload_bytes: 1024,
        ..ServerConfig::default()
    })
    .await;
    let response = reqwest::Client::new()
        .post(format!("{base}/detect-fog"))
        .multipart(file_form(vec![0u8; 16 * 1024]))
        .send()
        .await
        .expect("request sent");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let body: Value = response.json().await.expect("json body");
    let detail = body["detail"].as_str().expect("detail is a string");
    assert!(!detail.is_empty());
}
