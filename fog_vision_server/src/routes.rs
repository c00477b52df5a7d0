// THEORY:
// The routes are a thin shell over `fog_vision::detect`. A request is parsed, its
// thresholds are resolved against the server defaults, and the analysis is handed to the
// blocking pool. Nothing is shared between requests except the read-only defaults and the
// semaphore that caps how many analyses run at once.

use axum::Json;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fog_vision::{DetectError, DetectionResult, ThresholdConfig, detect};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::AppState;

/// Name of the multipart part that carries the image.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DetectError> for ApiError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::Decode(_) | DetectError::EmptyImage => {
                ApiError::BadRequest(format!("Invalid image file: {err}"))
            }
            DetectError::InvalidThreshold { .. } => ApiError::Unprocessable(err.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::BadRequest(format!("malformed multipart body: {}", err.body_text()))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {self}");
        } else {
            warn!(status = status.as_u16(), "request rejected: {self}");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Per-request threshold overrides. Missing values fall back to the server defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ThresholdQuery {
    pub laplacian_threshold: Option<f64>,
    pub std_dev_threshold: Option<f64>,
}

impl ThresholdQuery {
    pub fn resolve(&self, defaults: &ThresholdConfig) -> Result<ThresholdConfig, DetectError> {
        ThresholdConfig::new(
            self.laplacian_threshold.unwrap_or(defaults.laplacian_threshold),
            self.std_dev_threshold.unwrap_or(defaults.std_dev_threshold),
        )
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn detect_fog(
    State(state): State<AppState>,
    query: Result<Query<ThresholdQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectionResult>, ApiError> {
    let Query(query) = query.map_err(|err| ApiError::Unprocessable(err.body_text()))?;
    let thresholds = query.resolve(&state.defaults)?;

    let mut multipart = multipart.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    let bytes = read_file_field(&mut multipart).await?;
    debug!(bytes = bytes.len(), "image received");

    let permit = state
        .workers
        .clone()
        .acquire_owned()
        .await
        .map_err(|err| ApiError::Internal(format!("analysis pool closed: {err}")))?;

    let result = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        detect(&bytes, &thresholds)
    })
    .await
    .map_err(|err| ApiError::Internal(format!("analysis task failed: {err}")))??;

    Ok(Json(result))
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            return Ok(field.bytes().await?.to_vec());
        }
    }
    Err(ApiError::BadRequest(format!(
        "no '{FILE_FIELD}' part in the request"
    )))
}
