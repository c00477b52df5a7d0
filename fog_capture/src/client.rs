// THEORY:
// `HttpDetector` is the `Detector` that talks to a remote `fog_vision_server`. It owns
// the whole wire contract on the client side: one multipart POST per frame, thresholds
// in the query string, and a mapping from HTTP outcomes onto `SessionError` so the
// capture loop never sees a transport type.

use std::time::Duration;

use anyhow::Context;
use fog_vision::{DetectionResult, Detector, EncodedFrame, SessionError, ThresholdConfig};
use futures::future::BoxFuture;
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

/// Path of the detection endpoint, relative to the service base URL.
pub const DETECT_PATH: &str = "detect-fog";

#[derive(Debug, Clone)]
pub struct HttpDetector {
    client: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

impl HttpDetector {
    pub fn new(service_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut base = Url::parse(service_url)
            .with_context(|| format!("invalid service url {service_url:?}"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join(DETECT_PATH)
            .context("could not build the detection endpoint")?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("could not build http client")?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn map_transport(&self, err: reqwest::Error) -> SessionError {
        if err.is_timeout() {
            SessionError::Timeout(self.timeout)
        } else {
            SessionError::Transport(err.to_string())
        }
    }

    async fn post(
        &self,
        frame: EncodedFrame,
        thresholds: ThresholdConfig,
    ) -> Result<DetectionResult, SessionError> {
        let size = frame.bytes.len();
        let part = Part::bytes(frame.bytes)
            .file_name("frame.jpg")
            .mime_str(frame.content_type)
            .map_err(|err| SessionError::Transport(err.to_string()))?;
        let form = Form::new().part("file", part);

        debug!(bytes = size, endpoint = %self.endpoint, "submitting frame");
        let response = self
            .client
            .post(self.endpoint.clone())
            .query(&[
                ("laplacian_threshold", thresholds.laplacian_threshold),
                ("std_dev_threshold", thresholds.std_dev_threshold),
            ])
            .multipart(form)
            .send()
            .await
            .map_err(|err| self.map_transport(err))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<DetectionResult>()
                .await
                .map_err(|err| self.map_transport(err));
        }

        let body = response.text().await.unwrap_or_default();
        let detail = error_detail(status, &body);
        if status == StatusCode::BAD_REQUEST {
            Err(SessionError::Decode(detail))
        } else {
            Err(SessionError::Rejected {
                status: status.as_u16(),
                detail,
            })
        }
    }
}

/// The service's `detail` message, or the raw body, or the status reason.
fn error_detail(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorBody { detail }) = serde_json::from_str::<ErrorBody>(body) {
        return detail;
    }
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

impl Detector for HttpDetector {
    fn submit(
        &self,
        frame: EncodedFrame,
        thresholds: ThresholdConfig,
    ) -> BoxFuture<'_, Result<DetectionResult, SessionError>> {
        Box::pin(self.post(frame, thresholds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_a_base_path() {
        let root = HttpDetector::new("http://localhost:8000", Duration::from_secs(1))
            .expect("valid url");
        assert_eq!(root.endpoint().as_str(), "http://localhost:8000/detect-fog");

        let nested = HttpDetector::new("http://gateway.local/fog", Duration::from_secs(1))
            .expect("valid url");
        assert_eq!(nested.endpoint().as_str(), "http://gateway.local/fog/detect-fog");
    }

    #[test]
    fn detail_prefers_the_json_message() {
        assert_eq!(
            error_detail(StatusCode::UNPROCESSABLE_ENTITY, r#"{"detail":"bad threshold"}"#),
            "bad threshold"
        );
        assert_eq!(error_detail(StatusCode::BAD_GATEWAY, "upstream down"), "upstream down");
        assert_eq!(error_detail(StatusCode::BAD_GATEWAY, ""), "Bad Gateway");
    }
}
