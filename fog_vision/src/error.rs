use std::time::Duration;

use thiserror::Error;

/// Failures of the stateless analysis call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectError {
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("image has no pixels")]
    EmptyImage,
    #[error("{name} must be a positive, finite number (got {value})")]
    InvalidThreshold { name: &'static str, value: f64 },
}

impl From<image::ImageError> for DetectError {
    fn from(err: image::ImageError) -> Self {
        DetectError::Decode(err.to_string())
    }
}

/// Failures raised by a frame source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("capture device disconnected: {0}")]
    Disconnected(String),
}

/// Everything a capture session can surface to its result sink.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Fatal: the session ends and stays idle until explicitly restarted.
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("detection service could not decode the frame: {0}")]
    Decode(String),
    #[error("detection request timed out after {0:?}")]
    Timeout(Duration),
    #[error("detection service unreachable: {0}")]
    Transport(String),
    /// The service answered, but with a failure other than an undecodable frame.
    #[error("detection service rejected the request ({status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("capture loop is already running")]
    AlreadyRunning,
}

impl SessionError {
    /// Only a lost or refused device ends a session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::DeviceUnavailable(_))
    }
}

impl From<CaptureError> for SessionError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::DeviceUnavailable(msg) | CaptureError::Disconnected(msg) => {
                SessionError::DeviceUnavailable(msg)
            }
        }
    }
}

impl From<DetectError> for SessionError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::Decode(msg) => SessionError::Decode(msg),
            DetectError::EmptyImage => SessionError::Decode(err.to_string()),
            DetectError::InvalidThreshold { .. } => SessionError::Rejected {
                status: 422,
                detail: err.to_string(),
            },
        }
    }
}
