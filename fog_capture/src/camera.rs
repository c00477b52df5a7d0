// THEORY:
// OpenCV-backed live camera. The device is opened once per session and read
// synchronously; a run of empty reads means the hardware went away.

use fog_vision::{CaptureError, Frame, FrameSource};
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use tracing::{debug, warn};

/// Consecutive empty reads after which the camera is considered gone.
const MAX_MISSED_READS: u32 = 25;

pub struct CameraSource {
    index: i32,
    capture: VideoCapture,
    bgr: Mat,
    rgb: Mat,
    missed: u32,
}

impl CameraSource {
    pub fn open(index: i32) -> Result<Self, CaptureError> {
        let unavailable =
            |err: opencv::Error| CaptureError::DeviceUnavailable(format!("camera {index}: {err}"));

        for backend in [videoio::CAP_V4L, videoio::CAP_ANY] {
            match VideoCapture::new(index, backend) {
                Ok(capture) => {
                    if capture.is_opened().map_err(unavailable)? {
                        return Ok(Self {
                            index,
                            capture,
                            bgr: Mat::default(),
                            rgb: Mat::default(),
                            missed: 0,
                        });
                    }
                }
                Err(err) => debug!("camera {index} did not open with backend {backend}: {err}"),
            }
        }
        Err(CaptureError::DeviceUnavailable(format!(
            "camera {index} could not be opened"
        )))
    }

    fn miss(&mut self) -> Result<Option<Frame>, CaptureError> {
        self.missed += 1;
        if self.missed >= MAX_MISSED_READS {
            return Err(CaptureError::Disconnected(format!(
                "camera {} stopped delivering frames",
                self.index
            )));
        }
        Ok(None)
    }
}

impl FrameSource for CameraSource {
    fn name(&self) -> String {
        format!("camera {}", self.index)
    }

    fn current_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let disconnected = |err: opencv::Error| CaptureError::Disconnected(err.to_string());

        if !self.capture.read(&mut self.bgr).map_err(disconnected)? || self.bgr.empty() {
            return self.miss();
        }
        self.missed = 0;

        // OpenCV hands out BGR; frames travel as RGB.
        imgproc::cvt_color(&self.bgr, &mut self.rgb, imgproc::COLOR_BGR2RGB, 0)
            .map_err(disconnected)?;
        let width = self.rgb.cols().max(0) as u32;
        let height = self.rgb.rows().max(0) as u32;
        let data = self.rgb.data_bytes().map_err(disconnected)?.to_vec();

        Ok(Some(Frame::new(width, height, data)))
    }

    fn release(&mut self) {
        if let Err(err) = self.capture.release() {
            warn!("camera {} release failed: {err}", self.index);
        }
    }
}
