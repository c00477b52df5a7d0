#![allow(dead_code)]

use fog_vision::{
    DetectionResult, EncodedFrame, EncoderConfig, Frame, FrameEncoder, ThresholdConfig, detect,
};

/// A small mid-gray frame, encoded the way the capture loop encodes it.
pub fn jpeg_frame() -> EncodedFrame {
    let frame = Frame::new(32, 24, vec![128; 32 * 24 * 3]);
    FrameEncoder::new(EncoderConfig {
        width: 32,
        height: 24,
        jpeg_quality: 80,
    })
    .encode(&frame)
    .expect("frame encodes")
}

/// What the service would answer for `jpeg_frame()`.
pub fn service_result(thresholds: &ThresholdConfig) -> DetectionResult {
    detect(&jpeg_frame().bytes, thresholds).expect("jpeg decodes")
}

/// A localhost URL with nothing listening on it.
pub fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}
