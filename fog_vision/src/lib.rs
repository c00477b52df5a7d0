// THEORY:
// This file is the main entry point for the `fog_vision` library crate. It defines the
// public API consumed by the HTTP service (`fog_vision_server`) and the capture client
// (`fog_capture`).
//
// Two surfaces are exported:
// 1.  The stateless analysis engine: `pipeline::detect` and its data structures
//     (`ThresholdConfig`, `DetectionResult`, `Intensity`). The metric primitives live in
//     `core_modules` and stay usable on their own.
// 2.  The capture side: frames and sources (`frame`), the JPEG encoder (`encoder`), the
//     session state value object (`session`) and the backpressured `CaptureLoop`.

pub mod capture_loop;
pub mod core_modules;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod session;

pub use crate::capture_loop::{CaptureLoop, Detector, LocalDetector, LoopConfig};
pub use crate::core_modules::classifier::Intensity;
pub use crate::encoder::{EncoderConfig, FrameEncoder};
pub use crate::error::{CaptureError, DetectError, SessionError};
pub use crate::frame::{EncodedFrame, Frame, FrameSource, FrameSourceProvider, ScopedSource};
pub use crate::pipeline::{DetectionMetrics, DetectionResult, ThresholdConfig, detect};
pub use crate::session::{CycleStats, LoopPhase, SessionState};
