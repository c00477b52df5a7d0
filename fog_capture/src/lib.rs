// THEORY:
// `fog_capture` is the client half of the system. It binds a frame source (a live
// camera, a still image, or a synthetic pattern) to the `fog_vision::CaptureLoop` and
// points the loop at a detector: the remote service through `HttpDetector`, or the
// in-process `LocalDetector`. It never classifies anything itself; every verdict comes
// back from the detector as a `DetectionResult`.

#[cfg(feature = "camera")]
pub mod camera;
pub mod client;
pub mod config;
pub mod sources;

pub use client::HttpDetector;
pub use sources::{SourceSpec, SpecProvider, SyntheticPattern};
