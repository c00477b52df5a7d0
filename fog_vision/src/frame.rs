// THEORY:
// The `frame` module defines what a capture device hands to the loop and how the
// device itself is held.
//
// Key architectural principles:
// 1.  **Ephemeral Frames**: A `Frame` lives for one capture cycle. The loop grabs it,
//     encodes it, and drops it; only the `EncodedFrame` travels to the detector.
// 2.  **Scoped Devices**: A `FrameSource` is never passed around bare. Acquisition goes
//     through a `FrameSourceProvider` and the result is immediately wrapped in a
//     `ScopedSource`, whose `Drop` releases the device. Stop, a fatal capture error, a
//     cancelled session task and process shutdown all end in that one `Drop`.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::CaptureError;

pub const RGB_CHANNELS: usize = 3;

/// One raw RGB8 frame as delivered by a capture device.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Packed RGB8, row-major, `width * height * 3` bytes.
    pub data: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
            captured_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A frame serialized for transport to the detection service.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub content_type: &'static str,
    pub captured_at: DateTime<Utc>,
}

impl EncodedFrame {
    /// Wrap bytes that are already encoded, such as an image file read from disk.
    pub fn new(bytes: Vec<u8>, width: u32, height: u32, content_type: &'static str) -> Self {
        Self {
            bytes,
            width,
            height,
            content_type,
            captured_at: Utc::now(),
        }
    }
}

/// A live video stream that can be asked for its current frame.
pub trait FrameSource: Send + 'static {
    /// Human readable device name for logs.
    fn name(&self) -> String;

    /// The frame currently visible on the device. `Ok(None)` means no frame is ready yet;
    /// an error is fatal to the capture session.
    fn current_frame(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Give the underlying hardware back. Called exactly once, from `ScopedSource::drop`.
    fn release(&mut self) {}
}

impl FrameSource for Box<dyn FrameSource> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn current_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        (**self).current_frame()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Grants access to a capture device.
pub trait FrameSourceProvider: Send + Sync + 'static {
    type Source: FrameSource;

    /// Fails with `CaptureError::DeviceUnavailable` when no device is present or access
    /// is denied.
    fn acquire(&self) -> Result<Self::Source, CaptureError>;
}

/// Exclusive, scoped ownership of an acquired source.
pub struct ScopedSource<S: FrameSource> {
    source: S,
}

impl<S: FrameSource> ScopedSource<S> {
    pub fn new(source: S) -> Self {
        info!(device = %source.name(), "capture device acquired");
        Self { source }
    }

    pub fn current_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        self.source.current_frame()
    }

    pub fn name(&self) -> String {
        self.source.name()
    }
}

impl<S: FrameSource> Drop for ScopedSource<S> {
    fn drop(&mut self) {
        self.source.release();
        info!(device = %self.source.name(), "capture device released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        releases: Arc<AtomicUsize>,
    }

    impl FrameSource for CountingSource {
        fn name(&self) -> String {
            "counting".into()
        }

        fn current_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
            Ok(Some(Frame::new(2, 2, vec![0; 12])))
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn dropping_the_guard_releases_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        {
            let mut scoped = ScopedSource::new(CountingSource {
                releases: releases.clone(),
            });
            assert!(scoped.current_frame().expect("frame").is_some());
            assert_eq!(releases.load(Ordering::SeqCst), 0);
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn boxed_sources_forward_release() {
        let releases = Arc::new(AtomicUsize::new(0));
        let boxed: Box<dyn FrameSource> = Box::new(CountingSource {
            releases: releases.clone(),
        });
        drop(ScopedSource::new(boxed));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_sized_frames_are_empty() {
        assert!(Frame::new(0, 480, Vec::new()).is_empty());
        assert!(!Frame::new(1, 1, vec![0; 3]).is_empty());
    }
}
