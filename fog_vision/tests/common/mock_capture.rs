use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use fog_vision::core_modules::gray_image::gray_image::GrayscaleImage;
use fog_vision::pipeline::analyze;
use fog_vision::{
    CaptureError, DetectionResult, Detector, EncodedFrame, Frame, FrameSource,
    FrameSourceProvider, SessionError, ThresholdConfig,
};
use futures::future::BoxFuture;

/// Shared counters so tests can observe a device after the loop has taken it.
#[derive(Debug, Default)]
pub struct DeviceCounters {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub frames: AtomicUsize,
}

impl DeviceCounters {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn frames(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum DeviceBehavior {
    /// Always yields a small grey frame.
    Healthy,
    /// Refuses to be acquired.
    Absent,
    /// Yields frames with zero width.
    ZeroSized,
    /// Yields `n` frames, then reports a disconnect.
    DisconnectAfter(usize),
}

pub struct MockProvider {
    pub behavior: DeviceBehavior,
    pub counters: Arc<DeviceCounters>,
}

impl MockProvider {
    pub fn new(behavior: DeviceBehavior) -> (Self, Arc<DeviceCounters>) {
        let counters = Arc::new(DeviceCounters::default());
        (
            Self {
                behavior,
                counters: counters.clone(),
            },
            counters,
        )
    }
}

pub struct MockSource {
    behavior: DeviceBehavior,
    counters: Arc<DeviceCounters>,
}

impl FrameSource for MockSource {
    fn name(&self) -> String {
        "mock-camera".into()
    }

    fn current_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let served = self.counters.frames.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            DeviceBehavior::ZeroSized => Ok(Some(Frame::new(0, 48, Vec::new()))),
            DeviceBehavior::DisconnectAfter(n) if served >= n => {
                Err(CaptureError::Disconnected("cable pulled".into()))
            }
            _ => Ok(Some(Frame::new(64, 48, vec![120; 64 * 48 * 3]))),
        }
    }

    fn release(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl FrameSourceProvider for MockProvider {
    type Source = MockSource;

    fn acquire(&self) -> Result<MockSource, CaptureError> {
        if let DeviceBehavior::Absent = self.behavior {
            return Err(CaptureError::DeviceUnavailable("no camera granted".into()));
        }
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(MockSource {
            behavior: self.behavior,
            counters: self.counters.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Result,
    Error(SessionError),
    /// Panics on the very first call, answers normally afterwards.
    PanicOnce,
}

/// A detector with a fixed response delay that records how many calls overlap.
pub struct MockDetector {
    pub delay: Duration,
    pub reply: Reply,
    pub calls: AtomicUsize,
    pub finished: AtomicUsize,
    pub outstanding: AtomicUsize,
    pub max_outstanding: AtomicUsize,
}

impl MockDetector {
    pub fn new(delay: Duration, reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            delay,
            reply,
            calls: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            outstanding: AtomicUsize::new(0),
            max_outstanding: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn max_outstanding(&self) -> usize {
        self.max_outstanding.load(Ordering::SeqCst)
    }
}

fn canned_result(thresholds: &ThresholdConfig) -> DetectionResult {
    let image = GrayscaleImage::new(4, 4, vec![100; 16]).expect("valid dims");
    analyze(&image, thresholds)
}

impl Detector for MockDetector {
    fn submit(
        &self,
        _frame: EncodedFrame,
        thresholds: ThresholdConfig,
    ) -> BoxFuture<'_, Result<DetectionResult, SessionError>> {
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if matches!(self.reply, Reply::PanicOnce) && call == 0 {
                panic!("detector blew up");
            }
            let now = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_outstanding.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;

            self.outstanding.fetch_sub(1, Ordering::SeqCst);
            self.finished.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Reply::Result | Reply::PanicOnce => Ok(canned_result(&thresholds)),
                Reply::Error(err) => Err(err.clone()),
            }
        })
    }
}
