// THEORY:
// The `CaptureLoop` is the only active scheduler in the system. On a fixed cadence it
// pulls the current frame from a capture device, encodes it, and submits it to a
// `Detector`; the outcome is published to whoever watches the session state.
//
// Key architectural principles:
// 1.  **One Session Task**: `start` acquires the device and spawns a single task that
//     owns it. The task `select!`s between the stop signal, the completion of the
//     outstanding submission, and the interval timer, always in that order.
// 2.  **Backpressure by Skipping**: A tick that arrives while a submission is still
//     outstanding is dropped and counted. It is never queued and never run alongside the
//     first. A slow detector can therefore never build up more than one request.
// 3.  **Ordered Results**: Because there is at most one submission at a time, results
//     are published in exactly the order their requests were issued.
// 4.  **Abandon, Don't Await**: The session awaits the submission task's own handle.
//     Stopping aborts that task, so a response arriving after stop has nowhere to land
//     and can never touch a stopped session. A task that dies without answering still
//     completes its handle, which frees the slot for the next cycle.
// 5.  **Scoped Device**: The device lives in a `ScopedSource` inside the session task.
//     Whether the task ends by stop, by a fatal capture error, or by being aborted,
//     dropping it releases the hardware.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::encoder::{EncoderConfig, FrameEncoder};
use crate::error::SessionError;
use crate::frame::{EncodedFrame, FrameSource, FrameSourceProvider, ScopedSource};
use crate::pipeline::{DetectionResult, ThresholdConfig, detect};
use crate::session::{LoopPhase, SessionState};

pub const DEFAULT_CAPTURE_INTERVAL: Duration = Duration::from_millis(1200);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Anything that can turn an encoded frame into a detection result.
pub trait Detector: Send + Sync + 'static {
    fn submit(
        &self,
        frame: EncodedFrame,
        thresholds: ThresholdConfig,
    ) -> BoxFuture<'_, Result<DetectionResult, SessionError>>;
}

/// Runs the detection pipeline in-process on the blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDetector;

impl Detector for LocalDetector {
    fn submit(
        &self,
        frame: EncodedFrame,
        thresholds: ThresholdConfig,
    ) -> BoxFuture<'_, Result<DetectionResult, SessionError>> {
        Box::pin(async move {
            tokio::task::spawn_blocking(move || detect(&frame.bytes, &thresholds))
                .await
                .map_err(|err| SessionError::Transport(format!("analysis task failed: {err}")))?
                .map_err(SessionError::from)
        })
    }
}

/// Configuration for the capture loop, allowing for tunable behavior.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Time between capture cycles.
    pub interval: Duration,
    /// Deadline for a single detector round trip.
    pub request_timeout: Duration,
    pub encoder: EncoderConfig,
    pub thresholds: ThresholdConfig,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_CAPTURE_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            encoder: EncoderConfig::default(),
            thresholds: ThresholdConfig::default(),
        }
    }
}

struct SessionHandle {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct CaptureLoop<P: FrameSourceProvider> {
    provider: Arc<P>,
    detector: Arc<dyn Detector>,
    config: LoopConfig,
    state_tx: Arc<watch::Sender<SessionState>>,
    thresholds_tx: watch::Sender<ThresholdConfig>,
    session: Option<SessionHandle>,
}

impl<P: FrameSourceProvider> CaptureLoop<P> {
    pub fn new(provider: P, detector: Arc<dyn Detector>, config: LoopConfig) -> Self {
        let (state_tx, _) = watch::channel(SessionState::new(config.thresholds));
        let (thresholds_tx, _) = watch::channel(config.thresholds);
        Self {
            provider: Arc::new(provider),
            detector,
            config,
            state_tx: Arc::new(state_tx),
            thresholds_tx,
            session: None,
        }
    }

    /// A receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Snapshot of the current session state.
    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    pub fn phase(&self) -> LoopPhase {
        self.state_tx.borrow().phase
    }

    /// Change thresholds; the next submission uses them.
    pub fn set_thresholds(&self, thresholds: ThresholdConfig) {
        self.thresholds_tx.send_replace(thresholds);
        self.state_tx.send_modify(|s| s.thresholds = thresholds);
    }

    /// Acquire the device and begin capturing. The first cycle runs immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<(), SessionError> {
        let mut begin = Ok(());
        self.state_tx.send_modify(|s| begin = s.begin_start());
        begin?;

        // A session that ended on its own (fatal capture error) leaves a finished task.
        if let Some(old) = self.session.take() {
            old.task.abort();
        }

        let source = match self.provider.acquire() {
            Ok(source) => ScopedSource::new(source),
            Err(err) => {
                let err = SessionError::from(err);
                warn!("capture start failed: {err}");
                self.state_tx.send_modify(|s| s.start_failed(err.clone()));
                return Err(err);
            }
        };

        self.state_tx.send_modify(|s| s.running());

        let (stop_tx, stop_rx) = oneshot::channel();
        let session = Session {
            source,
            detector: self.detector.clone(),
            encoder: FrameEncoder::new(self.config.encoder),
            interval: self.config.interval,
            request_timeout: self.config.request_timeout,
            thresholds_rx: self.thresholds_tx.subscribe(),
            state_tx: self.state_tx.clone(),
        };
        let task = tokio::spawn(session.run(stop_rx));
        self.session = Some(SessionHandle { stop_tx, task });

        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            "capture loop running"
        );
        Ok(())
    }

    /// Stop capturing, release the device and clear the last result and error.
    pub async fn stop(&mut self) {
        let Some(SessionHandle { stop_tx, task }) = self.session.take() else {
            return;
        };

        if self.phase() == LoopPhase::Running {
            self.state_tx.send_modify(|s| s.begin_stop());
        }
        let _ = stop_tx.send(());
        if let Err(err) = task.await {
            if !err.is_cancelled() {
                error!("capture session task failed: {err}");
            }
        }
        self.state_tx.send_modify(|s| s.stopped());
        info!("capture loop stopped");
    }
}

impl<P: FrameSourceProvider> Drop for CaptureLoop<P> {
    fn drop(&mut self) {
        // Aborting drops the session future, and with it the scoped device.
        if let Some(session) = self.session.take() {
            session.task.abort();
        }
    }
}

/// Everything owned by one running session.
struct Session<S: FrameSource> {
    source: ScopedSource<S>,
    detector: Arc<dyn Detector>,
    encoder: FrameEncoder,
    interval: Duration,
    request_timeout: Duration,
    thresholds_rx: watch::Receiver<ThresholdConfig>,
    state_tx: Arc<watch::Sender<SessionState>>,
}

type Outcome = Result<DetectionResult, SessionError>;

impl<S: FrameSource> Session<S> {
    async fn run(mut self, mut stop_rx: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight: Option<JoinHandle<Outcome>> = None;
        let mut fatal: Option<SessionError> = None;

        loop {
            tokio::select! {
                biased;

                _ = &mut stop_rx => break,

                outcome = join_in_flight(&mut in_flight) => {
                    in_flight = None;
                    match &outcome {
                        Ok(result) => info!(
                            intensity = result.intensity.label(),
                            fog_detected = result.fog_detected,
                            laplacian_variance = result.laplacian_variance,
                            histogram_std_dev = result.histogram_std_dev,
                            "detection result"
                        ),
                        Err(err) => warn!("detection cycle failed: {err}"),
                    }
                    self.state_tx.send_modify(|s| s.complete(outcome));
                }

                _ = ticker.tick() => {
                    self.state_tx.send_modify(|s| s.tick());

                    if in_flight.is_some() {
                        debug!("previous submission still in flight, skipping tick");
                        self.state_tx.send_modify(|s| s.skipped_in_flight());
                        continue;
                    }

                    let frame = match self.source.current_frame() {
                        Ok(Some(frame)) => frame,
                        Ok(None) => {
                            debug!("no frame ready, skipping tick");
                            self.state_tx.send_modify(|s| s.skipped_no_frame());
                            continue;
                        }
                        Err(err) => {
                            error!(device = %self.source.name(), "capture failed: {err}");
                            fatal = Some(err.into());
                            break;
                        }
                    };

                    let Some(encoded) = self.encoder.encode(&frame) else {
                        self.state_tx.send_modify(|s| s.skipped_no_frame());
                        continue;
                    };
                    drop(frame);

                    let thresholds = *self.thresholds_rx.borrow();
                    self.state_tx.send_modify(|s| s.submitted());
                    in_flight = Some(self.spawn_submission(encoded, thresholds));
                }
            }
        }

        if let Some(task) = in_flight.take() {
            task.abort();
        }

        let Session {
            source, state_tx, ..
        } = self;
        drop(source);

        if let Some(err) = fatal {
            state_tx.send_modify(|s| s.terminated(err));
        }
    }

    fn spawn_submission(
        &self,
        frame: EncodedFrame,
        thresholds: ThresholdConfig,
    ) -> JoinHandle<Outcome> {
        let detector = self.detector.clone();
        let timeout = self.request_timeout;
        tokio::spawn(async move {
            match tokio::time::timeout(timeout, detector.submit(frame, thresholds)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(SessionError::Timeout(timeout)),
            }
        })
    }
}

/// Resolves with the outcome of the outstanding submission, or never when there is none.
///
/// A task that panicked still resolves its handle; that becomes a transport error so the
/// slot is freed and the next tick can submit again.
async fn join_in_flight(slot: &mut Option<JoinHandle<Outcome>>) -> Outcome {
    match slot {
        Some(task) => task.await.unwrap_or_else(|err| {
            Err(SessionError::Transport(format!("detection task failed: {err}")))
        }),
        None => std::future::pending().await,
    }
}
