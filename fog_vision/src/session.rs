// THEORY:
// `SessionState` is everything a display needs to know about one capture session: which
// phase the loop is in, the thresholds in use, the latest result or error, and
// whether a submission is in flight. It is a plain value. The capture loop owns the
// only writer and publishes every change through a `watch` channel, so readers always
// see a consistent snapshot.
//
// State only moves through the named transition methods below. Each one encodes one
// rule of the loop:
//   Idle --begin_start--> Starting --running--> Running --begin_stop--> Stopping --stopped--> Idle
//   Starting --start_failed--> Idle          Running --terminated--> Idle
// A published result always clears the previous error and vice versa.

use crate::error::SessionError;
use crate::pipeline::{DetectionResult, ThresholdConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopPhase {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
}

/// Counters for one session. Reset on every start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleStats {
    /// Timer ticks observed while running.
    pub ticks: u64,
    /// Frames handed to the detector.
    pub submitted: u64,
    /// Submissions that produced a result.
    pub completed: u64,
    /// Submissions that produced an error.
    pub failed: u64,
    /// Ticks dropped because a submission was still outstanding.
    pub skipped_in_flight: u64,
    /// Ticks dropped because no encodable frame was available.
    pub skipped_no_frame: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub phase: LoopPhase,
    pub thresholds: ThresholdConfig,
    pub last_result: Option<DetectionResult>,
    pub last_error: Option<SessionError>,
    pub in_flight: bool,
    pub stats: CycleStats,
}

impl SessionState {
    pub fn new(thresholds: ThresholdConfig) -> Self {
        Self {
            thresholds,
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == LoopPhase::Running
    }

    /// Idle → Starting. Fails unless the loop is idle.
    pub fn begin_start(&mut self) -> Result<(), SessionError> {
        if self.phase != LoopPhase::Idle {
            return Err(SessionError::AlreadyRunning);
        }
        self.phase = LoopPhase::Starting;
        self.last_error = None;
        self.last_result = None;
        self.in_flight = false;
        self.stats = CycleStats::default();
        Ok(())
    }

    /// Starting → Idle, surfacing why the device could not be acquired.
    pub fn start_failed(&mut self, error: SessionError) {
        self.phase = LoopPhase::Idle;
        self.last_error = Some(error);
    }

    /// Starting → Running.
    pub fn running(&mut self) {
        self.phase = LoopPhase::Running;
    }

    pub fn tick(&mut self) {
        self.stats.ticks += 1;
    }

    pub fn skipped_in_flight(&mut self) {
        self.stats.skipped_in_flight += 1;
    }

    pub fn skipped_no_frame(&mut self) {
        self.stats.skipped_no_frame += 1;
    }

    pub fn submitted(&mut self) {
        self.in_flight = true;
        self.stats.submitted += 1;
    }

    /// Apply the outcome of the outstanding submission.
    pub fn complete(&mut self, outcome: Result<DetectionResult, SessionError>) {
        self.in_flight = false;
        match outcome {
            Ok(result) => {
                self.stats.completed += 1;
                self.last_result = Some(result);
                self.last_error = None;
            }
            Err(error) => {
                self.stats.failed += 1;
                self.last_result = None;
                self.last_error = Some(error);
            }
        }
    }

    /// Running → Idle after a fatal capture error.
    pub fn terminated(&mut self, error: SessionError) {
        self.phase = LoopPhase::Idle;
        self.in_flight = false;
        self.last_result = None;
        self.last_error = Some(error);
    }

    /// Running → Stopping.
    pub fn begin_stop(&mut self) {
        self.phase = LoopPhase::Stopping;
    }

    /// Stopping → Idle; nothing from the old session survives.
    pub fn stopped(&mut self) {
        self.phase = LoopPhase::Idle;
        self.in_flight = false;
        self.last_result = None;
        self.last_error = None;
    }
}
