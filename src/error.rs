use thiserror::Error;

/// Names a sensor stream in errors and staleness reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Eeg,
    Motion,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Eeg => write!(f, "eeg"),
            StreamKind::Motion => write!(f, "motion"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Not enough samples buffered yet. Benign: callers hold the last known
    /// good output instead of actuating on a partial window.
    #[error("insufficient data: need {needed} samples, have {got}")]
    InsufficientData { needed: usize, got: usize },

    /// A sample arrived with a timestamp behind the buffer head. The sample
    /// is dropped; the stream keeps running.
    #[error("out-of-order sample: last stored t={last:.4}, offered t={offered:.4}")]
    OutOfOrderSample { last: f64, offered: f64 },

    /// A stream stopped delivering within its timeout. Triggers the
    /// fail-safe command, never a stall.
    #[error("stale {stream} stream: last sample at t={last_seen:.3}, now t={now:.3}")]
    StaleStream {
        stream: StreamKind,
        last_seen: f64,
        now: f64,
    },

    /// Rejected at startup; never partially applied.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An externally requested FOV outside the configured bounds. Rejected,
    /// not clamped.
    #[error("fov {requested:.1} deg outside [{min:.1}, {max:.1}]")]
    FovOutOfRange { requested: f64, min: f64, max: f64 },
}

impl PipelineError {
    /// Benign errors degrade the tick output; the rest abort startup or an
    /// external request.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            PipelineError::InsufficientData { .. }
                | PipelineError::OutOfOrderSample { .. }
                | PipelineError::StaleStream { .. }
        )
    }
}
