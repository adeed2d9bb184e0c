use crate::error::PipelineError;
use crate::types::Sample;
use std::collections::VecDeque;

/// Bounded, time-ordered ring of recent samples for one sensor stream.
///
/// Capacity is `sample_rate * window_seconds`; pushing onto a full ring
/// evicts the oldest entry. Entries are strictly non-decreasing in
/// timestamp; `push` is the only mutator and rejects anything that would
/// break the ordering.
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
    sample_rate: f64,
}

impl SampleBuffer {
    pub fn new(sample_rate: f64, window_seconds: f64) -> Result<Self, PipelineError> {
        if !(sample_rate > 0.0) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "buffer sample rate must be positive, got {sample_rate}"
            )));
        }
        let capacity = (sample_rate * window_seconds).ceil().max(1.0) as usize;
        Ok(Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the newest stored sample; feeds staleness detection.
    pub fn last_timestamp(&self) -> Option<f64> {
        self.samples.back().map(|s| s.timestamp)
    }

    /// Append one sample, evicting the oldest when full. An out-of-order
    /// timestamp is an error the caller drops and logs, never a crash.
    pub fn push(&mut self, sample: Sample) -> Result<(), PipelineError> {
        if let Some(last) = self.last_timestamp() {
            if sample.timestamp < last {
                return Err(PipelineError::OutOfOrderSample {
                    last,
                    offered: sample.timestamp,
                });
            }
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        Ok(())
    }

    /// Copy-on-read snapshot of samples with timestamps in
    /// `[now - duration, now]`. Empty when nothing qualifies; callers treat
    /// "not enough data" as a first-class condition, not a failure.
    pub fn window(&self, now: f64, duration: f64) -> Vec<Sample> {
        let cutoff = now - duration;
        self.samples
            .iter()
            .filter(|s| s.timestamp >= cutoff && s.timestamp <= now)
            .cloned()
            .collect()
    }
}
