use crate::error::PipelineError;
use serde::Deserialize;
use std::path::Path;

/// Static controller configuration, loaded once at startup. No hot reload.
///
/// Every field has a default tuned for a 250 Hz EEG headset and a 90 Hz
/// head tracker; a JSON document may override any subset of keys.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComfortConfig {
    /// EEG samples per second.
    pub sampling_rate_eeg: f64,
    /// Motion samples per second.
    pub sampling_rate_motion: f64,
    /// Theta ratio at or above which fatigue escalation begins (0-1).
    pub theta_threshold: f64,
    /// Seconds the escalation condition must hold in Warning before Critical.
    pub sustain_duration: f64,
    /// Angular velocity mapping to intensity 1.0 (rad/s).
    pub velocity_threshold: f64,
    /// Angular acceleration mapping to intensity 1.0 (rad/s^2).
    pub accel_threshold: f64,
    /// Linear acceleration mapping to intensity 1.0 (m/s^2).
    pub linear_accel_threshold: f64,
    /// Smoothed motion intensity that alone escalates fatigue.
    pub motion_escalation_threshold: f64,
    pub base_fov: f64,
    pub min_fov: f64,
    pub max_fov: f64,
    /// De-escalation margin below `theta_threshold` required to leave Critical.
    pub hysteresis_band: f64,
    /// Analysis tick period in seconds.
    pub tick_interval: f64,
    /// Seconds of EEG history kept for spectral analysis.
    pub eeg_window_seconds: f64,
    /// Seconds of motion history kept for risk scoring.
    pub motion_window_seconds: f64,
    /// EMA coefficient at the nominal frame time.
    pub ema_base_alpha: f64,
    /// Reference inter-tick interval for EMA scaling (seconds).
    pub nominal_frame_time: f64,
    /// Minimum spacing between identical outbound commands (seconds).
    pub min_resend_interval: f64,
    /// Maximum silence on the actuation channel (seconds).
    pub heartbeat_interval: f64,
    /// Bounded per-stream channel capacity (samples).
    pub channel_capacity: usize,
}

impl Default for ComfortConfig {
    fn default() -> Self {
        Self {
            sampling_rate_eeg: 250.0,
            sampling_rate_motion: 90.0,
            theta_threshold: 0.40,
            sustain_duration: 30.0,
            velocity_threshold: 3.5,
            accel_threshold: 12.0,
            linear_accel_threshold: 8.0,
            motion_escalation_threshold: 0.8,
            base_fov: 100.0,
            min_fov: 60.0,
            max_fov: 110.0,
            hysteresis_band: 0.05,
            tick_interval: 0.1,
            eeg_window_seconds: 4.0,
            motion_window_seconds: 1.0,
            ema_base_alpha: 0.3,
            nominal_frame_time: 0.011,
            min_resend_interval: 0.25,
            heartbeat_interval: 2.0,
            channel_capacity: 1024,
        }
    }
}

impl ComfortConfig {
    /// Load and validate a JSON config document. Any violation is fatal and
    /// reported before anything is applied.
    pub fn from_json(text: &str) -> Result<Self, PipelineError> {
        let config: ComfortConfig = serde_json::from_str(text)
            .map_err(|e| PipelineError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::InvalidConfiguration(format!("{}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let positive = [
            ("sampling_rate_eeg", self.sampling_rate_eeg),
            ("sampling_rate_motion", self.sampling_rate_motion),
            ("sustain_duration", self.sustain_duration),
            ("velocity_threshold", self.velocity_threshold),
            ("accel_threshold", self.accel_threshold),
            ("linear_accel_threshold", self.linear_accel_threshold),
            ("tick_interval", self.tick_interval),
            ("eeg_window_seconds", self.eeg_window_seconds),
            ("motion_window_seconds", self.motion_window_seconds),
            ("nominal_frame_time", self.nominal_frame_time),
            ("min_resend_interval", self.min_resend_interval),
            ("heartbeat_interval", self.heartbeat_interval),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(PipelineError::InvalidConfiguration(format!(
                    "{name} must be a positive finite number, got {value}"
                )));
            }
        }
        if !(self.theta_threshold > 0.0 && self.theta_threshold < 1.0) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "theta_threshold must lie in (0, 1), got {}",
                self.theta_threshold
            )));
        }
        if !(self.hysteresis_band >= 0.0 && self.hysteresis_band < self.theta_threshold) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "hysteresis_band must lie in [0, theta_threshold), got {}",
                self.hysteresis_band
            )));
        }
        if !(self.motion_escalation_threshold > 0.0 && self.motion_escalation_threshold <= 1.0) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "motion_escalation_threshold must lie in (0, 1], got {}",
                self.motion_escalation_threshold
            )));
        }
        if !(self.ema_base_alpha > 0.0 && self.ema_base_alpha <= 1.0) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "ema_base_alpha must lie in (0, 1], got {}",
                self.ema_base_alpha
            )));
        }
        if !(self.min_fov < self.base_fov && self.base_fov <= self.max_fov) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "fov bounds must satisfy min < base <= max, got min={} base={} max={}",
                self.min_fov, self.base_fov, self.max_fov
            )));
        }
        if self.min_fov <= 0.0 {
            return Err(PipelineError::InvalidConfiguration(format!(
                "min_fov must be positive, got {}",
                self.min_fov
            )));
        }
        if self.heartbeat_interval < self.min_resend_interval {
            return Err(PipelineError::InvalidConfiguration(format!(
                "heartbeat_interval ({}) must not be shorter than min_resend_interval ({})",
                self.heartbeat_interval, self.min_resend_interval
            )));
        }
        if self.channel_capacity == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "channel_capacity must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// A stream is stale once silent for twice its expected sample interval.
    pub fn stale_after(&self, sampling_rate: f64) -> f64 {
        2.0 / sampling_rate
    }
}
