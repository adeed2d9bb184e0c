use crate::config::ComfortConfig;
use crate::error::PipelineError;
use crate::types::{
    MotionRisk, Sample, MOTION_ANGULAR_ACCEL, MOTION_ANGULAR_VELOCITY, MOTION_LINEAR_ACCEL,
};

/// Turns head-motion windows into a bounded, smoothed risk intensity.
///
/// Each sample scores `max(|w|/vel_thr, |a|/acc_thr, |lin|/lin_thr)` clamped
/// to [0, 1]: the worst axis dominates, so one violently exceeded threshold
/// cannot be averaged away. An EMA whose coefficient scales with the actual
/// inter-sample interval smooths the sequence so a single spike cannot drive
/// actuation on its own.
pub struct MotionRiskScorer {
    velocity_threshold: f64,
    accel_threshold: f64,
    linear_accel_threshold: f64,
    base_alpha: f64,
    nominal_frame_time: f64,
    smoothed: Option<f64>,
    last_timestamp: Option<f64>,
}

impl MotionRiskScorer {
    pub fn new(config: &ComfortConfig) -> Self {
        Self {
            velocity_threshold: config.velocity_threshold,
            accel_threshold: config.accel_threshold,
            linear_accel_threshold: config.linear_accel_threshold,
            base_alpha: config.ema_base_alpha,
            nominal_frame_time: config.nominal_frame_time,
            smoothed: None,
            last_timestamp: None,
        }
    }

    /// Score a motion window. Only samples newer than the last scored one
    /// advance the EMA, so overlapping windows across ticks are safe.
    pub fn score(&mut self, window: &[Sample]) -> Result<MotionRisk, PipelineError> {
        let fresh: Vec<&Sample> = window
            .iter()
            .filter(|s| self.last_timestamp.map_or(true, |t| s.timestamp > t))
            .collect();
        if fresh.is_empty() {
            return match self.smoothed {
                // Nothing new this tick: hold the current estimate.
                Some(intensity) => Ok(self.risk_from(intensity, window.last())),
                None => Err(PipelineError::InsufficientData { needed: 1, got: 0 }),
            };
        }

        for sample in &fresh {
            let raw = self.raw_intensity(sample);
            let dt = self
                .last_timestamp
                .map(|t| (sample.timestamp - t).max(0.0))
                .unwrap_or(self.nominal_frame_time);
            let alpha = (self.base_alpha * dt / self.nominal_frame_time).clamp(0.0, 1.0);
            self.smoothed = Some(match self.smoothed {
                Some(prev) => prev + alpha * (raw - prev),
                None => raw,
            });
            self.last_timestamp = Some(sample.timestamp);
        }

        let intensity = self.smoothed.unwrap_or(0.0);
        Ok(self.risk_from(intensity, fresh.last().copied()))
    }

    fn raw_intensity(&self, sample: &Sample) -> f64 {
        let (angular, linear) = self.axis_ratios(sample);
        angular.max(linear)
    }

    fn axis_ratios(&self, sample: &Sample) -> (f64, f64) {
        let channel = |idx: usize| f64::from(sample.channels.get(idx).copied().unwrap_or(0.0));
        let vel = (channel(MOTION_ANGULAR_VELOCITY).abs() / self.velocity_threshold).clamp(0.0, 1.0);
        let acc = (channel(MOTION_ANGULAR_ACCEL).abs() / self.accel_threshold).clamp(0.0, 1.0);
        let lin =
            (channel(MOTION_LINEAR_ACCEL).abs() / self.linear_accel_threshold).clamp(0.0, 1.0);
        (vel.max(acc), lin)
    }

    fn risk_from(&self, intensity: f64, latest: Option<&Sample>) -> MotionRisk {
        let (angular, linear) = latest
            .map(|s| self.axis_ratios(s))
            .unwrap_or((0.0, 0.0));
        MotionRisk {
            intensity: intensity.clamp(0.0, 1.0),
            angular_component: angular,
            linear_component: linear,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> MotionRiskScorer {
        MotionRiskScorer::new(&ComfortConfig::default())
    }

    fn still(t: f64) -> Sample {
        Sample::motion(t, 0.0, 0.0, 0.0)
    }

    #[test]
    fn empty_window_before_first_sample_is_insufficient() {
        let mut s = scorer();
        assert!(matches!(
            s.score(&[]),
            Err(PipelineError::InsufficientData { .. })
        ));
    }

    #[test]
    fn empty_window_after_data_holds_estimate() {
        let mut s = scorer();
        let first = s.score(&[Sample::motion(0.0, 3.5, 0.0, 0.0)]).unwrap();
        let held = s.score(&[]).unwrap();
        assert_eq!(held.intensity, first.intensity);
    }

    #[test]
    fn worst_axis_dominates() {
        let mut s = scorer();
        // Angular velocity at threshold, everything else calm.
        let risk = s.score(&[Sample::motion(0.0, 3.5, 0.1, 0.1)]).unwrap();
        assert!((risk.intensity - 1.0).abs() < 1e-9);
        assert!((risk.angular_component - 1.0).abs() < 1e-9);
        assert!(risk.linear_component < 0.1);
    }

    #[test]
    fn intensity_is_clamped_to_unit_range() {
        let mut s = scorer();
        let risk = s.score(&[Sample::motion(0.0, 100.0, 100.0, 100.0)]).unwrap();
        assert_eq!(risk.intensity, 1.0);
    }

    #[test]
    fn rising_velocity_gives_non_decreasing_intensity() {
        let mut s = scorer();
        let mut previous = 0.0;
        for n in 0..50 {
            let t = n as f64 * 0.011;
            let vel = 0.07 * n as f32;
            let risk = s.score(&[Sample::motion(t, vel, 0.0, 0.0)]).unwrap();
            assert!(
                risk.intensity >= previous - 1e-12,
                "intensity dropped at step {n}: {} -> {}",
                previous,
                risk.intensity
            );
            previous = risk.intensity;
        }
        assert!(previous > 0.5);
    }

    #[test]
    fn single_spike_is_damped() {
        let mut s = scorer();
        for n in 0..20 {
            s.score(&[still(n as f64 * 0.011)]).unwrap();
        }
        let spike = s.score(&[Sample::motion(0.220, 10.0, 0.0, 0.0)]).unwrap();
        assert!(
            spike.intensity < 0.5,
            "one spike should not saturate the EMA, got {}",
            spike.intensity
        );
    }

    #[test]
    fn alpha_scales_with_sample_interval() {
        // Same spike, but delivered after a long gap: the EMA must weigh it
        // more because more time has passed.
        let mut slow = scorer();
        slow.score(&[still(0.0)]).unwrap();
        let after_gap = slow.score(&[Sample::motion(0.1, 3.5, 0.0, 0.0)]).unwrap();

        let mut fast = scorer();
        fast.score(&[still(0.0)]).unwrap();
        let after_frame = fast.score(&[Sample::motion(0.011, 3.5, 0.0, 0.0)]).unwrap();

        assert!(after_gap.intensity > after_frame.intensity);
        // A 100 ms gap at base_alpha 0.3 saturates the clamp.
        assert!((after_gap.intensity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn already_scored_samples_do_not_advance_ema() {
        let mut s = scorer();
        let window = [Sample::motion(0.0, 3.5, 0.0, 0.0)];
        let first = s.score(&window).unwrap();
        let again = s.score(&window).unwrap();
        assert_eq!(first.intensity, again.intensity);
    }
}
