use crate::config::ComfortConfig;
use crate::types::{FatigueSnapshot, FatigueState};
use log::info;

/// Hysteretic Normal -> Warning -> Critical fatigue tracker.
///
/// Escalation needs sustained evidence, de-escalation a clear margin; the
/// asymmetry biases toward caution. Single-writer: only the analysis task
/// calls `update`, everyone else gets a `FatigueSnapshot`.
///
/// Policy: any tick in Warning where the escalation condition does not hold
/// reverts to Normal and clears the sustain timer. Leaving Critical requires
/// the theta ratio to undercut the threshold by the full hysteresis band.
pub struct FatigueStateMachine {
    theta_threshold: f64,
    hysteresis_band: f64,
    sustain_duration: f64,
    motion_escalation_threshold: f64,
    state: FatigueState,
    last_transition: f64,
    warning_since: Option<f64>,
}

impl FatigueStateMachine {
    pub fn new(config: &ComfortConfig) -> Self {
        Self {
            theta_threshold: config.theta_threshold,
            hysteresis_band: config.hysteresis_band,
            sustain_duration: config.sustain_duration,
            motion_escalation_threshold: config.motion_escalation_threshold,
            state: FatigueState::Normal,
            last_transition: 0.0,
            warning_since: None,
        }
    }

    pub fn snapshot(&self) -> FatigueSnapshot {
        FatigueSnapshot {
            state: self.state,
            last_transition: self.last_transition,
        }
    }

    /// Evaluate one tick of evidence. Returns the (possibly unchanged)
    /// post-tick snapshot.
    pub fn update(&mut self, theta_ratio: f64, motion_intensity: f64, now: f64) -> FatigueSnapshot {
        let escalating = theta_ratio >= self.theta_threshold
            || motion_intensity >= self.motion_escalation_threshold;
        let clear_margin = theta_ratio < self.theta_threshold - self.hysteresis_band
            && motion_intensity < self.motion_escalation_threshold;

        let next = match self.state {
            FatigueState::Normal => {
                if escalating {
                    self.warning_since = Some(now);
                    FatigueState::Warning
                } else {
                    FatigueState::Normal
                }
            }
            FatigueState::Warning => {
                if !escalating {
                    self.warning_since = None;
                    FatigueState::Normal
                } else if self
                    .warning_since
                    .map_or(false, |since| now - since >= self.sustain_duration)
                {
                    FatigueState::Critical
                } else {
                    FatigueState::Warning
                }
            }
            FatigueState::Critical => {
                if clear_margin {
                    self.warning_since = None;
                    FatigueState::Normal
                } else {
                    FatigueState::Critical
                }
            }
        };

        if next != self.state {
            info!(
                "fatigue {} -> {} at t={now:.2} (theta={theta_ratio:.3}, motion={motion_intensity:.3})",
                self.state.as_str(),
                next.as_str()
            );
            self.state = next;
            self.last_transition = now;
        }
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> FatigueStateMachine {
        // Defaults: theta_threshold 0.40, band 0.05, sustain 30 s.
        FatigueStateMachine::new(&ComfortConfig::default())
    }

    #[test]
    fn starts_normal() {
        assert_eq!(machine().snapshot().state, FatigueState::Normal);
    }

    #[test]
    fn escalates_to_warning_on_first_threshold_crossing() {
        let mut m = machine();
        let snap = m.update(0.45, 0.0, 1.0);
        assert_eq!(snap.state, FatigueState::Warning);
        assert_eq!(snap.last_transition, 1.0);
    }

    #[test]
    fn sustained_theta_reaches_critical_after_sustain_duration() {
        let mut m = machine();
        let mut t = 0.0;
        while t < 30.5 {
            m.update(0.45, 0.0, t);
            t += 0.1;
        }
        assert_eq!(m.snapshot().state, FatigueState::Critical);
        // Entered Critical once 30 s in Warning had elapsed, not earlier.
        assert!(m.snapshot().last_transition >= 30.0);
    }

    #[test]
    fn below_sustain_duration_stays_warning() {
        let mut m = machine();
        for n in 0..100 {
            m.update(0.45, 0.0, n as f64 * 0.1);
        }
        assert_eq!(m.snapshot().state, FatigueState::Warning);
    }

    #[test]
    fn single_lapse_resets_sustain_and_reverts_to_normal() {
        let mut m = machine();
        for n in 0..200 {
            m.update(0.45, 0.0, n as f64 * 0.1);
        }
        assert_eq!(m.snapshot().state, FatigueState::Warning);
        let snap = m.update(0.30, 0.0, 20.0);
        assert_eq!(snap.state, FatigueState::Normal);
        // Re-escalation starts the sustain clock over.
        m.update(0.45, 0.0, 20.1);
        m.update(0.45, 0.0, 40.0);
        assert_eq!(m.snapshot().state, FatigueState::Warning);
        m.update(0.45, 0.0, 50.2);
        assert_eq!(m.snapshot().state, FatigueState::Critical);
    }

    #[test]
    fn critical_holds_inside_hysteresis_band() {
        let mut m = machine();
        let mut t = 0.0;
        while t < 31.0 {
            m.update(0.45, 0.0, t);
            t += 0.5;
        }
        assert_eq!(m.snapshot().state, FatigueState::Critical);
        // 0.38 is below threshold but inside the 0.05 band: hold Critical.
        assert_eq!(m.update(0.38, 0.0, 32.0).state, FatigueState::Critical);
        // 0.30 clears the band: release.
        assert_eq!(m.update(0.30, 0.0, 32.5).state, FatigueState::Normal);
    }

    #[test]
    fn high_motion_alone_escalates() {
        let mut m = machine();
        assert_eq!(m.update(0.1, 0.85, 1.0).state, FatigueState::Warning);
        // Theta may be clear, but high motion blocks Critical release too.
        let mut t = 1.0;
        while t < 32.0 {
            m.update(0.1, 0.85, t);
            t += 0.5;
        }
        assert_eq!(m.snapshot().state, FatigueState::Critical);
        assert_eq!(m.update(0.1, 0.85, 32.5).state, FatigueState::Critical);
        assert_eq!(m.update(0.1, 0.1, 33.0).state, FatigueState::Normal);
    }
}
