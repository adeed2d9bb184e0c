use crate::config::ComfortConfig;
use crate::error::PipelineError;
use crate::types::{FatigueState, Foveation, MotionRisk};

/// Risk -> FOV-scale control points. Monotone non-increasing; linear
/// interpolation between anchors can never overshoot the end values.
const SCALE_CURVE: [(f64, f64); 4] = [(0.0, 1.0), (0.3, 0.9), (0.6, 0.75), (1.0, 0.6)];
/// Floor of the scale curve; Critical forces the scale down to it.
const SCALE_FLOOR: f64 = 0.6;
/// Low-pass weight on the previous output.
const SMOOTHING: f64 = 0.8;
/// Foveation tier radii at scale 1.0 (high, mid, peripheral).
const TIER_RADII: [f64; 3] = [0.3, 0.6, 1.0];

/// Computes the smoothed field-of-view output and foveation geometry.
///
/// The piecewise curve maps motion intensity to a scale factor; Critical
/// fatigue overrides it down to the floor (physiology beats kinematics).
/// The result is clamped into the configured bounds and low-pass filtered
/// against the previous tick so the user never sees a jump.
pub struct FovController {
    base_fov: f64,
    min_fov: f64,
    max_fov: f64,
    current_fov: f64,
    gaze_center: (f64, f64),
}

impl FovController {
    pub fn new(config: &ComfortConfig) -> Self {
        Self {
            base_fov: config.base_fov,
            min_fov: config.min_fov,
            max_fov: config.max_fov,
            current_fov: config.base_fov,
            gaze_center: (0.5, 0.5),
        }
    }

    pub fn fov_degrees(&self) -> f64 {
        self.current_fov
    }

    /// One control step: returns the new smoothed FOV in degrees, always
    /// within `[min_fov, max_fov]`.
    pub fn compute(&mut self, state: FatigueState, risk: &MotionRisk) -> f64 {
        let mut scale = scale_for(risk.intensity);
        if state == FatigueState::Critical {
            scale = scale.min(SCALE_FLOOR);
        }
        let target = (self.base_fov * scale).clamp(self.min_fov, self.max_fov);
        self.current_fov = SMOOTHING * self.current_fov + (1.0 - SMOOTHING) * target;
        self.current_fov = self.current_fov.clamp(self.min_fov, self.max_fov);
        self.current_fov
    }

    /// Externally requested FOV (e.g. a user preference). Out-of-range values
    /// are rejected, not clamped.
    pub fn set_fov(&mut self, fov_degrees: f64) -> Result<(), PipelineError> {
        if !fov_degrees.is_finite() || fov_degrees < self.min_fov || fov_degrees > self.max_fov {
            return Err(PipelineError::FovOutOfRange {
                requested: fov_degrees,
                min: self.min_fov,
                max: self.max_fov,
            });
        }
        self.current_fov = fov_degrees;
        Ok(())
    }

    /// Latest gaze point from the (external) eye-tracking adapter, clamped
    /// into the unit square.
    pub fn set_gaze_center(&mut self, x: f64, y: f64) {
        self.gaze_center = (x.clamp(0.0, 1.0), y.clamp(0.0, 1.0));
    }

    /// Three-tier foveation geometry for the current output: inner tiers
    /// tighten as the FOV narrows, the peripheral tier always covers the view.
    pub fn foveation(&self) -> Foveation {
        let scale = self.current_fov / self.base_fov;
        Foveation {
            center: self.gaze_center,
            radii: [TIER_RADII[0] * scale, TIER_RADII[1] * scale, TIER_RADII[2]],
        }
    }

    /// Hard fail-safe: snap to the most conservative output, bypassing the
    /// low-pass so a stale stream narrows the view within one tick.
    pub fn force_minimum(&mut self) -> f64 {
        self.current_fov = self.min_fov;
        self.current_fov
    }
}

fn scale_for(intensity: f64) -> f64 {
    let x = intensity.clamp(0.0, 1.0);
    for pair in SCALE_CURVE.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x <= x1 {
            return y0 + (y1 - y0) * (x - x0) / (x1 - x0);
        }
    }
    SCALE_FLOOR
}

#[cfg(test)]
mod tests {
    use super::*;

    fn risk(intensity: f64) -> MotionRisk {
        MotionRisk {
            intensity,
            angular_component: intensity,
            linear_component: 0.0,
        }
    }

    fn controller() -> FovController {
        // Defaults: base 100, min 60, max 110.
        FovController::new(&ComfortConfig::default())
    }

    #[test]
    fn curve_hits_anchor_points() {
        for (x, y) in SCALE_CURVE {
            assert!((scale_for(x) - y).abs() < 1e-12);
        }
        assert!((scale_for(0.45) - 0.825).abs() < 1e-12);
    }

    #[test]
    fn curve_is_monotone_and_bounded() {
        let mut prev = f64::INFINITY;
        for n in 0..=100 {
            let s = scale_for(n as f64 / 100.0);
            assert!(s <= prev + 1e-12);
            assert!((SCALE_FLOOR..=1.0).contains(&s));
            prev = s;
        }
        // Out-of-range inputs clamp instead of extrapolating.
        assert_eq!(scale_for(-1.0), 1.0);
        assert_eq!(scale_for(2.0), SCALE_FLOOR);
    }

    #[test]
    fn output_stays_within_bounds() {
        let mut c = controller();
        for n in 0..200 {
            let fov = c.compute(FatigueState::Normal, &risk((n % 11) as f64 / 10.0));
            assert!((60.0..=110.0).contains(&fov));
        }
    }

    #[test]
    fn critical_forces_scale_to_floor() {
        let mut c = controller();
        // Zero motion, but Critical fatigue: converge toward base * 0.6.
        for _ in 0..200 {
            c.compute(FatigueState::Critical, &risk(0.0));
        }
        assert!((c.fov_degrees() - 60.0).abs() < 0.5);
    }

    #[test]
    fn recovery_rises_strictly_without_overshoot() {
        let mut c = controller();
        for _ in 0..100 {
            c.compute(FatigueState::Normal, &risk(0.9));
        }
        let mut prev = c.fov_degrees();
        assert!(prev < 70.0);
        for _ in 0..100 {
            let fov = c.compute(FatigueState::Normal, &risk(0.0));
            assert!(fov > prev - 1e-9, "must not dip during recovery");
            assert!(fov <= 100.0 + 1e-9, "must not overshoot base fov");
            prev = fov;
        }
        assert!((prev - 100.0).abs() < 1.0);
    }

    #[test]
    fn smoothing_limits_per_tick_change() {
        let mut c = controller();
        let before = c.fov_degrees();
        let after = c.compute(FatigueState::Normal, &risk(1.0));
        // One tick moves at most 20 % of the way to the target.
        assert!((before - after).abs() <= 0.2 * (before - 60.0) + 1e-9);
    }

    #[test]
    fn set_fov_rejects_out_of_range() {
        let mut c = controller();
        assert!(matches!(
            c.set_fov(120.0),
            Err(PipelineError::FovOutOfRange { .. })
        ));
        assert!(c.set_fov(f64::NAN).is_err());
        let before = c.fov_degrees();
        assert_eq!(c.fov_degrees(), before);
        c.set_fov(80.0).unwrap();
        assert_eq!(c.fov_degrees(), 80.0);
    }

    #[test]
    fn foveation_tightens_with_narrow_fov() {
        let mut c = controller();
        let wide = c.foveation();
        for _ in 0..100 {
            c.compute(FatigueState::Critical, &risk(1.0));
        }
        let narrow = c.foveation();
        assert!(narrow.radii[0] < wide.radii[0]);
        assert!(narrow.radii[1] < wide.radii[1]);
        assert_eq!(narrow.radii[2], 1.0);
        assert_eq!(narrow.center, (0.5, 0.5));
    }

    #[test]
    fn gaze_center_is_clamped_to_unit_square() {
        let mut c = controller();
        c.set_gaze_center(1.5, -0.2);
        assert_eq!(c.foveation().center, (1.0, 0.0));
    }

    #[test]
    fn force_minimum_bypasses_smoothing() {
        let mut c = controller();
        assert_eq!(c.force_minimum(), 60.0);
        assert_eq!(c.fov_degrees(), 60.0);
    }
}
