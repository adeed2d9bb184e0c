use serde::Serialize;
use std::collections::BTreeSet;

/// One timestamped multi-channel sensor reading. Immutable once buffered.
///
/// EEG samples carry 1-8 electrode values (microvolts). Motion samples carry
/// exactly three channels: angular velocity, angular acceleration, linear
/// acceleration, in that order (see the `MOTION_*` indices).
#[derive(Clone, Debug)]
pub struct Sample {
    /// Monotonic seconds. Adapters own unit conversion and channel order.
    pub timestamp: f64,
    pub channels: Vec<f32>,
}

pub const MOTION_ANGULAR_VELOCITY: usize = 0;
pub const MOTION_ANGULAR_ACCEL: usize = 1;
pub const MOTION_LINEAR_ACCEL: usize = 2;

impl Sample {
    pub fn new(timestamp: f64, channels: Vec<f32>) -> Self {
        Self { timestamp, channels }
    }

    pub fn motion(timestamp: f64, angular_vel: f32, angular_accel: f32, linear_accel: f32) -> Self {
        Self {
            timestamp,
            channels: vec![angular_vel, angular_accel, linear_accel],
        }
    }
}

/// Latest theta-band estimate. Recomputed each tick, never persisted.
#[derive(Clone, Copy, Debug)]
pub struct BandPowerResult {
    /// Theta power over total analysis-band power, in [0, 1].
    pub theta_ratio: f64,
    pub total_power: f64,
    pub computed_at: f64,
}

/// Smoothed kinematic risk for the current tick.
#[derive(Clone, Copy, Debug)]
pub struct MotionRisk {
    /// Worst-axis threshold ratio after EMA smoothing, in [0, 1].
    pub intensity: f64,
    pub angular_component: f64,
    pub linear_component: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FatigueState {
    Normal,
    Warning,
    Critical,
}

impl FatigueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FatigueState::Normal => "normal",
            FatigueState::Warning => "warning",
            FatigueState::Critical => "critical",
        }
    }
}

/// Immutable view of the state machine handed to readers (telemetry, tests).
/// Only the analysis task mutates the machine itself.
#[derive(Clone, Copy, Debug)]
pub struct FatigueSnapshot {
    pub state: FatigueState,
    pub last_transition: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RenderMode {
    HighFidelity,
    LowIntensity,
}

/// Closed set of comfort-relevant visual effects the renderer can toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum EffectId {
    MotionBlur,
    CameraShake,
    ChromaticAberration,
    Vignette,
}

impl EffectId {
    pub const ALL: [EffectId; 4] = [
        EffectId::MotionBlur,
        EffectId::CameraShake,
        EffectId::ChromaticAberration,
        EffectId::Vignette,
    ];
}

/// Three-tier foveation geometry. Radii are normalized to the half-diagonal
/// of the view, ordered high / mid / peripheral; peripheral always covers
/// the full view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Foveation {
    /// Gaze center in [0,1]^2, screen coordinates.
    pub center: (f64, f64),
    pub radii: [f64; 3],
}

impl Default for Foveation {
    fn default() -> Self {
        Self {
            center: (0.5, 0.5),
            radii: [0.3, 0.6, 1.0],
        }
    }
}

/// One actuation decision. Transient: rebuilt every tick, compared by value
/// by the actuator, then discarded.
#[derive(Clone, Debug, PartialEq)]
pub struct FovCommand {
    pub fov_degrees: f64,
    pub render_mode: RenderMode,
    pub disabled_effects: BTreeSet<EffectId>,
    pub foveation: Foveation,
}

/// Read-only snapshot for dashboards. One-way: never fed back into the loop.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Telemetry {
    pub state: FatigueState,
    pub theta_ratio: f64,
    pub motion_intensity: f64,
    pub fov_degrees: f64,
    pub eeg_stale: bool,
    pub motion_stale: bool,
}
