//! Closed-loop VR comfort controller.
//!
//! Turns two raw sensor streams (EEG samples and head-motion kinematics)
//! into safety-clamped rendering commands: a smoothed field-of-view value,
//! a render mode, effect toggles and foveation geometry. Device drivers and
//! the renderer itself are external; adapters push timestamped [`Sample`]s
//! in, a [`CommandSink`] takes [`FovCommand`]s out.

pub mod actuator;
pub mod buffer;
pub mod config;
pub mod error;
pub mod fatigue;
pub mod fov;
pub mod motion;
pub mod pipeline;
pub mod spectral;
pub mod types;

pub use actuator::{CommandSink, NullSink, RecordingSink, RenderModeActuator};
pub use buffer::SampleBuffer;
pub use config::ComfortConfig;
pub use error::{PipelineError, StreamKind};
pub use fatigue::FatigueStateMachine;
pub use fov::FovController;
pub use motion::MotionRiskScorer;
pub use pipeline::ComfortPipeline;
pub use spectral::SpectralAnalyzer;
pub use types::{
    BandPowerResult, EffectId, FatigueSnapshot, FatigueState, Foveation, FovCommand, MotionRisk,
    RenderMode, Sample, Telemetry,
};
