use crate::types::{EffectId, FatigueState, FovCommand, RenderMode};
use log::debug;
use std::collections::BTreeSet;

/// Transport seam to the rendering collaborator. The core guarantees command
/// content and cadence; what the sink does with it (local call, queue,
/// socket) is out of scope.
pub trait CommandSink {
    fn deliver(&mut self, command: &FovCommand);
}

/// Sink that drops everything; placeholder for wiring tests.
pub struct NullSink;

impl CommandSink for NullSink {
    fn deliver(&mut self, _command: &FovCommand) {}
}

/// Sink that retains delivered commands, for tests and offline analysis.
#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Vec<FovCommand>,
}

impl CommandSink for RecordingSink {
    fn deliver(&mut self, command: &FovCommand) {
        self.delivered.push(command.clone());
    }
}

/// Rate-limited, idempotent delivery of `FovCommand`s.
///
/// A changed command goes out immediately. An unchanged command is suppressed
/// until `heartbeat_interval` has passed (so a dead downstream is detected),
/// which also keeps identical traffic under one write per
/// `min_resend_interval`. At most one outbound write per tick.
pub struct RenderModeActuator<S: CommandSink> {
    sink: S,
    min_resend_interval: f64,
    heartbeat_interval: f64,
    last_command: Option<FovCommand>,
    last_sent_at: Option<f64>,
}

impl<S: CommandSink> RenderModeActuator<S> {
    pub fn new(sink: S, min_resend_interval: f64, heartbeat_interval: f64) -> Self {
        Self {
            sink,
            min_resend_interval,
            heartbeat_interval,
            last_command: None,
            last_sent_at: None,
        }
    }

    /// Last command actually delivered downstream. Survives shutdown: there
    /// is no pending work to flush.
    pub fn last_command(&self) -> Option<&FovCommand> {
        self.last_command.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Deliver `command` if cadence rules allow. Returns whether a transport
    /// write happened.
    pub fn actuate(&mut self, command: FovCommand, now: f64) -> bool {
        let unchanged = self.last_command.as_ref() == Some(&command);
        if unchanged {
            let elapsed = now - self.last_sent_at.unwrap_or(f64::NEG_INFINITY);
            // Resend only on heartbeat, which also keeps identical traffic
            // under the min-resend cap even if the two intervals are swapped.
            if elapsed < self.heartbeat_interval.max(self.min_resend_interval) {
                return false;
            }
        }
        debug!(
            "actuate: fov={:.1} mode={:?} effects_off={} at t={now:.2}",
            command.fov_degrees,
            command.render_mode,
            command.disabled_effects.len()
        );
        self.sink.deliver(&command);
        self.last_command = Some(command);
        self.last_sent_at = Some(now);
        true
    }
}

/// Render mode per fatigue state: only Critical drops out of high fidelity.
pub fn render_mode_for(state: FatigueState) -> RenderMode {
    match state {
        FatigueState::Normal | FatigueState::Warning => RenderMode::HighFidelity,
        FatigueState::Critical => RenderMode::LowIntensity,
    }
}

/// Effects switched off per fatigue state. Warning removes the strongest
/// vection drivers; Critical removes every comfort-relevant effect.
pub fn disabled_effects_for(state: FatigueState) -> BTreeSet<EffectId> {
    match state {
        FatigueState::Normal => BTreeSet::new(),
        FatigueState::Warning => [EffectId::MotionBlur, EffectId::CameraShake]
            .into_iter()
            .collect(),
        FatigueState::Critical => EffectId::ALL.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Foveation;

    fn command(fov: f64) -> FovCommand {
        FovCommand {
            fov_degrees: fov,
            render_mode: RenderMode::HighFidelity,
            disabled_effects: BTreeSet::new(),
            foveation: Foveation::default(),
        }
    }

    fn actuator() -> RenderModeActuator<RecordingSink> {
        RenderModeActuator::new(RecordingSink::default(), 0.25, 2.0)
    }

    #[test]
    fn first_command_is_delivered() {
        let mut a = actuator();
        assert!(a.actuate(command(100.0), 0.0));
        assert_eq!(a.sink().delivered.len(), 1);
        assert_eq!(a.last_command().unwrap().fov_degrees, 100.0);
    }

    #[test]
    fn identical_command_is_suppressed_within_resend_interval() {
        let mut a = actuator();
        assert!(a.actuate(command(100.0), 0.0));
        assert!(!a.actuate(command(100.0), 0.1));
        assert!(!a.actuate(command(100.0), 0.2));
        assert_eq!(a.sink().delivered.len(), 1);
    }

    #[test]
    fn changed_command_goes_out_immediately() {
        let mut a = actuator();
        assert!(a.actuate(command(100.0), 0.0));
        assert!(a.actuate(command(95.0), 0.05));
        assert_eq!(a.sink().delivered.len(), 2);
    }

    #[test]
    fn heartbeat_resends_unchanged_command() {
        let mut a = actuator();
        assert!(a.actuate(command(100.0), 0.0));
        assert!(!a.actuate(command(100.0), 1.9));
        assert!(a.actuate(command(100.0), 2.0));
        assert_eq!(a.sink().delivered.len(), 2);
        // Heartbeat clock restarts after each send.
        assert!(!a.actuate(command(100.0), 3.9));
        assert!(a.actuate(command(100.0), 4.1));
    }

    #[test]
    fn warning_disables_vection_heavy_effects() {
        let off = disabled_effects_for(FatigueState::Warning);
        assert!(off.contains(&EffectId::MotionBlur));
        assert!(off.contains(&EffectId::CameraShake));
        assert!(!off.contains(&EffectId::Vignette));
        assert_eq!(render_mode_for(FatigueState::Warning), RenderMode::HighFidelity);
    }

    #[test]
    fn critical_disables_everything_and_drops_fidelity() {
        assert_eq!(disabled_effects_for(FatigueState::Critical).len(), 4);
        assert_eq!(render_mode_for(FatigueState::Critical), RenderMode::LowIntensity);
        assert!(disabled_effects_for(FatigueState::Normal).is_empty());
    }
}
