use crate::actuator::{disabled_effects_for, render_mode_for, CommandSink, RenderModeActuator};
use crate::buffer::SampleBuffer;
use crate::config::ComfortConfig;
use crate::error::{PipelineError, StreamKind};
use crate::fatigue::FatigueStateMachine;
use crate::fov::FovController;
use crate::motion::MotionRiskScorer;
use crate::spectral::SpectralAnalyzer;
use crate::types::{
    BandPowerResult, FatigueState, FovCommand, MotionRisk, RenderMode, Sample, Telemetry,
};
use log::{info, warn};
use std::collections::BTreeSet;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError};

/// The closed control loop: sensor buffers in, one `FovCommand` out per tick.
///
/// Producers push into bounded channels; `tick` drains them into the ring
/// buffers, runs analysis -> risk -> fatigue -> FOV in sequence and hands the
/// result to the actuator. Every per-tick error degrades into a defined
/// output; nothing panics, nothing blocks:
/// - `InsufficientData` holds the last known good output;
/// - `OutOfOrderSample` drops the sample and logs it;
/// - a stale stream forces the most conservative command (minimum FOV,
///   low-intensity rendering, all effects off), because missing data cannot
///   be assumed benign.
pub struct ComfortPipeline<S: CommandSink> {
    config: ComfortConfig,
    eeg_rx: Receiver<Sample>,
    motion_rx: Receiver<Sample>,
    eeg_tx: SyncSender<Sample>,
    motion_tx: SyncSender<Sample>,
    eeg_buffer: SampleBuffer,
    motion_buffer: SampleBuffer,
    analyzer: SpectralAnalyzer,
    scorer: MotionRiskScorer,
    fatigue: FatigueStateMachine,
    controller: FovController,
    actuator: RenderModeActuator<S>,
    last_band: Option<BandPowerResult>,
    last_risk: Option<MotionRisk>,
    started_at: Option<f64>,
    dropped_samples: u64,
    telemetry: Telemetry,
}

impl<S: CommandSink> ComfortPipeline<S> {
    pub fn new(config: ComfortConfig, sink: S) -> Result<Self, PipelineError> {
        config.validate()?;
        let (eeg_tx, eeg_rx) = sync_channel(config.channel_capacity);
        let (motion_tx, motion_rx) = sync_channel(config.channel_capacity);
        let telemetry = Telemetry {
            state: FatigueState::Normal,
            theta_ratio: 0.0,
            motion_intensity: 0.0,
            fov_degrees: config.base_fov,
            eeg_stale: false,
            motion_stale: false,
        };
        Ok(Self {
            eeg_buffer: SampleBuffer::new(config.sampling_rate_eeg, config.eeg_window_seconds)?,
            motion_buffer: SampleBuffer::new(
                config.sampling_rate_motion,
                config.motion_window_seconds,
            )?,
            analyzer: SpectralAnalyzer::new(config.sampling_rate_eeg),
            scorer: MotionRiskScorer::new(&config),
            fatigue: FatigueStateMachine::new(&config),
            controller: FovController::new(&config),
            actuator: RenderModeActuator::new(
                sink,
                config.min_resend_interval,
                config.heartbeat_interval,
            ),
            last_band: None,
            last_risk: None,
            started_at: None,
            dropped_samples: 0,
            telemetry,
            eeg_rx,
            motion_rx,
            eeg_tx,
            motion_tx,
            config,
        })
    }

    /// Bounded producer handle for the EEG adapter thread. Backpressure comes
    /// from the channel capacity, not from the analysis task.
    pub fn eeg_sender(&self) -> SyncSender<Sample> {
        self.eeg_tx.clone()
    }

    pub fn motion_sender(&self) -> SyncSender<Sample> {
        self.motion_tx.clone()
    }

    /// Direct push paths, used by in-process adapters and tests.
    pub fn ingest_eeg(&mut self, sample: Sample) {
        Self::ingest(&mut self.eeg_buffer, &mut self.dropped_samples, StreamKind::Eeg, sample);
    }

    pub fn ingest_motion(&mut self, sample: Sample) {
        Self::ingest(
            &mut self.motion_buffer,
            &mut self.dropped_samples,
            StreamKind::Motion,
            sample,
        );
    }

    fn ingest(buffer: &mut SampleBuffer, dropped: &mut u64, stream: StreamKind, sample: Sample) {
        if let Err(err) = buffer.push(sample) {
            *dropped += 1;
            warn!("dropping {stream} sample: {err}");
        }
    }

    /// Samples dropped so far for arriving out of order.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples
    }

    /// Read-only dashboard snapshot. Never an input to the loop.
    pub fn telemetry(&self) -> Telemetry {
        self.telemetry
    }

    /// Forward an externally requested FOV override; out-of-range values are
    /// rejected untouched.
    pub fn set_fov(&mut self, fov_degrees: f64) -> Result<(), PipelineError> {
        self.controller.set_fov(fov_degrees)
    }

    /// Latest gaze point from the eye-tracking adapter.
    pub fn set_gaze_center(&mut self, x: f64, y: f64) {
        self.controller.set_gaze_center(x, y);
    }

    /// Run one analysis tick at monotonic time `now` (seconds). Emits at most
    /// one command through the sink and returns the post-tick telemetry.
    pub fn tick(&mut self, now: f64) -> Telemetry {
        self.started_at.get_or_insert(now);
        self.drain_channels();

        if let Some(stale) = self.stale_stream(now) {
            warn!("fail-safe engaged: {stale}");
            return self.fail_safe(now);
        }

        let eeg_window = self.eeg_buffer.window(now, self.config.eeg_window_seconds);
        let motion_window = self
            .motion_buffer
            .window(now, self.config.motion_window_seconds);

        let band = match self.analyzer.analyze(&eeg_window, now) {
            Ok(result) => {
                self.last_band = Some(result);
                Some(result)
            }
            Err(err) => {
                // Benign warm-up gap: fall back to the previous estimate.
                info!("eeg analysis: {err}");
                self.last_band
            }
        };
        let risk = match self.scorer.score(&motion_window) {
            Ok(risk) => {
                self.last_risk = Some(risk);
                Some(risk)
            }
            Err(err) => {
                info!("motion scoring: {err}");
                self.last_risk
            }
        };

        let (Some(band), Some(risk)) = (band, risk) else {
            // No answer yet from a stage and no previous answer to hold:
            // keep emitting the current (initial) output so the downstream
            // still sees heartbeats.
            return self.emit(self.fatigue.snapshot().state, self.controller.fov_degrees(), now);
        };

        let state = self.fatigue.update(band.theta_ratio, risk.intensity, now).state;
        let fov = self.controller.compute(state, &risk);
        self.telemetry.theta_ratio = band.theta_ratio;
        self.telemetry.motion_intensity = risk.intensity;
        self.emit(state, fov, now)
    }

    fn drain_channels(&mut self) {
        loop {
            match self.eeg_rx.try_recv() {
                Ok(sample) => Self::ingest(
                    &mut self.eeg_buffer,
                    &mut self.dropped_samples,
                    StreamKind::Eeg,
                    sample,
                ),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        loop {
            match self.motion_rx.try_recv() {
                Ok(sample) => Self::ingest(
                    &mut self.motion_buffer,
                    &mut self.dropped_samples,
                    StreamKind::Motion,
                    sample,
                ),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    /// A stream is stale when silent for twice its expected sample interval,
    /// measured from its newest sample (or from pipeline start if it never
    /// produced one).
    fn stale_stream(&mut self, now: f64) -> Option<PipelineError> {
        let origin = self.started_at.unwrap_or(now);
        let check = |last: Option<f64>, timeout: f64, stream: StreamKind| {
            let last_seen = last.unwrap_or(origin);
            (now - last_seen > timeout).then_some(PipelineError::StaleStream {
                stream,
                last_seen,
                now,
            })
        };
        let eeg = check(
            self.eeg_buffer.last_timestamp(),
            self.config.stale_after(self.config.sampling_rate_eeg),
            StreamKind::Eeg,
        );
        let motion = check(
            self.motion_buffer.last_timestamp(),
            self.config.stale_after(self.config.sampling_rate_motion),
            StreamKind::Motion,
        );
        self.telemetry.eeg_stale = eeg.is_some();
        self.telemetry.motion_stale = motion.is_some();
        eeg.or(motion)
    }

    /// Most conservative known-safe output: minimum FOV, low-intensity
    /// rendering, every comfort-relevant effect off. Absence of data is not
    /// assumed benign.
    fn fail_safe(&mut self, now: f64) -> Telemetry {
        let fov = self.controller.force_minimum();
        let command = FovCommand {
            fov_degrees: fov,
            render_mode: RenderMode::LowIntensity,
            disabled_effects: crate::types::EffectId::ALL.into_iter().collect::<BTreeSet<_>>(),
            foveation: self.controller.foveation(),
        };
        self.telemetry.fov_degrees = fov;
        self.actuator.actuate(command, now);
        self.telemetry
    }

    fn emit(&mut self, state: FatigueState, fov: f64, now: f64) -> Telemetry {
        let command = FovCommand {
            fov_degrees: fov,
            render_mode: render_mode_for(state),
            disabled_effects: disabled_effects_for(state),
            foveation: self.controller.foveation(),
        };
        self.telemetry.state = state;
        self.telemetry.fov_degrees = fov;
        self.actuator.actuate(command, now);
        self.telemetry
    }

    /// Last command delivered downstream; persists across shutdown.
    pub fn last_command(&self) -> Option<&FovCommand> {
        self.actuator.last_command()
    }

    pub fn sink(&self) -> &S {
        self.actuator.sink()
    }
}
