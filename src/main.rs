//! Demo runner: synthetic EEG + head-motion producers feeding the comfort
//! pipeline, with every delivered command logged. Lets the whole loop run
//! end-to-end without headset hardware.

use anyhow::{Context, Result};
use log::info;
use neurofov::{CommandSink, ComfortConfig, ComfortPipeline, FovCommand, Sample};
use rand::Rng;
use std::f64::consts::PI;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// Sink that logs each delivered command.
struct LogSink;

impl CommandSink for LogSink {
    fn deliver(&mut self, command: &FovCommand) {
        info!(
            "-> renderer: fov={:.1} deg, mode={:?}, effects_off={:?}",
            command.fov_degrees, command.render_mode, command.disabled_effects
        );
    }
}

/// Scripted drowsiness: alert for the first 10 s, then theta-heavy.
fn theta_fraction(t: f64) -> f64 {
    if t < 10.0 {
        0.15
    } else {
        0.60
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => ComfortConfig::from_file(Path::new(&path))
            .with_context(|| format!("loading config from {path}"))?,
        None => {
            // Shortened sustain so the full Normal -> Warning -> Critical arc
            // fits a 30 s demo run.
            let mut cfg = ComfortConfig::default();
            cfg.sustain_duration = 5.0;
            cfg
        }
    };
    config.validate().context("validating configuration")?;

    let mut pipeline = ComfortPipeline::new(config.clone(), LogSink)
        .context("building pipeline")?;
    let start = Instant::now();

    // One producer thread per sensor stream, pushing into bounded channels.
    let eeg_tx = pipeline.eeg_sender();
    let eeg_rate = config.sampling_rate_eeg;
    thread::spawn(move || {
        let mut rng = rand::thread_rng();
        let mut n: u64 = 0;
        // Generate on the sample grid, catching up to wall time each pass so
        // scheduling jitter cannot starve the staleness check.
        loop {
            let elapsed = start.elapsed().as_secs_f64();
            while (n as f64 / eeg_rate) <= elapsed {
                let t = n as f64 / eeg_rate;
                let p = theta_fraction(t);
                let value = p.sqrt() * (2.0 * PI * 6.0 * t).sin()
                    + (1.0 - p).sqrt() * (2.0 * PI * 20.0 * t).sin()
                    + rng.gen_range(-0.05..0.05);
                if eeg_tx.send(Sample::new(t, vec![value as f32])).is_err() {
                    return;
                }
                n += 1;
            }
            thread::sleep(Duration::from_millis(1));
        }
    });

    let motion_tx = pipeline.motion_sender();
    let motion_rate = config.sampling_rate_motion;
    thread::spawn(move || {
        let mut rng = rand::thread_rng();
        let mut n: u64 = 0;
        loop {
            let elapsed = start.elapsed().as_secs_f64();
            while (n as f64 / motion_rate) <= elapsed {
                let t = n as f64 / motion_rate;
                // Calm head with one hard swing burst around t=5 s.
                let swing = if (5.0..6.5).contains(&t) { 4.0 } else { 0.2 };
                let sample = Sample::motion(
                    t,
                    (swing * (2.0 * PI * 0.8 * t).sin()) as f32 + rng.gen_range(-0.02..0.02),
                    rng.gen_range(-0.5..0.5),
                    rng.gen_range(-0.3..0.3),
                );
                if motion_tx.send(sample).is_err() {
                    return;
                }
                n += 1;
            }
            thread::sleep(Duration::from_millis(1));
        }
    });

    info!("comfort loop running (tick every {:.0} ms)", config.tick_interval * 1000.0);
    let mut last_report = 0.0;
    while start.elapsed().as_secs_f64() < 30.0 {
        let now = start.elapsed().as_secs_f64();
        let telemetry = pipeline.tick(now);
        if now - last_report >= 1.0 {
            info!(
                "t={now:5.1}s state={} theta={:.3} motion={:.3} fov={:.1}",
                telemetry.state.as_str(),
                telemetry.theta_ratio,
                telemetry.motion_intensity,
                telemetry.fov_degrees
            );
            last_report = now;
        }
        thread::sleep(Duration::from_secs_f64(config.tick_interval));
    }

    info!(
        "done: {} sample(s) dropped, final telemetry {}",
        pipeline.dropped_samples(),
        serde_json::to_string(&pipeline.telemetry()).unwrap_or_default()
    );
    Ok(())
}
