use crate::error::PipelineError;
use crate::types::{BandPowerResult, Sample};
use ndarray::Array1;
use rustfft::{num_complex::Complex64, FftPlanner};

/// Theta band bounds (Hz), the drowsiness marker.
const THETA_LOW_HZ: f64 = 4.0;
const THETA_HIGH_HZ: f64 = 8.0;
/// Upper edge of the analysis band (Hz); everything above is ignored.
const ANALYSIS_HIGH_HZ: f64 = 30.0;
/// Welch segment length cap in samples.
const MAX_SEGMENT_LEN: usize = 256;
/// Total power below this counts as silence; ratio reports 0.
const POWER_EPSILON: f64 = 1e-12;

/// Welch-periodogram estimator of the theta-band power ratio.
///
/// Segments are Hann-windowed with 50 % overlap, the per-segment one-sided
/// PSDs averaged, and the theta/total ratio computed per channel then
/// averaged arithmetically across channels. The cross-channel average trades
/// localization for robustness against a single noisy electrode.
pub struct SpectralAnalyzer {
    planner: FftPlanner<f64>,
    nominal_rate: f64,
}

impl SpectralAnalyzer {
    pub fn new(nominal_rate: f64) -> Self {
        Self {
            planner: FftPlanner::new(),
            nominal_rate,
        }
    }

    /// Minimum window length: two seconds of data at the nominal rate.
    pub fn min_samples(&self) -> usize {
        (2.0 * self.nominal_rate).ceil() as usize
    }

    /// Estimate the theta ratio over an EEG window.
    ///
    /// Returns `InsufficientData` until the window spans two seconds; that is
    /// the "no answer yet" signal, distinct from failure.
    pub fn analyze(
        &mut self,
        window: &[Sample],
        now: f64,
    ) -> Result<BandPowerResult, PipelineError> {
        let needed = self.min_samples();
        if window.len() < needed {
            return Err(PipelineError::InsufficientData {
                needed,
                got: window.len(),
            });
        }
        let channel_count = window
            .iter()
            .map(|s| s.channels.len())
            .min()
            .unwrap_or(0);
        if channel_count == 0 {
            return Err(PipelineError::InsufficientData { needed, got: 0 });
        }

        let mut ratio_sum = 0.0;
        let mut power_sum = 0.0;
        for channel in 0..channel_count {
            let series: Vec<f64> = window
                .iter()
                .map(|s| f64::from(s.channels[channel]))
                .collect();
            let psd = self.welch_psd(&series);
            let (theta, total) = band_sums(&psd, self.nominal_rate);
            ratio_sum += if total > POWER_EPSILON { theta / total } else { 0.0 };
            power_sum += total;
        }

        Ok(BandPowerResult {
            theta_ratio: (ratio_sum / channel_count as f64).clamp(0.0, 1.0),
            total_power: power_sum / channel_count as f64,
            computed_at: now,
        })
    }

    /// One-sided Welch PSD: Hann segments of at most `MAX_SEGMENT_LEN`
    /// samples, 50 % overlap, averaged.
    fn welch_psd(&mut self, series: &[f64]) -> Array1<f64> {
        let segment_len = series.len().min(MAX_SEGMENT_LEN);
        let hop = (segment_len / 2).max(1);
        let hann = hann_window(segment_len);
        let window_power: f64 = hann.iter().map(|w| w * w).sum();
        let scale = 1.0 / (self.nominal_rate * window_power);

        let fft = self.planner.plan_fft_forward(segment_len);
        let bins = segment_len / 2 + 1;
        let mut psd = Array1::<f64>::zeros(bins);
        let mut segments = 0usize;
        let mut buffer = vec![Complex64::new(0.0, 0.0); segment_len];

        let mut start = 0;
        while start + segment_len <= series.len() {
            for (slot, (value, w)) in buffer
                .iter_mut()
                .zip(series[start..start + segment_len].iter().zip(&hann))
            {
                *slot = Complex64::new(value * w, 0.0);
            }
            fft.process(&mut buffer);
            for (k, bin) in buffer.iter().take(bins).enumerate() {
                // One-sided spectrum: interior bins carry both halves.
                let fold = if k == 0 || k == bins - 1 { 1.0 } else { 2.0 };
                psd[k] += bin.norm_sqr() * scale * fold;
            }
            segments += 1;
            start += hop;
        }

        if segments > 0 {
            psd /= segments as f64;
        }
        psd
    }
}

fn hann_window(len: usize) -> Vec<f64> {
    (0..len)
        .map(|n| {
            let phase = 2.0 * std::f64::consts::PI * n as f64 / len as f64;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

/// Sum PSD bins over theta (4-8 Hz) and the full analysis band (0-30 Hz,
/// DC excluded so electrode offset cannot dilute the ratio).
fn band_sums(psd: &Array1<f64>, sample_rate: f64) -> (f64, f64) {
    let segment_len = (psd.len() - 1) * 2;
    let df = sample_rate / segment_len as f64;
    let mut theta = 0.0;
    let mut total = 0.0;
    for (k, &power) in psd.iter().enumerate().skip(1) {
        let freq = k as f64 * df;
        if freq > ANALYSIS_HIGH_HZ {
            break;
        }
        total += power;
        if (THETA_LOW_HZ..=THETA_HIGH_HZ).contains(&freq) {
            theta += power;
        }
    }
    (theta, total)
}
