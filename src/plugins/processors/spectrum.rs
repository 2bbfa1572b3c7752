//! Spectrum processor: sliding-window FFT over one channel.

use crate::config::PluginConfig;
use crate::error::{Result, SensorVisError};
use crate::plugin::Processor;
use crate::sample::{SensorSample, Value};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::VecDeque;
use std::sync::Arc;

const DEFAULT_WINDOW_SIZE: usize = 256;

/// Accumulates one channel into a sliding window and emits a spectrum
/// sample each time the window fills.
///
/// The output reshapes the payload: `data_type` becomes "fft", the
/// magnitude bins live in `values["magnitude"]` and the matching frequency
/// axis in `metadata["frequencies"]`. Windows overlap by half.
pub struct Spectrum {
    channel: String,
    sample_rate_hz: f64,
    window_size: usize,
    window: VecDeque<f64>,
    fft: Arc<dyn Fft<f64>>,
}

impl Spectrum {
    /// Config keys: `channel` (required), `sample_rate_hz` (required),
    /// `window_size` (default 256).
    pub fn from_config(config: &PluginConfig) -> Result<Self> {
        let channel = config.require_str("channel")?.to_string();
        let sample_rate_hz = config.require_f64("sample_rate_hz")?;
        let window_size = config.get_usize("window_size").unwrap_or(DEFAULT_WINDOW_SIZE);
        if sample_rate_hz <= 0.0 {
            return Err(SensorVisError::Config(
                "'sample_rate_hz' must be positive".to_string(),
            ));
        }
        if window_size < 4 {
            return Err(SensorVisError::Config(
                "'window_size' must be at least 4".to_string(),
            ));
        }

        let fft = FftPlanner::new().plan_fft_forward(window_size);
        Ok(Self {
            channel,
            sample_rate_hz,
            window_size,
            window: VecDeque::with_capacity(window_size),
            fft,
        })
    }

    fn spectrum_sample(&self, template: &SensorSample) -> SensorSample {
        let mut bins: Vec<Complex<f64>> = self
            .window
            .iter()
            .map(|&v| Complex::new(v, 0.0))
            .collect();
        self.fft.process(&mut bins);

        let half = self.window_size / 2;
        let scale = 2.0 / self.window_size as f64;
        let magnitudes: Vec<f64> = bins[..half].iter().map(|c| c.norm() * scale).collect();
        let frequencies: Vec<f64> = (0..half)
            .map(|i| i as f64 * self.sample_rate_hz / self.window_size as f64)
            .collect();

        let mut out = SensorSample::new(template.timestamp, template.sensor_id.clone(), "fft");
        out.values
            .insert("magnitude".to_string(), Value::Floats(magnitudes));
        out.metadata
            .insert("frequencies".to_string(), Value::Floats(frequencies));
        out.metadata
            .insert("source_channel".to_string(), Value::Text(self.channel.clone()));
        out
    }
}

impl Processor for Spectrum {
    fn process(&mut self, sample: SensorSample, out: &mut Vec<SensorSample>) -> Result<()> {
        if let Some(v) = sample.values.get(&self.channel).and_then(Value::as_f64) {
            self.window.push_back(v);
            if self.window.len() == self.window_size {
                out.push(self.spectrum_sample(&sample));
                // 50% overlap between consecutive windows.
                self.window.drain(..self.window_size / 2);
            }
        }
        Ok(())
    }
}
