use std::{collections::VecDeque, f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::AnalysisConfig;

/// Byte value of a silent time-domain sample.
pub const SILENT_SAMPLE: u8 = 128;

/// Which view of the signal a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameDomain {
    /// Byte-quantized magnitudes across the frequency bins.
    Frequency,
    /// Byte-quantized samples centered on [`SILENT_SAMPLE`].
    Time,
}

/// One tick's worth of analysis data. Frames are produced on demand and never
/// compared across ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisFrame {
    pub domain: FrameDomain,
    pub values: Vec<u8>,
}

impl AnalysisFrame {
    /// Silence-equivalent frame: zeros in the frequency domain, the midpoint in
    /// the time domain.
    pub fn silent(domain: FrameDomain, len: usize) -> Self {
        let fill = match domain {
            FrameDomain::Frequency => 0,
            FrameDomain::Time => SILENT_SAMPLE,
        };
        Self {
            domain,
            values: vec![fill; len],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mean of all values, `0.0` for an empty frame.
    pub fn mean(&self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let sum: u32 = self.values.iter().map(|v| u32::from(*v)).sum();
        sum as f32 / self.values.len() as f32
    }

    /// Value at `index` wrapped around the frame length.
    pub fn wrapped(&self, index: usize) -> u8 {
        if self.values.is_empty() {
            return 0;
        }
        self.values[index % self.values.len()]
    }
}

/// Sampler over the most recent window of the live signal, modelled on a
/// browser analyser node: Blackman window, smoothed magnitude spectrum and a
/// linear decibel-to-byte mapping.
pub struct AnalysisSource {
    config: AnalysisConfig,
    window: VecDeque<f32>,
    smoothed: Vec<f32>,
    blackman: Vec<f32>,
    fft: FftResources,
}

impl AnalysisSource {
    /// Builds a sampler. The configuration is expected to be validated.
    pub fn new(config: AnalysisConfig) -> Self {
        let size = config.fft_size.max(2);
        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);
        let fft = FftResources {
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        };

        Self {
            window: VecDeque::from(vec![0.0; size]),
            smoothed: vec![0.0; size / 2],
            blackman: (0..size).map(|i| blackman_value(i, size)).collect(),
            fft,
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Number of values in every frame this source produces.
    pub fn frame_len(&self) -> usize {
        self.smoothed.len()
    }

    /// Appends mono samples, keeping only the most recent transform window.
    pub fn push_samples(&mut self, samples: &[f32]) {
        let size = self.window.len();
        let tail = &samples[samples.len().saturating_sub(size)..];
        let overflow = (self.window.len() + tail.len()).saturating_sub(size);
        self.window.drain(..overflow);
        self.window.extend(tail.iter().copied());
    }

    /// Forgets the signal and the smoothing state.
    pub fn clear(&mut self) {
        self.window.iter_mut().for_each(|s| *s = 0.0);
        self.smoothed.iter_mut().for_each(|m| *m = 0.0);
    }

    pub fn sample_frequency_domain(&mut self) -> AnalysisFrame {
        let size = self.window.len();
        for (index, sample) in self.window.iter().enumerate() {
            self.fft.input[index] = *sample * self.blackman[index];
        }

        let processed = self.fft.plan.process_with_scratch(
            &mut self.fft.input,
            &mut self.fft.spectrum,
            &mut self.fft.scratch,
        );
        if let Err(err) = processed {
            tracing::warn!(%err, "frequency transform failed, reporting silence");
            return AnalysisFrame::silent(FrameDomain::Frequency, self.frame_len());
        }

        let tau = self.config.smoothing;
        let range = self.config.max_decibels - self.config.min_decibels;
        let scale = 1.0 / size as f32;
        let mut values = Vec::with_capacity(self.smoothed.len());

        for (smoothed, bin) in self.smoothed.iter_mut().zip(self.fft.spectrum.iter()) {
            let magnitude = bin.norm() * scale;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
            if !smoothed.is_finite() {
                *smoothed = 0.0;
            }

            let byte = if *smoothed <= 0.0 {
                0
            } else {
                let db = 20.0 * smoothed.log10();
                let scaled = 255.0 * (db - self.config.min_decibels) / range;
                scaled.floor().clamp(0.0, 255.0) as u8
            };
            values.push(byte);
        }

        AnalysisFrame {
            domain: FrameDomain::Frequency,
            values,
        }
    }

    pub fn sample_time_domain(&self) -> AnalysisFrame {
        let len = self.frame_len();
        let start = self.window.len() - len;
        let values = self
            .window
            .iter()
            .skip(start)
            .map(|s| (128.0 * (1.0 + s)).floor().clamp(0.0, 255.0) as u8)
            .collect();

        AnalysisFrame {
            domain: FrameDomain::Time,
            values,
        }
    }

    pub fn sample(&mut self, domain: FrameDomain) -> AnalysisFrame {
        match domain {
            FrameDomain::Frequency => self.sample_frequency_domain(),
            FrameDomain::Time => self.sample_time_domain(),
        }
    }
}

struct FftResources {
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for AnalysisSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisSource")
            .field("config", &self.config)
            .field("frame_len", &self.frame_len())
            .finish()
    }
}

fn blackman_value(index: usize, len: usize) -> f32 {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a2 = 0.5 * ALPHA;
    let x = index as f32 / len as f32;

    a0 - 0.5 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
}
