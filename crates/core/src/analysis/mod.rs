use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{Result, VisError, ANALYSIS_WINDOW};

/// Per-channel magnitude spectra, `window / 2` bins each.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl Spectrum {
    pub fn new(bins: usize) -> Self {
        Self {
            left: vec![0.0; bins],
            right: vec![0.0; bins],
        }
    }

    pub fn bins(&self) -> usize {
        self.left.len()
    }

    pub fn clear(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
    }
}

/// Stereo FFT over one analysis window of interleaved 16-bit samples.
///
/// The plan, window table and scratch space live as long as the analyzer,
/// which is created alongside the owning lifecycle and not per buffer.
pub struct FrequencyAnalyzer {
    window_size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl FrequencyAnalyzer {
    pub fn new() -> Self {
        Self::with_window(ANALYSIS_WINDOW)
    }

    pub fn with_window(window_size: usize) -> Self {
        let window_size = window_size.max(2);
        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(window_size);
        let input = plan.make_input_vec();
        let spectrum = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();
        let window = (0..window_size)
            .map(|index| hann_value(index, window_size))
            .collect();

        Self {
            window_size,
            plan,
            window,
            input,
            spectrum,
            scratch,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Number of bins produced per channel.
    pub fn bins(&self) -> usize {
        self.window_size / 2
    }

    /// Transforms both channels of `samples` into `output`.
    ///
    /// Missing frames are treated as silence. Magnitudes are normalised so a
    /// full-scale sine lands near 1.0 in its bin.
    pub fn perform_stereo(&mut self, samples: &[i16], output: &mut Spectrum) -> Result<()> {
        if output.bins() != self.bins() || output.right.len() != self.bins() {
            return Err(VisError::InvalidInput(
                "spectrum does not match the analysis window",
            ));
        }

        self.transform_channel(samples, 0, &mut output.left)?;
        self.transform_channel(samples, 1, &mut output.right)
    }

    fn transform_channel(
        &mut self,
        samples: &[i16],
        channel: usize,
        out: &mut [f32],
    ) -> Result<()> {
        for (index, slot) in self.input.iter_mut().enumerate() {
            let sample = samples.get(index * 2 + channel).copied().unwrap_or(0);
            *slot = f32::from(sample) / 32768.0 * self.window[index];
        }

        self.plan
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
            .map_err(|err| VisError::msg(format!("fft failed: {err}")))?;

        let scale = 4.0 / self.window_size as f32;
        for (bin, value) in out.iter_mut().zip(&self.spectrum) {
            *bin = value.norm() * scale;
        }
        Ok(())
    }
}

impl Default for FrequencyAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FrequencyAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrequencyAnalyzer")
            .field("window_size", &self.window_size)
            .finish()
    }
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}
