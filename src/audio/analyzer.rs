use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::SpecError;

/// dB range mapped onto the 0..=255 intensity scale. Matches the byte
/// quantization of common platform analysers, so recordings look the same
/// here as in a browser spectrogram.
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

/// Windowed FFT pass producing one byte-quantized intensity per frequency
/// bin. Bin count is `fft_size / 2` (positive frequencies only).
pub struct SpectrumAnalyzer {
    fft_size: usize,
    smoothing: f32,
    planner: FftPlanner<f32>,
    buffer: Vec<Complex<f32>>,
    window: Vec<f32>,
    previous_db: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(fft_size: usize, smoothing: f32) -> Result<Self, SpecError> {
        if !fft_size.is_power_of_two() || fft_size < 32 {
            return Err(SpecError::InvalidInput(format!(
                "fft size must be a power of two >= 32, got {fft_size}"
            )));
        }

        // Hann window for smoother frequency response
        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (fft_size - 1) as f32).cos())
            })
            .collect();

        Ok(Self {
            fft_size,
            smoothing: smoothing.clamp(0.0, 0.99),
            planner: FftPlanner::new(),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            window,
            previous_db: vec![MIN_DB; fft_size / 2],
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Analyze one window of samples. Shorter windows are zero-padded, so a
    /// chunk tail near the end of playback still yields a full-length frame.
    pub fn analyze(&mut self, samples: &[f32]) -> Vec<u8> {
        for (i, sample) in samples.iter().take(self.fft_size).enumerate() {
            self.buffer[i] = Complex::new(sample * self.window[i], 0.0);
        }
        for i in samples.len().min(self.fft_size)..self.fft_size {
            self.buffer[i] = Complex::new(0.0, 0.0);
        }

        let fft = self.planner.plan_fft_forward(self.fft_size);
        fft.process(&mut self.buffer);

        let scale = 1.0 / self.fft_size as f32;
        let mut frame = Vec::with_capacity(self.bin_count());
        for bin in 0..self.bin_count() {
            let magnitude = self.buffer[bin].norm() * scale;
            let db = if magnitude > 0.0 {
                20.0 * magnitude.log10()
            } else {
                MIN_DB
            };

            let smoothed = self.previous_db[bin] * self.smoothing + db * (1.0 - self.smoothing);
            self.previous_db[bin] = smoothed;

            let normalized = (smoothed - MIN_DB) / (MAX_DB - MIN_DB);
            frame.push((normalized.clamp(0.0, 1.0) * 255.0) as u8);
        }

        frame
    }
}
