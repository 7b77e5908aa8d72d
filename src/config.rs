use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::SpecError;
use crate::render::ColorRamp;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Base URL of the recording discovery service.
    pub server_url: String,
    /// Fixed poll interval; also the only retry mechanism on fetch failure.
    pub poll_interval_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5000".into(),
            poll_interval_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// FFT window size; must be a power of two. Bin count is half this.
    pub fft_size: usize,
    /// Assumed sample rate for bin geometry. Recordings declare their own
    /// rate for decoding; this one drives the frequency axis.
    pub sample_rate: u32,
    pub min_frequency: f64,
    pub max_frequency: f64,
    /// Temporal smoothing of bin intensities (0.0-0.99).
    pub smoothing: f32,
    /// Target duration of one playback chunk.
    pub chunk_ms: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            sample_rate: 48_000,
            min_frequency: 100.0,
            max_frequency: 10_000.0,
            smoothing: 0.5,
            chunk_ms: 40.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub ramp: ColorRamp,
    /// Drag granularity in pixels per scrub step.
    pub scrub_step_px: usize,
    /// Rolling bound on retained frames (~10 minutes at 60fps by default).
    pub frame_capacity: usize,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            ramp: ColorRamp::Classic,
            scrub_step_px: 4,
            frame_capacity: 36_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub target_fps: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { target_fps: 60 }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default XDG config path (~/.config/specwatch/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("specwatch").join("config.toml"))
    }

    /// Load config from the default XDG path if it exists.
    /// Returns None if the file doesn't exist, logs on parse errors.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            match Self::load(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    eprintln!(
                        "Warning: Failed to parse config at {}: {}\nUsing defaults.",
                        path.display(),
                        e
                    );
                    None
                }
            }
        } else {
            None
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Merge CLI arguments into config (CLI takes priority)
    pub fn merge_args(&mut self, args: &crate::Args) {
        if let Some(ref url) = args.server {
            self.fetch.server_url = url.clone();
        }
        if let Some(secs) = args.poll_interval {
            self.fetch.poll_interval_secs = secs;
        }
        if let Some(ms) = args.chunk_ms {
            self.analysis.chunk_ms = ms;
        }
        if let Some(size) = args.fft_size {
            self.analysis.fft_size = size;
        }
        if let Some(freq) = args.min_freq {
            self.analysis.min_frequency = freq;
        }
        if let Some(freq) = args.max_freq {
            self.analysis.max_frequency = freq;
        }
        if let Some(rate) = args.sample_rate {
            self.analysis.sample_rate = rate;
        }
        self.viewport.ramp = args.ramp.parse().unwrap_or(self.viewport.ramp);
    }

    pub fn validate(&self) -> Result<(), SpecError> {
        if !self.analysis.fft_size.is_power_of_two() || self.analysis.fft_size < 32 {
            return Err(SpecError::InvalidInput(format!(
                "fft_size must be a power of two >= 32, got {}",
                self.analysis.fft_size
            )));
        }
        if self.analysis.min_frequency < 0.0
            || self.analysis.min_frequency >= self.analysis.max_frequency
        {
            return Err(SpecError::InvalidInput(format!(
                "frequency bounds must satisfy 0 <= min < max, got {}..{}",
                self.analysis.min_frequency, self.analysis.max_frequency
            )));
        }
        if self.analysis.chunk_ms <= 0.0 {
            return Err(SpecError::InvalidInput(format!(
                "chunk_ms must be positive, got {}",
                self.analysis.chunk_ms
            )));
        }
        if self.fetch.poll_interval_secs == 0 {
            return Err(SpecError::InvalidInput(
                "poll_interval_secs must be at least 1".into(),
            ));
        }
        if self.display.target_fps == 0 {
            return Err(SpecError::InvalidInput("target_fps must be at least 1".into()));
        }
        if self.viewport.frame_capacity == 0 {
            return Err(SpecError::InvalidInput(
                "frame_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
