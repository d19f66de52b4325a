use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{PlayerError, Result, StreamResolver, VisualizationMode};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub surface: SurfaceConfig,
    pub visualization: VisualizationConfig,
    pub backend: BackendConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing sections fall back to their
    /// defaults; the result is validated before it is returned.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        self.surface.validate()?;
        self.visualization.validate()?;
        self.backend.validate()
    }
}

/// Configuration of the frequency/time-domain sampler. Fixed for the
/// lifetime of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub fft_size: usize,
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl AnalysisConfig {
    pub const MIN_FFT_SIZE: usize = 32;
    pub const MAX_FFT_SIZE: usize = 32_768;

    /// Number of values in every analysis frame.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two()
            || !(Self::MIN_FFT_SIZE..=Self::MAX_FFT_SIZE).contains(&self.fft_size)
        {
            return Err(PlayerError::config(format!(
                "fft_size must be a power of two between {} and {}, got {}",
                Self::MIN_FFT_SIZE,
                Self::MAX_FFT_SIZE,
                self.fft_size
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(PlayerError::config(format!(
                "smoothing must lie in [0, 1), got {}",
                self.smoothing
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(PlayerError::config(
                "min_decibels must be lower than max_decibels",
            ));
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 512,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
}

impl SurfaceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PlayerError::config("surface dimensions must be non-zero"));
        }
        Ok(())
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    pub mode: VisualizationMode,
    pub fps: u32,
    pub particle_count: usize,
    /// Seed for the renderers' random jitter. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl VisualizationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(PlayerError::config("fps must be at least 1"));
        }
        Ok(())
    }
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            mode: VisualizationMode::Fractal,
            fps: 60,
            particle_count: 100,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl BackendConfig {
    /// Rejects a zero timeout and base URLs the stream resolver cannot
    /// build endpoints from.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(PlayerError::config("backend timeout_secs must be at least 1"));
        }
        StreamResolver::new(&self.base_url).map(|_| ())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/".to_string(),
            timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.analysis.bin_count(), 256);
        assert_eq!(config.visualization.particle_count, 100);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "visualization": { "mode": "bars", "fps": 30 } }"#)
                .unwrap();

        assert_eq!(config.visualization.mode, VisualizationMode::Bars);
        assert_eq!(config.visualization.fps, 30);
        assert_eq!(config.analysis, AnalysisConfig::default());
        assert_eq!(config.surface.height, 400);
    }

    #[test]
    fn rejects_invalid_fft_size() {
        let mut config = AppConfig::default();
        config.analysis.fft_size = 500;
        let err = config.validate().unwrap_err();
        assert!(format!("{err}").contains("fft_size"));

        config.analysis.fft_size = 16;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_decibel_range() {
        let mut config = AppConfig::default();
        config.analysis.min_decibels = -20.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unusable_backend_settings() {
        let mut config = AppConfig::default();
        config.backend.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(PlayerError::Config(_))));

        config.backend.timeout_secs = 5;
        config.backend.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(PlayerError::Config(_))));

        config.backend.base_url = "http://music.local:9000/app/".to_string();
        config.validate().unwrap();
    }
}
