//! Interchangeable visualization strategies.
//!
//! Each [`Visualizer`] consumes exactly one [`AnalysisFrame`] per call and
//! paints it onto a [`Canvas`]. The render loop picks one of them per tick
//! through [`VisualizationMode`].

mod bars;
mod fractal;
mod particles;
mod waveform;

use std::{fmt, str::FromStr};

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{AnalysisFrame, Canvas, FrameDomain, VisualizationConfig};

pub use bars::SpectrumBars;
pub use fractal::FractalTree;
pub use particles::{Particle, ParticleField};
pub use waveform::Waveform;

/// Alpha of the overlay that turns previous frames into a fading trail.
pub(crate) const TRAIL_ALPHA: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationMode {
    Fractal,
    Bars,
    #[serde(alias = "wave")]
    Waveform,
    Particles,
}

impl VisualizationMode {
    pub const ALL: [Self; 4] = [Self::Fractal, Self::Bars, Self::Waveform, Self::Particles];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fractal => "fractal",
            Self::Bars => "bars",
            Self::Waveform => "waveform",
            Self::Particles => "particles",
        }
    }
}

impl fmt::Display for VisualizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisualizationMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fractal" => Ok(Self::Fractal),
            "bars" => Ok(Self::Bars),
            "wave" | "waveform" => Ok(Self::Waveform),
            "particles" => Ok(Self::Particles),
            other => Err(format!(
                "unknown visualization mode `{other}` (expected fractal, bars, waveform or particles)"
            )),
        }
    }
}

/// Draw strategy fed with one analysis frame per invocation.
pub trait Visualizer {
    /// Which kind of frame the strategy consumes.
    fn domain(&self) -> FrameDomain;

    /// Paints one frame. Must not fail, including on silent input.
    fn render(&mut self, frame: &AnalysisFrame, canvas: &mut dyn Canvas);
}

/// The full family of visualizers, one instance each, so per-strategy state
/// (particle positions) survives mode switches.
#[derive(Debug)]
pub struct Visualizers {
    fractal: FractalTree,
    bars: SpectrumBars,
    waveform: Waveform,
    particles: ParticleField,
}

impl Visualizers {
    pub fn new(config: &VisualizationConfig, width: u32, height: u32) -> Self {
        let mut seeder = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let fractal_rng = StdRng::seed_from_u64(seeder.gen());
        let particle_rng = StdRng::seed_from_u64(seeder.gen());

        Self {
            fractal: FractalTree::new(fractal_rng),
            bars: SpectrumBars,
            waveform: Waveform,
            particles: ParticleField::new(
                config.particle_count,
                width as f32,
                height as f32,
                particle_rng,
            ),
        }
    }

    pub fn get_mut(&mut self, mode: VisualizationMode) -> &mut dyn Visualizer {
        match mode {
            VisualizationMode::Fractal => &mut self.fractal,
            VisualizationMode::Bars => &mut self.bars,
            VisualizationMode::Waveform => &mut self.waveform,
            VisualizationMode::Particles => &mut self.particles,
        }
    }

    pub fn particles(&self) -> &ParticleField {
        &self.particles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modes_including_legacy_wave() {
        assert_eq!("wave".parse::<VisualizationMode>(), Ok(VisualizationMode::Waveform));
        assert_eq!(" Bars ".parse::<VisualizationMode>(), Ok(VisualizationMode::Bars));
        assert!("plasma".parse::<VisualizationMode>().is_err());

        let mode: VisualizationMode = serde_json::from_str("\"wave\"").unwrap();
        assert_eq!(mode, VisualizationMode::Waveform);
    }

    #[test]
    fn each_mode_maps_to_its_domain() {
        let mut visualizers = Visualizers::new(
            &VisualizationConfig {
                seed: Some(7),
                ..Default::default()
            },
            100,
            50,
        );

        assert_eq!(
            visualizers.get_mut(VisualizationMode::Waveform).domain(),
            FrameDomain::Time
        );
        for mode in [
            VisualizationMode::Fractal,
            VisualizationMode::Bars,
            VisualizationMode::Particles,
        ] {
            assert_eq!(visualizers.get_mut(mode).domain(), FrameDomain::Frequency);
        }
        assert_eq!(visualizers.particles().len(), 100);
    }
}
