use super::Visualizer;
use crate::{AnalysisFrame, Canvas, FrameDomain, Rgba};

/// Equal-width vertical bars across the surface, one per frequency bin.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpectrumBars;

impl Visualizer for SpectrumBars {
    fn domain(&self) -> FrameDomain {
        FrameDomain::Frequency
    }

    fn render(&mut self, frame: &AnalysisFrame, canvas: &mut dyn Canvas) {
        canvas.clear();
        if frame.is_empty() {
            return;
        }

        let (width, height) = (canvas.width() as f32, canvas.height() as f32);
        let bins = frame.len() as f32;
        let slot = width / bins;
        let gap = if slot > 2.0 { 1.0 } else { 0.0 };

        for (index, value) in frame.values.iter().enumerate() {
            let bar_height = f32::from(*value) / 255.0 * height;
            let hue = index as f32 / bins * 360.0;
            canvas.fill_rect(
                index as f32 * slot,
                height - bar_height,
                slot - gap,
                bar_height,
                Rgba::hsl(hue, 1.0, 0.5),
            );
        }
    }
}
