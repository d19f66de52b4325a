use super::{Visualizer, TRAIL_ALPHA};
use crate::{analysis::SILENT_SAMPLE, AnalysisFrame, Canvas, FrameDomain, Rgba};

const LINE_WIDTH: f32 = 2.0;

/// Oscilloscope-style polyline over a time-domain frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct Waveform;

impl Waveform {
    fn points(frame: &AnalysisFrame, width: f32, height: f32) -> Vec<(f32, f32)> {
        let slice = width / frame.len().max(1) as f32;
        let midpoint = f32::from(SILENT_SAMPLE);

        let mut points: Vec<(f32, f32)> = frame
            .values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let y = f32::from(*value) / midpoint * height / 2.0;
                (index as f32 * slice, y)
            })
            .collect();
        points.push((width, height / 2.0));
        points
    }
}

impl Visualizer for Waveform {
    fn domain(&self) -> FrameDomain {
        FrameDomain::Time
    }

    fn render(&mut self, frame: &AnalysisFrame, canvas: &mut dyn Canvas) {
        let (width, height) = (canvas.width() as f32, canvas.height() as f32);
        canvas.fade(TRAIL_ALPHA);
        canvas.stroke_polyline(&Self::points(frame, width, height), LINE_WIDTH, Rgba::LIME);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::{DrawCall, RecordingCanvas};

    #[test]
    fn silence_is_a_flat_center_line() {
        let frame = AnalysisFrame::silent(FrameDomain::Time, 8);
        let points = Waveform::points(&frame, 80.0, 40.0);

        assert_eq!(points.len(), 9);
        assert!(points.iter().all(|(_, y)| (*y - 20.0).abs() < f32::EPSILON));
        assert_eq!(points.last(), Some(&(80.0, 20.0)));
    }

    #[test]
    fn deviation_maps_to_offset_from_center() {
        let frame = AnalysisFrame {
            domain: FrameDomain::Time,
            values: vec![0, 192],
        };
        let points = Waveform::points(&frame, 100.0, 100.0);
        assert_eq!(points[0], (0.0, 0.0));
        assert_eq!(points[1], (50.0, 75.0));
    }

    #[test]
    fn draws_over_a_trail_without_clearing() {
        let mut canvas = RecordingCanvas::new(64, 32);
        Waveform.render(&AnalysisFrame::silent(FrameDomain::Time, 4), &mut canvas);

        assert!(!canvas.calls.contains(&DrawCall::Clear));
        assert!(matches!(canvas.calls[0], DrawCall::Rect { .. }));
        assert_eq!(canvas.calls.len(), 1 + 4);
    }
}
