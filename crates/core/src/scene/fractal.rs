use std::f32::consts::FRAC_PI_2;

use rand::{rngs::StdRng, Rng};

use super::{Visualizer, TRAIL_ALPHA};
use crate::{AnalysisFrame, Canvas, FrameDomain, Rgba};

const MAX_DEPTH: u32 = 8;
const SHRINK: f32 = 0.7;
/// Surface height the trunk lengths are tuned for.
const REFERENCE_HEIGHT: f32 = 400.0;

/// Binary branching tree rooted at the bottom-center. Loudness lengthens the
/// trunk and widens the spread; every branch gets a little random jitter.
#[derive(Debug)]
pub struct FractalTree {
    rng: StdRng,
}

impl FractalTree {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    fn branch(
        &mut self,
        canvas: &mut dyn Canvas,
        start: (f32, f32),
        length: f32,
        angle: f32,
        depth: u32,
        spread: f32,
    ) {
        if depth == 0 {
            return;
        }

        let end = (
            start.0 + length * angle.cos(),
            start.1 + length * angle.sin(),
        );
        let hue = (360.0 * depth as f32 / MAX_DEPTH as f32 + self.rng.gen::<f32>() * 30.0) % 360.0;
        canvas.stroke_line(start, end, depth as f32, Rgba::hsl(hue, 1.0, 0.5));

        let jitter = (self.rng.gen::<f32>() - 0.5) * 0.3;
        let next = length * SHRINK;
        self.branch(canvas, end, next, angle - spread + jitter, depth - 1, spread);
        self.branch(canvas, end, next, angle + spread + jitter, depth - 1, spread);
    }
}

impl Visualizer for FractalTree {
    fn domain(&self) -> FrameDomain {
        FrameDomain::Frequency
    }

    fn render(&mut self, frame: &AnalysisFrame, canvas: &mut dyn Canvas) {
        let loudness = frame.mean() / 255.0;
        let (width, height) = (canvas.width() as f32, canvas.height() as f32);
        let scale = height / REFERENCE_HEIGHT;

        canvas.fade(TRAIL_ALPHA);

        let trunk = (100.0 + loudness * 200.0) * scale;
        let spread = (15.0 + loudness * 30.0).to_radians();
        self.branch(canvas, (width / 2.0, height), trunk, -FRAC_PI_2, MAX_DEPTH, spread);
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::render::testing::{DrawCall, RecordingCanvas};

    fn trunk_of(calls: &[DrawCall]) -> ((f32, f32), (f32, f32), f32) {
        calls
            .iter()
            .find_map(|call| match call {
                DrawCall::Line {
                    from, to, width, ..
                } => Some((*from, *to, *width)),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn draws_full_tree_over_a_trail() {
        let mut tree = FractalTree::new(StdRng::seed_from_u64(1));
        let mut canvas = RecordingCanvas::new(800, 400);

        tree.render(&AnalysisFrame::silent(FrameDomain::Frequency, 256), &mut canvas);

        assert!(matches!(canvas.calls[0], DrawCall::Rect { color } if color.alpha == TRAIL_ALPHA));
        let lines = canvas
            .calls
            .iter()
            .filter(|call| matches!(call, DrawCall::Line { .. }))
            .count();
        assert_eq!(lines, (1 << MAX_DEPTH) - 1);

        let (from, to, width) = trunk_of(&canvas.calls);
        assert_eq!(from, (400.0, 400.0));
        assert!((to.1 - 300.0).abs() < 1e-3);
        assert_eq!(width, MAX_DEPTH as f32);
    }

    #[test]
    fn loud_input_grows_the_trunk() {
        let mut tree = FractalTree::new(StdRng::seed_from_u64(2));
        let mut canvas = RecordingCanvas::new(800, 400);
        let loud = AnalysisFrame {
            domain: FrameDomain::Frequency,
            values: vec![255; 256],
        };

        tree.render(&loud, &mut canvas);
        let (from, to, _) = trunk_of(&canvas.calls);
        assert!((from.1 - to.1 - 300.0).abs() < 1e-3);
    }

    #[test]
    fn seeded_jitter_is_reproducible() {
        let frame = AnalysisFrame::silent(FrameDomain::Frequency, 16);
        let mut first = RecordingCanvas::new(200, 200);
        let mut second = RecordingCanvas::new(200, 200);

        FractalTree::new(StdRng::seed_from_u64(9)).render(&frame, &mut first);
        FractalTree::new(StdRng::seed_from_u64(9)).render(&frame, &mut second);

        assert_eq!(first.calls, second.calls);
    }
}
