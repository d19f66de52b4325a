use rand::{rngs::StdRng, Rng};

use super::{Visualizer, TRAIL_ALPHA};
use crate::{AnalysisFrame, Canvas, FrameDomain, Rgba};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub dx: f32,
    pub dy: f32,
}

impl Particle {
    /// Moves by one step of velocity and bounces off the surface edges. The
    /// overshoot is mirrored back inside so the position never leaves
    /// `[0, width] x [0, height]`.
    pub fn advance(&mut self, width: f32, height: f32) {
        self.x += self.dx;
        self.y += self.dy;
        reflect(&mut self.x, &mut self.dx, width);
        reflect(&mut self.y, &mut self.dy, height);
    }
}

fn reflect(position: &mut f32, velocity: &mut f32, limit: f32) {
    if *position < 0.0 {
        *position = -*position;
        *velocity = -*velocity;
    } else if *position > limit {
        *position = 2.0 * limit - *position;
        *velocity = -*velocity;
    }
    *position = position.clamp(0.0, limit.max(0.0));
}

/// Fixed-size particle set carried across ticks and mode switches. Hue of
/// particle `i` follows the magnitude of bin `i mod frame length`.
#[derive(Debug)]
pub struct ParticleField {
    particles: Vec<Particle>,
    rng: StdRng,
}

impl ParticleField {
    pub fn new(count: usize, width: f32, height: f32, rng: StdRng) -> Self {
        let mut field = Self {
            particles: Vec::with_capacity(count),
            rng,
        };
        for _ in 0..count {
            let particle = field.spawn(width, height);
            field.particles.push(particle);
        }
        field
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    fn spawn(&mut self, width: f32, height: f32) -> Particle {
        Particle {
            x: self.rng.gen::<f32>() * width,
            y: self.rng.gen::<f32>() * height,
            radius: self.rng.gen::<f32>() * 4.0 + 1.0,
            dx: (self.rng.gen::<f32>() - 0.5) * 2.0,
            dy: (self.rng.gen::<f32>() - 0.5) * 2.0,
        }
    }
}

impl Visualizer for ParticleField {
    fn domain(&self) -> FrameDomain {
        FrameDomain::Frequency
    }

    fn render(&mut self, frame: &AnalysisFrame, canvas: &mut dyn Canvas) {
        let (width, height) = (canvas.width() as f32, canvas.height() as f32);
        canvas.clear();
        canvas.fade(TRAIL_ALPHA);

        for (index, particle) in self.particles.iter_mut().enumerate() {
            particle.advance(width, height);
            let hue = f32::from(frame.wrapped(index)) / 255.0 * 360.0;
            canvas.fill_circle(
                (particle.x, particle.y),
                particle.radius,
                Rgba::hsl(hue, 1.0, 0.5),
            );
        }
    }
}
