use std::time::Duration;

use rand::Rng;

use crate::render::{Point, Viewport};

/// Particles in a celebratory burst.
pub const BURST_SIZE: usize = 20;
/// Downward acceleration in units/s².
pub const GRAVITY: f64 = 600.0;

const MIN_SPEED: f64 = 50.0;
const MAX_SPEED: f64 = 150.0;

/// Randomised launch parameters of a single particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Launch {
    pub angle_deg: f64,
    pub speed: f64,
}

impl Launch {
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            angle_deg: rng.gen_range(0.0..360.0),
            speed: rng.gen_range(MIN_SPEED..MAX_SPEED),
        }
    }
}

/// Longest time a particle launched inside `viewport` can stay in it: the
/// fastest upward launch from the top edge until it falls past the bottom.
pub fn max_flight_time(viewport: &Viewport) -> Duration {
    let rise = MAX_SPEED;
    let fall = (rise * rise + 2.0 * GRAVITY * viewport.height.max(0.0)).sqrt();
    Duration::from_secs_f64((rise + fall) / GRAVITY)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flight {
    Airborne,
    Exited,
}

/// A ballistic projectile in screen space (y grows downwards).
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub position: Point,
    pub velocity: (f64, f64),
    pub opacity: f64,
    origin_y: f64,
}

impl Particle {
    pub fn launch(origin: Point, launch: Launch) -> Self {
        let radians = launch.angle_deg.to_radians();
        Self {
            position: origin,
            velocity: (radians.cos() * launch.speed, radians.sin() * launch.speed),
            opacity: 1.0,
            origin_y: origin.y,
        }
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// Opacity falls linearly with the vertical distance travelled, reaching
    /// zero after one viewport height.
    pub fn step(&mut self, dt: f64, viewport: &Viewport) -> Flight {
        self.velocity.1 += GRAVITY * dt;
        self.position.x += self.velocity.0 * dt;
        self.position.y += self.velocity.1 * dt;

        let travelled = (self.position.y - self.origin_y).abs();
        self.opacity = (1.0 - travelled / viewport.height).clamp(0.0, 1.0);

        if self.has_exited(viewport) {
            Flight::Exited
        } else {
            Flight::Airborne
        }
    }

    pub fn has_exited(&self, viewport: &Viewport) -> bool {
        self.position.y > viewport.height
    }
}
