//! Pure fixed-step kinematics: N-body gravity for bodies and the craft step
//! with escape boost and correction-burn thrust.

use crate::sim::body::{BodyId, BodyState};
use crate::util::Vec2D;
use serde::{Deserialize, Serialize};

/// Gravitational constant of the world frame.
pub const G: f64 = 50.0;
/// Distance clamp applied inside the gravity kernel; no singularities below this.
pub const MIN_DIST: f64 = 10.0;
/// Fixed integration timestep in seconds.
pub const DT_FIXED: f64 = 0.033;
/// Thrust magnitude of a craft, for both the escape boost and correction burns.
pub const CRAFT_ACCEL: f64 = 2.5;
/// The escape boost cuts off once the speed relative to the launch body
/// reaches this multiple of `sqrt(2·G·M/r)`.
pub const ESCAPE_CUTOFF: f64 = 1.1;

/// Kinematic state of a craft at one frame, aligned 1:1 with a prediction frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CraftFrame {
    pub pos: Vec2D<f64>,
    pub vel: Vec2D<f64>,
    /// Whether the escape boost is still firing in this frame.
    pub accelerating: bool,
}

/// A timed thrust segment at a fixed world angle, scheduled relative to launch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectionBurn {
    /// Thrust direction in radians (world frame).
    pub angle: f64,
    /// Burn length in frames.
    pub duration: usize,
    /// First flight frame of the burn, relative to launch.
    pub start_frame: usize,
}

impl CorrectionBurn {
    /// Whether the burn is firing while the given flight frame is produced.
    pub fn covers(&self, flight_frame: usize) -> bool {
        flight_frame >= self.start_frame && flight_frame < self.start_frame + self.duration
    }
}

/// Thrust bookkeeping carried by a flying craft, fixed at launch.
#[derive(Debug, Clone, Copy)]
pub struct ThrustContext {
    /// The body the craft launched from; the boost is prograde relative to it.
    pub launch_body: BodyId,
    /// Orbit direction sign at launch, `+1.0` or `-1.0`.
    pub orbit_dir: f64,
    /// `sqrt(2·G·M/r)` at the launch altitude.
    pub escape_velocity: f64,
    pub correction: Option<CorrectionBurn>,
}

/// Sums the gravitational acceleration exerted on `pos` by all bodies.
///
/// A body at exactly `pos` contributes nothing (zero offset vector), which is
/// what makes this kernel reusable for the body-on-body case.
pub fn gravity(pos: Vec2D<f64>, bodies: &[BodyState], masses: &[f64]) -> Vec2D<f64> {
    let mut acc = Vec2D::zero();
    for (body, mass) in bodies.iter().zip(masses) {
        let offset = pos.to(&body.pos);
        let dist = offset.abs().max(MIN_DIST);
        acc += offset * (G * mass / (dist * dist * dist));
    }
    acc
}

/// Advances every body by one timestep of semi-implicit (symplectic) Euler.
///
/// Accelerations are all evaluated against the incoming positions, then
/// velocities update before positions. Iteration is in body-id order, so the
/// result is bit-for-bit reproducible for identical inputs.
pub fn step(states: &mut [BodyState], masses: &[f64], dt: f64) {
    let accelerations: Vec<Vec2D<f64>> =
        states.iter().map(|body| gravity(body.pos, states, masses)).collect();
    for (body, acc) in states.iter_mut().zip(accelerations) {
        body.vel += acc * dt;
        body.pos += body.vel * dt;
    }
}

/// Advances a craft frame by one timestep against the given body frame.
///
/// `flight_frame` is the index of the frame being produced, counted from
/// launch; the correction burn window is evaluated against it. The escape
/// boost thrusts along the prograde perpendicular of the radial from the
/// launch body and shuts off once the relative speed passes the cutoff.
pub fn craft_step(
    frame: &CraftFrame,
    thrust: &ThrustContext,
    flight_frame: usize,
    bodies: &[BodyState],
    masses: &[f64],
    dt: f64,
) -> CraftFrame {
    let mut acc = gravity(frame.pos, bodies, masses);
    if frame.accelerating {
        let radial = bodies[thrust.launch_body].pos.to(&frame.pos);
        acc += radial.perp_unit(thrust.orbit_dir < 0.0) * CRAFT_ACCEL;
    }
    if let Some(burn) = thrust.correction {
        if burn.covers(flight_frame) {
            acc += Vec2D::from_polar(burn.angle, CRAFT_ACCEL);
        }
    }
    let vel = frame.vel + acc * dt;
    let pos = frame.pos + vel * dt;
    let accelerating = frame.accelerating
        && (vel - bodies[thrust.launch_body].vel).abs()
            < ESCAPE_CUTOFF * thrust.escape_velocity;
    CraftFrame {
        pos,
        vel,
        accelerating,
    }
}
