use crate::sim::integrator::{self, DT_FIXED, G};
use crate::sim::{Body, BodyId, BodyState, CorrectionBurn, CraftFrame, PredictionBuffer, ThrustContext};
use crate::util::{BoundedDeque, Vec2D};
use std::f64::consts::TAU;
use strum_macros::Display;

/// Altitude above a body's surface at which craft park after capture.
pub const CRAFT_ORBITAL_ALT: f64 = 5.0;

/// A circular parking orbit around a parent body.
///
/// The craft position is a pure function of the parent's current state and
/// `(altitude, angle)`; nothing here integrates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitRide {
    pub parent: BodyId,
    pub altitude: f64,
    /// Phase angle in radians, wrapped to [0, 2π).
    pub angle: f64,
    /// Angular direction sign, `+1.0` or `-1.0`.
    pub dir: f64,
}

impl OrbitRide {
    pub fn radius(&self, bodies: &[Body]) -> f64 {
        bodies[self.parent].radius() + self.altitude
    }

    pub fn orbital_speed(&self, bodies: &[Body]) -> f64 {
        (G * bodies[self.parent].mass() / self.radius(bodies)).sqrt()
    }

    pub fn angular_velocity(&self, bodies: &[Body]) -> f64 {
        self.orbital_speed(bodies) / self.radius(bodies)
    }

    pub fn position(&self, bodies: &[Body]) -> Vec2D<f64> {
        bodies[self.parent].pos() + Vec2D::from_polar(self.angle, self.radius(bodies))
    }

    pub fn velocity(&self, bodies: &[Body]) -> Vec2D<f64> {
        let tangent = Vec2D::from_polar(self.angle, 1.0).perp_unit(self.dir < 0.0);
        bodies[self.parent].vel() + tangent * self.orbital_speed(bodies)
    }

    /// Advances the phase angle by one timestep of circular motion.
    pub(crate) fn advance(&mut self, bodies: &[Body], dt: f64) {
        self.angle = (self.angle + self.dir * self.angular_velocity(bodies) * dt).rem_euclid(TAU);
    }
}

/// A craft coasting (or boosting) through free space along its trajectory buffer.
#[derive(Debug, Clone)]
pub struct Flight {
    pub(crate) current: CraftFrame,
    pub(crate) trajectory: BoundedDeque<CraftFrame>,
    pub(crate) thrust: ThrustContext,
    /// Number of shifts since launch.
    pub(crate) flight_frame: usize,
    /// Transfer target; `None` for a free launch.
    pub(crate) destination: Option<BodyId>,
    pub(crate) is_correcting: bool,
}

impl Flight {
    pub fn current(&self) -> CraftFrame { self.current }

    pub fn flight_frame(&self) -> usize { self.flight_frame }

    pub fn destination(&self) -> Option<BodyId> { self.destination }

    pub fn is_correcting(&self) -> bool { self.is_correcting }

    pub fn launch_body(&self) -> BodyId { self.thrust.launch_body }

    pub fn trajectory(&self) -> impl Iterator<Item = &CraftFrame> {
        self.trajectory.iter()
    }

    pub fn trajectory_len(&self) -> usize { self.trajectory.len() }
}

/// The craft state machine. `Captured` is `Orbiting` around the transfer target.
#[derive(Debug, Clone, Display)]
pub enum CraftState {
    Orbiting(OrbitRide),
    Free(Flight),
}

/// Side effect of a shift, reported to the caller for bookkeeping and logging.
#[derive(Debug, Clone, Copy)]
pub enum CraftEvent {
    Captured { parent: BodyId },
}

/// A massless agent moving under gravity and optional thrust.
#[derive(Debug, Clone)]
pub struct Craft {
    id: usize,
    name: String,
    state: CraftState,
}

/// Launch-instant kinematics from a parking orbit: position on the orbit
/// circle and the tangential velocity in the chosen direction, escape boost
/// armed. Returns the frame and the escape velocity at that radius.
pub(crate) fn launch_frame_at(
    parent: &BodyState,
    parent_mass: f64,
    radius: f64,
    angle: f64,
    tangent_dir: f64,
) -> (CraftFrame, f64) {
    let speed = (G * parent_mass / radius).sqrt();
    let radial = Vec2D::from_polar(angle, 1.0);
    let frame = CraftFrame {
        pos: parent.pos + radial * radius,
        vel: parent.vel + radial.perp_unit(tangent_dir < 0.0) * speed,
        accelerating: true,
    };
    (frame, (2.0 * G * parent_mass / radius).sqrt())
}

impl Craft {
    pub(crate) fn new(id: usize, name: String, orbit: OrbitRide) -> Self {
        Self {
            id,
            name,
            state: CraftState::Orbiting(orbit),
        }
    }

    pub fn id(&self) -> usize { self.id }

    pub fn name(&self) -> &str { &self.name }

    pub fn state(&self) -> &CraftState { &self.state }

    /// The parking orbit, if the craft is in one.
    pub fn orbit(&self) -> Option<&OrbitRide> {
        match &self.state {
            CraftState::Orbiting(orbit) => Some(orbit),
            CraftState::Free(_) => None,
        }
    }

    pub fn position(&self, bodies: &[Body]) -> Vec2D<f64> {
        match &self.state {
            CraftState::Orbiting(orbit) => orbit.position(bodies),
            CraftState::Free(flight) => flight.current.pos,
        }
    }

    pub fn velocity(&self, bodies: &[Body]) -> Vec2D<f64> {
        match &self.state {
            CraftState::Orbiting(orbit) => orbit.velocity(bodies),
            CraftState::Free(flight) => flight.current.vel,
        }
    }

    /// Consumes one shift event: advances the parking orbit, or pops the next
    /// trajectory frame and captures when a transfer trajectory runs out.
    pub(crate) fn on_shift(&mut self, bodies: &[Body]) -> Option<CraftEvent> {
        let mut arrived: Option<(BodyId, CraftFrame)> = None;
        match &mut self.state {
            CraftState::Orbiting(orbit) => orbit.advance(bodies, DT_FIXED),
            CraftState::Free(flight) => {
                if let Some(frame) = flight.trajectory.pop_front() {
                    flight.current = frame;
                    flight.flight_frame += 1;
                    flight.is_correcting = flight
                        .thrust
                        .correction
                        .is_some_and(|burn| burn.covers(flight.flight_frame - 1));
                }
                if flight.trajectory.is_empty() {
                    if let Some(dest) = flight.destination {
                        arrived = Some((dest, flight.current));
                    }
                }
            }
        }
        let (dest, frame) = arrived?;
        self.state = CraftState::Orbiting(Self::capture_orbit(dest, &frame, bodies));
        Some(CraftEvent::Captured { parent: dest })
    }

    /// Orbit insertion: snap onto the capture circle at the current bearing,
    /// keeping the angular direction the craft arrived with.
    fn capture_orbit(dest: BodyId, frame: &CraftFrame, bodies: &[Body]) -> OrbitRide {
        let body = &bodies[dest];
        let radial = body.pos().to(&frame.pos);
        let dir = if radial.cross(&(frame.vel - body.vel())) >= 0.0 { 1.0 } else { -1.0 };
        OrbitRide {
            parent: dest,
            altitude: CRAFT_ORBITAL_ALT,
            angle: radial.angle().rem_euclid(TAU),
            dir,
        }
    }

    /// Escape launch without a plan: the trajectory buffer is generated
    /// in-line against the current prediction buffer.
    pub(crate) fn launch_free(&mut self, bodies: &[Body], prediction: &PredictionBuffer) -> bool {
        let Some(orbit) = self.orbit().copied() else { return false };
        let parent = bodies[orbit.parent].state();
        let (current, escape_velocity) = launch_frame_at(
            &parent,
            bodies[orbit.parent].mass(),
            orbit.radius(bodies),
            orbit.angle,
            orbit.dir,
        );
        let thrust = ThrustContext {
            launch_body: orbit.parent,
            orbit_dir: orbit.dir,
            escape_velocity,
            correction: None,
        };
        let now: Vec<BodyState> = bodies.iter().map(Body::state).collect();
        let sources = std::iter::once(now.as_slice()).chain(
            (0..prediction.len().saturating_sub(1))
                .map(|i| prediction.frame(i).expect("index within buffer").as_ref()),
        );
        let frames = super::trajectory::simulate_flight(
            &current,
            &thrust,
            0,
            sources,
            prediction.masses(),
        );
        let mut trajectory = BoundedDeque::new(PredictionBuffer::horizon_frames());
        for frame in frames {
            trajectory.push(frame);
        }
        self.state = CraftState::Free(Flight {
            current,
            trajectory,
            thrust,
            flight_frame: 0,
            destination: None,
            is_correcting: false,
        });
        true
    }

    /// Transfer launch: adopts a precomputed trajectory, correction burn and
    /// destination. The trajectory is the plan; it is never extended.
    pub(crate) fn launch_transfer(
        &mut self,
        bodies: &[Body],
        trajectory: &[CraftFrame],
        correction: Option<CorrectionBurn>,
        destination: BodyId,
        tangent_dir: f64,
    ) -> bool {
        let Some(orbit) = self.orbit().copied() else { return false };
        let parent = bodies[orbit.parent].state();
        let (current, escape_velocity) = launch_frame_at(
            &parent,
            bodies[orbit.parent].mass(),
            orbit.radius(bodies),
            orbit.angle,
            tangent_dir,
        );
        let thrust = ThrustContext {
            launch_body: orbit.parent,
            orbit_dir: tangent_dir,
            escape_velocity,
            correction,
        };
        let mut buffer = BoundedDeque::new(PredictionBuffer::horizon_frames());
        for frame in trajectory {
            buffer.push(*frame);
        }
        self.state = CraftState::Free(Flight {
            current,
            trajectory: buffer,
            thrust,
            flight_frame: 0,
            destination: Some(destination),
            is_correcting: false,
        });
        true
    }

    /// Keeps a free (non-transfer) craft's trajectory as long as the
    /// prediction buffer; caps at the horizon like the buffer itself.
    pub(crate) fn extend_trajectory(&mut self, bodies: &[Body], prediction: &PredictionBuffer) {
        let CraftState::Free(flight) = &mut self.state else { return };
        if flight.destination.is_some() {
            return;
        }
        while flight.trajectory.len() < prediction.len() {
            let k = flight.trajectory.len();
            let last = flight.trajectory.back().copied().unwrap_or(flight.current);
            let produced = if k == 0 {
                let now: Vec<BodyState> = bodies.iter().map(Body::state).collect();
                integrator::craft_step(
                    &last,
                    &flight.thrust,
                    flight.flight_frame,
                    &now,
                    prediction.masses(),
                    DT_FIXED,
                )
            } else {
                integrator::craft_step(
                    &last,
                    &flight.thrust,
                    flight.flight_frame + k,
                    prediction.frame(k - 1).expect("index within buffer"),
                    prediction.masses(),
                    DT_FIXED,
                )
            };
            if !flight.trajectory.push(produced) {
                break;
            }
        }
    }
}
