use crate::util::Vec2D;
use serde::{Deserialize, Serialize};

/// Stable index of a body in the dense body array of a world.
pub type BodyId = usize;

/// Kinematic state of a single body at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    pub pos: Vec2D<f64>,
    pub vel: Vec2D<f64>,
}

/// One prediction frame: the state of every body, indexed by [`BodyId`].
pub type BodyFrame = Box<[BodyState]>;

/// A gravitationally massive body.
///
/// Mass and radius are immutable after initialization; position and velocity
/// are only ever adopted from frames popped off the prediction buffer.
#[derive(Debug, Clone)]
pub struct Body {
    id: BodyId,
    name: String,
    mass: f64,
    radius: f64,
    state: BodyState,
}

impl Body {
    pub fn new(id: BodyId, name: String, mass: f64, radius: f64, state: BodyState) -> Self {
        Self {
            id,
            name,
            mass,
            radius,
            state,
        }
    }

    pub fn id(&self) -> BodyId { self.id }

    pub fn name(&self) -> &str { &self.name }

    pub fn mass(&self) -> f64 { self.mass }

    pub fn radius(&self) -> f64 { self.radius }

    pub fn pos(&self) -> Vec2D<f64> { self.state.pos }

    pub fn vel(&self) -> Vec2D<f64> { self.state.vel }

    pub fn state(&self) -> BodyState { self.state }

    /// Adopts a popped prediction frame state as the visible state.
    pub(crate) fn adopt(&mut self, state: BodyState) { self.state = state; }
}
