//! Deterministic simulation core: body state, the fixed-step N-body
//! integrator, the rolling prediction buffer and the simulation clock.

mod body;
mod clock;
pub mod integrator;
mod prediction;
pub mod preset;

#[cfg(test)]
mod tests;

pub use body::{Body, BodyFrame, BodyId, BodyState};
pub use clock::SimClock;
pub use integrator::{CorrectionBurn, CraftFrame, ThrustContext};
pub use prediction::{PredictionBuffer, Snapshot};
