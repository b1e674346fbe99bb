#![warn(clippy::shadow_reuse, clippy::shadow_same, clippy::builtin_type_shadow)]

//! Deterministic N-body trajectory prediction and transfer planning core.
//!
//! The crate is built around a fixed-step symplectic integrator that fills a
//! rolling [`PredictionBuffer`](sim::PredictionBuffer) of future body states.
//! The main loop advances in lock-step with its own predictions, craft ride
//! the buffer through a launch/coast/capture state machine, and a worker pool
//! sweeps future launch frames for acceptable rendezvous trajectories.

pub mod craft;
pub mod logger;
pub mod planner;
pub mod sim;
pub mod util;
mod world;

pub use craft::{Craft, CraftState, OrbitRide};
pub use planner::{TransferPlan, TransferState};
pub use sim::preset::Preset;
pub use world::{PresetError, TransferError, World};
