//! Craft state machine: parked orbits, free flight along a precomputed
//! trajectory buffer, and orbit-insertion capture.

mod state;
mod trajectory;


pub use state::{Craft, CraftEvent, CraftState, Flight, OrbitRide, CRAFT_ORBITAL_ALT};
pub(crate) use state::launch_frame_at;
pub use trajectory::simulate_flight;
