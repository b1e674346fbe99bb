use crate::sim::integrator::{self, DT_FIXED};
use crate::sim::{BodyState, CraftFrame, ThrustContext};

/// Simulates a craft forward through a sequence of body frames.
///
/// Each yielded frame is the gravity source for one step; the produced craft
/// frames are aligned one step *after* their source frame. `first_flight_frame`
/// is the flight index assigned to the first produced frame and feeds the
/// correction-burn window, so a mid-trajectory re-simulation passes the index
/// it resumes at.
pub fn simulate_flight<'a, I>(
    start: &CraftFrame,
    thrust: &ThrustContext,
    first_flight_frame: usize,
    frames: I,
    masses: &[f64],
) -> Vec<CraftFrame>
where
    I: IntoIterator<Item = &'a [BodyState]>,
{
    let mut state = *start;
    let mut out = Vec::new();
    for (offset, bodies) in frames.into_iter().enumerate() {
        state = integrator::craft_step(
            &state,
            thrust,
            first_flight_frame + offset,
            bodies,
            masses,
            DT_FIXED,
        );
        out.push(state);
    }
    out
}
