#![warn(clippy::shadow_reuse, clippy::shadow_same, clippy::builtin_type_shadow)]

//! Headless demo: loads the inner-system preset, plans a transfer from the
//! inner planet to the outer one, schedules the first acceptable plan and
//! runs until the craft is captured.

use orrery::{error, fatal, info, log, CraftState, Preset, TransferState, World};
use std::time::Duration;

/// Wall-clock seconds fed to the world per loop iteration.
const TICK_DT: f64 = 0.05;
/// Bail-out bound for the demo loop.
const MAX_TICKS: usize = 200_000;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    let preset = Preset::named("inner-system")
        .unwrap_or_else(|| fatal!("inner-system preset missing"));
    let mut world = World::new(&preset).unwrap_or_else(|e| fatal!("preset rejected: {e}"));
    world.set_speed(8);

    let craft_id = 0;
    let destination = world.body_id("Terra").unwrap_or_else(|| fatal!("no Terra in preset"));
    if let Err(e) = world.request_transfer(craft_id, destination) {
        fatal!("transfer request rejected: {e}");
    }

    let mut last_state = TransferState::Searching;
    for tick in 0..MAX_TICKS {
        world.tick(TICK_DT);

        let state = world.transfer_state();
        if state != last_state {
            log!("transfer state: {last_state} -> {state}");
            last_state = state;
        }
        if state == TransferState::Ready {
            if let Some(best) = world.best_plan() {
                info!(
                    "scheduling best plan: launch in {} frames, score {:.3}",
                    best.launch_frame, best.score
                );
            }
            if let Err(e) = world.schedule_transfer() {
                error!("scheduling failed: {e}");
            }
        }

        match world.crafts()[craft_id].state() {
            CraftState::Orbiting(orbit) if orbit.parent == destination => {
                info!("arrived after {tick} ticks; craft parked at altitude {}", orbit.altitude);
                return;
            }
            _ => {}
        }

        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    error!("demo ended without capture after {MAX_TICKS} ticks");
}
