use super::plan::{RejectedCandidate, TransferPlan, TRAJECTORY_SAMPLE_STRIDE};
use super::registry::PlanRegistry;
use super::search::{SearchParams, TransferSearch};
use super::TransferState;
use crate::craft::{launch_frame_at, simulate_flight, CRAFT_ORBITAL_ALT};
use crate::sim::integrator::{DT_FIXED, G};
use crate::sim::preset::Preset;
use crate::sim::{BodyState, CraftFrame, PredictionBuffer, Snapshot, ThrustContext};
use crate::util::Vec2D;
use crate::world::{TransferError, World};
use crate::{info, log};
use std::sync::Arc;
use std::time::Duration;

fn dummy_plan(launch: usize, arrival: usize, score: f64) -> TransferPlan {
    TransferPlan {
        source: 1,
        dest: 2,
        launch_frame: launch,
        arrival_frame: arrival,
        score,
        trajectory: vec![CraftFrame {
            pos: Vec2D::zero(),
            vel: Vec2D::zero(),
            accelerating: false,
        }]
        .into(),
        insertion_frame: 0,
        correction: None,
        orbit_dir: 1.0,
        sample_offset: launch % TRAJECTORY_SAMPLE_STRIDE,
    }
}

#[test]
fn frame_constants_match_reference_configuration() {
    assert_eq!(TransferSearch::min_lead_frames(), 152);
    assert_eq!(TransferSearch::runway_frames(), 6061);
    assert_eq!(TransferSearch::max_burn_frames(), 304);
    assert_eq!(PredictionBuffer::horizon_frames(), 10910);
}

#[test]
fn transfer_request_contract_errors() {
    let preset = Preset::inner_system();
    let mut world = World::new(&preset).unwrap();
    let ember = world.body_id("Ember").unwrap();

    // Destination == source aborts before the planner is ever involved.
    assert_eq!(world.request_transfer(0, ember), Err(TransferError::SameBody));
    assert_eq!(world.transfer_state(), TransferState::None);

    assert_eq!(world.request_transfer(7, 2), Err(TransferError::UnknownCraft(7)));
    assert_eq!(world.request_transfer(0, 99), Err(TransferError::UnknownBody(99)));

    world.launch_craft(0).unwrap();
    assert_eq!(world.request_transfer(0, 2), Err(TransferError::NotOrbiting));

    assert_eq!(world.schedule_transfer(), Err(TransferError::NoActiveTransfer));
}

#[test]
fn registry_orders_by_arrival_and_rebases_on_ingest() {
    let mut registry = PlanRegistry::new();
    // Results arrive out of order and against snapshots of different ages.
    registry.ingest(vec![dummy_plan(700, 950, 2.0)], None, 0);
    registry.ingest(vec![dummy_plan(300, 500, 3.0)], None, 10);
    registry.ingest(vec![dummy_plan(500, 600, 1.0)], None, 0);

    let arrivals: Vec<usize> =
        registry.acceptable().iter().map(|p| p.arrival_frame).collect();
    assert_eq!(arrivals, vec![490, 600, 950]);
    let launches: Vec<usize> =
        registry.acceptable().iter().map(|p| p.launch_frame).collect();
    assert_eq!(launches, vec![290, 500, 700]);

    // A result whose launch time already passed is discarded on receipt.
    registry.ingest(vec![dummy_plan(5, 100, 0.5)], None, 5);
    assert_eq!(registry.acceptable().len(), 3);

    for plan in registry.acceptable() {
        assert!(plan.launch_frame > 0);
        assert!(plan.launch_frame <= plan.arrival_frame);
        assert!(plan.arrival_frame <= PredictionBuffer::horizon_frames());
    }
}

#[test]
fn registry_same_launch_frame_is_idempotent() {
    let mut registry = PlanRegistry::new();
    registry.ingest(vec![dummy_plan(500, 800, 4.0)], None, 0);
    registry.ingest(vec![dummy_plan(500, 650, 2.5)], None, 0);
    assert_eq!(registry.acceptable().len(), 1);
    let best = registry.current_best().unwrap();
    assert_eq!(best.arrival_frame, 650);
    assert_eq!(best.score, 2.5);
}

#[test]
fn registry_expires_plans_as_launch_passes() {
    let mut registry = PlanRegistry::new();
    registry.ingest(
        vec![dummy_plan(3, 400, 1.0), dummy_plan(200, 500, 2.0)],
        Some(RejectedCandidate {
            launch_frame: 2,
            score: 7.0,
        }),
        0,
    );
    assert_eq!(registry.acceptable().len(), 2);

    registry.on_shift();
    registry.on_shift();
    assert_eq!(registry.acceptable().len(), 2);
    assert_eq!(registry.current_best().unwrap().launch_frame, 1);

    // Third shift: the near plan and the rejected candidate both expire.
    registry.on_shift();
    assert_eq!(registry.acceptable().len(), 1);
    assert_eq!(registry.current_best().unwrap().launch_frame, 197);
    assert!(registry.best_rejected().is_none());
}

#[test]
fn scheduled_launch_fires_exactly_at_zero() {
    let mut registry = PlanRegistry::new();
    let plan = dummy_plan(3, 400, 1.0);
    registry.ingest(vec![plan.clone()], None, 0);
    assert!(registry.schedule(registry.current_best().unwrap().clone()));

    assert!(registry.on_shift().is_none());
    assert!(registry.on_shift().is_none());
    let fired = registry.on_shift();
    assert!(fired.is_some(), "countdown reached zero without firing");
    assert!(registry.scheduled().is_none());
    assert!(registry.on_shift().is_none(), "launch fired twice");
}

#[test]
fn zero_lead_launch_is_rejected() {
    let mut registry = PlanRegistry::new();
    assert!(!registry.schedule(dummy_plan(0, 100, 1.0)));
}

#[test]
fn route_cache_survives_restart() {
    let mut registry = PlanRegistry::new();
    registry.ingest(vec![dummy_plan(500, 800, 2.0)], None, 0);

    // A replan cycle later, the same route re-seeds from the cache.
    registry.reset_search(1, 2);
    let seeded = registry.current_best().expect("cache did not re-seed");
    assert_eq!(seeded.launch_frame, 500);
    assert!(seeded.score <= 2.0);

    // A different route starts empty.
    registry.reset_search(0, 2);
    assert!(registry.current_best().is_none());
}

#[test]
fn cache_entries_expire_like_plans() {
    let mut registry = PlanRegistry::new();
    registry.ingest(vec![dummy_plan(2, 100, 1.0)], None, 0);
    registry.on_shift();
    registry.on_shift();
    registry.reset_search(1, 2);
    assert!(registry.current_best().is_none(), "expired cache entry re-seeded");
}

fn full_snapshot(preset: &Preset) -> (Snapshot, Vec<f64>) {
    let states: Box<[BodyState]> = preset
        .bodies
        .iter()
        .map(|def| BodyState {
            pos: def.pos,
            vel: def.vel,
        })
        .collect();
    let masses: Arc<[f64]> = preset.bodies.iter().map(|def| def.mass).collect();
    let mut buffer = PredictionBuffer::new(Arc::clone(&masses), states);
    while buffer.len() < PredictionBuffer::horizon_frames() {
        buffer.extend(PredictionBuffer::MAX_CATCHUP);
    }
    (buffer.snapshot(), masses.to_vec())
}

/// The search is a pure function of its snapshot: identical inputs give
/// identical outcomes, and an acceptable plan's corrected simulation replays
/// to the same score.
#[test]
fn search_results_replay_deterministically() {
    let preset = Preset::inner_system();
    let (snapshot, masses) = full_snapshot(&preset);
    let params = SearchParams {
        source: 1,
        dest: 2,
        source_radius: 15.0,
        dest_radius: 25.0,
        altitude: CRAFT_ORBITAL_ALT,
        angle: 0.0,
        orbit_dir: 1.0,
    };
    let search = TransferSearch::new(snapshot.clone(), params);

    let lead = TransferSearch::min_lead_frames();
    let first = search.search_batch(lead, lead + TransferSearch::BATCH_SIZE);
    let second = search.search_batch(lead, lead + TransferSearch::BATCH_SIZE);
    assert_eq!(first.acceptable.len(), second.acceptable.len());
    for (a, b) in first.acceptable.iter().zip(&second.acceptable) {
        assert_eq!(a.score, b.score);
        assert_eq!(a.launch_frame, b.launch_frame);
        assert_eq!(a.arrival_frame, b.arrival_frame);
        assert_eq!(a.insertion_frame, b.insertion_frame);
        assert_eq!(a.correction, b.correction);
    }

    // Hunt a few batches for an acceptable plan and replay it from scratch.
    let mut found = first.acceptable.into_iter().next();
    let mut start = lead + TransferSearch::BATCH_SIZE;
    while found.is_none() && start < lead + 10 * TransferSearch::BATCH_SIZE {
        found = search
            .search_batch(start, start + TransferSearch::BATCH_SIZE)
            .acceptable
            .into_iter()
            .next();
        start += TransferSearch::BATCH_SIZE;
    }
    let Some(plan) = found else {
        log!("no acceptable plan in the probed range; determinism still verified");
        return;
    };

    let radius = params.source_radius + params.altitude;
    let mass = masses[params.source];
    let omega = (G * mass / radius).sqrt() / radius;
    let angle = params.angle + params.orbit_dir * omega * plan.launch_frame as f64 * DT_FIXED;
    let parent = snapshot.body_state(plan.launch_frame - 1, params.source);
    let (launch, escape_velocity) =
        launch_frame_at(&parent, mass, radius, angle, plan.orbit_dir);
    let thrust = ThrustContext {
        launch_body: params.source,
        orbit_dir: plan.orbit_dir,
        escape_velocity,
        correction: plan.correction,
    };
    let sources =
        (plan.launch_frame..snapshot.len()).map(|i| snapshot.frame(i - 1));
    let replay = simulate_flight(&launch, &thrust, 0, sources, &masses);

    let ideal = params.dest_radius + CRAFT_ORBITAL_ALT;
    let distances: Vec<f64> = replay
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            frame
                .pos
                .euclid_distance(&snapshot.body_state(plan.launch_frame + i, params.dest).pos)
        })
        .collect();
    let mut insertion = 0;
    for (i, &d) in distances.iter().enumerate() {
        if d < distances[insertion] {
            insertion = i;
        }
    }
    assert_eq!(insertion, plan.insertion_frame);
    let window = &distances[insertion..(insertion + 20).min(distances.len())];
    let replay_score =
        window.iter().map(|d| (d - ideal).abs()).sum::<f64>() / window.len() as f64;
    assert!(
        (replay_score - plan.score).abs() < 1e-9,
        "replayed score {replay_score} vs planned {plan_score}",
        plan_score = plan.score
    );
    info!("replayed plan at launch frame {} with score {:.4}", plan.launch_frame, plan.score);
}

/// End-to-end: the planner finds an acceptable Ember -> Terra window, the
/// registry stays shift-consistent, and the scheduled launch ends in capture
/// at the target altitude.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn transfer_search_finds_and_flies_a_plan() {
    use crate::craft::CraftState;

    let preset = Preset::inner_system();
    let mut world = World::new(&preset).unwrap();
    let terra = world.body_id("Terra").unwrap();
    world.set_speed(4);
    world.request_transfer(0, terra).unwrap();
    assert_eq!(world.transfer_state(), TransferState::Searching);

    let mut ready = false;
    for i in 0..200_000 {
        world.tick(0.01);
        if world.transfer_state() == TransferState::Ready {
            ready = true;
            break;
        }
        if i % 64 == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
    assert!(ready, "no acceptable plan found");

    let best = world.best_plan().unwrap().clone();
    assert!(best.score <= TransferSearch::POST_OPT_THRESHOLD);
    assert!(best.launch_frame > 0);
    let plans = world.acceptable_plans();
    for pair in plans.windows(2) {
        assert!(pair[0].arrival_frame <= pair[1].arrival_frame);
    }
    for plan in plans {
        assert!(plan.launch_frame > 0);
        assert!(plan.launch_frame <= plan.arrival_frame);
        assert!(plan.arrival_frame <= PredictionBuffer::horizon_frames());
    }

    // Shift consistency: run a handful of exact steps and compare indices.
    world.pause();
    let l0 = world.best_plan().unwrap().launch_frame;
    let a0 = world.best_plan().unwrap().arrival_frame;
    let saved: Vec<BodyState> =
        (0..16).map(|i| world.prediction().frame(i).unwrap()[terra]).collect();
    world.resume();
    world.set_speed(1);
    world.tick(10.0 * DT_FIXED + 1e-9);
    world.pause();
    let now = world.bodies()[terra].state();
    let shifts = saved.iter().position(|s| *s == now).unwrap() + 1;
    if let Some(tracked) = world
        .acceptable_plans()
        .iter()
        .find(|p| p.arrival_frame + shifts == a0 && p.score == best.score)
    {
        assert_eq!(tracked.launch_frame + shifts, l0);
    }
    world.resume();

    // Schedule the best plan (re-searching if it expired under us) and fly it out.
    world.set_speed(16);
    for _ in 0..200_000 {
        if world.schedule_transfer().is_ok() {
            break;
        }
        world.tick(0.01);
        tokio::task::yield_now().await;
    }
    assert_eq!(world.transfer_state(), TransferState::Scheduled);

    let mut captured = false;
    for i in 0..400_000 {
        world.tick(0.01);
        if let CraftState::Orbiting(orbit) = world.crafts()[0].state() {
            if orbit.parent == terra {
                captured = true;
                break;
            }
        }
        if i % 64 == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
    assert!(captured, "scheduled transfer did not end in capture");
    assert_eq!(world.transfer_state(), TransferState::None);

    let CraftState::Orbiting(orbit) = world.crafts()[0].state() else {
        unreachable!();
    };
    assert_eq!(orbit.altitude, CRAFT_ORBITAL_ALT);
    let relative_speed =
        (world.crafts()[0].velocity(world.bodies()) - world.bodies()[terra].vel()).abs();
    let circular = (G * world.bodies()[terra].mass() / (25.0 + CRAFT_ORBITAL_ALT)).sqrt();
    assert!(
        (relative_speed - circular).abs() < 0.1,
        "capture speed {relative_speed} vs circular {circular}"
    );
}

/// Restarting the same route while the buffer has not shifted re-seeds the
/// cached plan with a score no worse than the original.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_and_restart_hits_the_cache() {
    let preset = Preset::inner_system();
    let mut world = World::new(&preset).unwrap();
    let terra = world.body_id("Terra").unwrap();
    world.request_transfer(0, terra).unwrap();

    let mut ready = false;
    for i in 0..200_000 {
        world.tick(0.01);
        if world.transfer_state() == TransferState::Ready {
            ready = true;
            break;
        }
        if i % 64 == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
    assert!(ready, "no acceptable plan found");
    let original = world.best_plan().unwrap().score;

    world.pause();
    world.cancel_transfer();
    assert_eq!(world.transfer_state(), TransferState::None);

    world.request_transfer(0, terra).unwrap();
    let seeded = world.best_plan().expect("cache hit did not re-seed");
    assert!(seeded.score <= original);
}
