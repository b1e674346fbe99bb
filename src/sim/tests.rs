use super::integrator::{self, DT_FIXED, G};
use super::preset::Preset;
use super::{BodyState, PredictionBuffer, SimClock};
use crate::util::Vec2D;
use crate::world::World;
use itertools::Itertools;
use std::sync::Arc;

fn sol_terra_states() -> (Vec<BodyState>, Vec<f64>) {
    let preset = Preset::sol_terra();
    let states = preset
        .bodies
        .iter()
        .map(|def| BodyState {
            pos: def.pos,
            vel: def.vel,
        })
        .collect();
    let masses = preset.bodies.iter().map(|def| def.mass).collect();
    (states, masses)
}

#[test]
fn integrator_is_deterministic() {
    let (mut a, masses) = sol_terra_states();
    let mut b = a.clone();
    for _ in 0..1000 {
        integrator::step(&mut a, &masses, DT_FIXED);
        integrator::step(&mut b, &masses, DT_FIXED);
    }
    assert_eq!(a, b);
}

#[test]
fn gravity_is_clamped_at_singularity() {
    let states = [BodyState {
        pos: Vec2D::new(0.0, 0.0),
        vel: Vec2D::zero(),
    }];
    // A probe sitting almost on top of a body sees a finite pull.
    let acc = integrator::gravity(Vec2D::new(1e-12, 0.0), &states, &[1000.0]);
    assert!(acc.is_finite());
    assert!(acc.abs() <= G * 1000.0 / (integrator::MIN_DIST * integrator::MIN_DIST));
}

/// Terra completes a closed loop around Sol: after one full revolution of the
/// relative vector the pair is back where it started, and the revolution
/// takes roughly the circular-orbit estimate.
#[test]
fn two_body_orbit_is_stable() {
    let (mut states, masses) = sol_terra_states();
    let start_rel = states[0].pos.to(&states[1].pos);
    let circular_period = std::f64::consts::TAU * 600.0 / (G * 1000.0_f64 / 600.0).sqrt();

    let mut swept = 0.0;
    let mut previous = start_rel;
    let mut elapsed = 0.0;
    while swept < std::f64::consts::TAU {
        integrator::step(&mut states, &masses, DT_FIXED);
        elapsed += DT_FIXED;
        let rel = states[0].pos.to(&states[1].pos);
        swept += rel.cross(&previous).atan2(rel.dot(&previous)).abs();
        previous = rel;
        assert!(
            elapsed < 2.0 * circular_period,
            "no closed revolution within twice the circular period"
        );
    }

    let rel = states[0].pos.to(&states[1].pos);
    assert!(
        rel.euclid_distance(&start_rel) < 5.0,
        "orbit did not close: relative offset {}",
        rel.euclid_distance(&start_rel)
    );
    assert!(
        (elapsed - circular_period).abs() / circular_period < 0.10,
        "revolution took {elapsed:.1}s, expected about {circular_period:.1}s"
    );
}

/// Total mechanical energy drifts less than 2% over 100 simulated seconds.
#[test]
fn two_body_energy_is_conserved() {
    fn total_energy(states: &[BodyState], masses: &[f64]) -> f64 {
        let kinetic: f64 =
            states.iter().zip(masses).map(|(s, m)| 0.5 * m * s.vel.abs_sq()).sum();
        let potential: f64 = states
            .iter()
            .zip(masses)
            .combinations(2)
            .map(|pair| {
                let (a, mass_a) = pair[0];
                let (b, mass_b) = pair[1];
                -G * mass_a * mass_b / a.pos.euclid_distance(&b.pos)
            })
            .sum();
        kinetic + potential
    }

    let (mut states, masses) = sol_terra_states();
    let initial = total_energy(&states, &masses);
    let steps = (100.0 / DT_FIXED) as usize;
    for _ in 0..steps {
        integrator::step(&mut states, &masses, DT_FIXED);
        let drift = (total_energy(&states, &masses) - initial).abs() / initial.abs();
        assert!(drift < 0.02, "energy drifted by {:.3}%", drift * 100.0);
    }
}

/// Frame k of the buffer equals `step^(k+1)` of the visible state, exactly.
#[test]
fn prediction_matches_direct_integration() {
    let (states, masses) = sol_terra_states();
    let masses: Arc<[f64]> = masses.into();
    let mut buffer = PredictionBuffer::new(Arc::clone(&masses), states.clone().into_boxed_slice());
    buffer.extend(PredictionBuffer::MAX_CATCHUP);

    let mut manual = states;
    for k in 0..buffer.len() {
        integrator::step(&mut manual, &masses, DT_FIXED);
        assert_eq!(buffer.frame(k).unwrap().as_ref(), manual.as_slice(), "frame {k} diverged");
    }
}

#[test]
fn prediction_extension_caps_at_horizon() {
    let (states, masses) = sol_terra_states();
    let mut buffer = PredictionBuffer::new(masses.into(), states.into_boxed_slice());
    for _ in 0..PredictionBuffer::horizon_frames() / PredictionBuffer::MAX_CATCHUP + 2 {
        buffer.extend(PredictionBuffer::MAX_CATCHUP);
    }
    assert_eq!(buffer.len(), PredictionBuffer::horizon_frames());
    buffer.extend(PredictionBuffer::MAX_CATCHUP);
    assert_eq!(buffer.len(), PredictionBuffer::horizon_frames());
}

#[test]
fn clock_extracts_whole_steps() {
    let mut clock = SimClock::new();
    clock.accumulate(0.1);
    assert_eq!(clock.pending(), 3);
    for _ in 0..3 {
        clock.consume();
    }
    assert_eq!(clock.pending(), 0);

    let mut fast = SimClock::new();
    assert!(fast.set_speed(16));
    fast.accumulate(0.1);
    // 1.6 accumulated seconds -> floor(1.6 / 0.033) steps.
    assert_eq!(fast.pending(), 48);
}

#[test]
fn clock_rejects_invalid_speed() {
    let mut clock = SimClock::new();
    assert!(!clock.set_speed(3));
    assert!(!clock.set_speed(0));
    assert_eq!(clock.speed(), 1);
    for speed in SimClock::SPEED_STEPS {
        assert!(clock.set_speed(speed));
    }
}

#[test]
fn paused_clock_ignores_time() {
    let mut clock = SimClock::new();
    clock.pause();
    clock.accumulate(10.0);
    assert_eq!(clock.pending(), 0);
    clock.resume();
    clock.accumulate(DT_FIXED);
    assert_eq!(clock.pending(), 1);
}

/// Pausing and resuming for equal unpaused durations matches running straight
/// through, state for state.
#[test]
fn pause_resume_matches_straight_run() {
    let preset = Preset::sol_terra();
    let mut straight = World::new(&preset).unwrap();
    let mut interrupted = World::new(&preset).unwrap();

    for _ in 0..20 {
        straight.tick(0.25);
        straight.tick(0.25);

        interrupted.tick(0.25);
        interrupted.pause();
        interrupted.tick(17.3);
        interrupted.resume();
        interrupted.tick(0.25);
    }

    for (a, b) in straight.bodies().iter().zip(interrupted.bodies()) {
        assert_eq!(a.state(), b.state());
    }
}

/// Reset discards all buffers and reloads the preset from scratch.
#[test]
fn reset_restores_preset_state() {
    let preset = Preset::sol_terra();
    let mut world = World::new(&preset).unwrap();
    world.tick(5.0);
    let moved = world.bodies()[1].state();
    world.reset(&preset).unwrap();
    assert_ne!(world.bodies()[1].state(), moved);
    assert_eq!(world.bodies()[1].pos(), Vec2D::new(600.0, 0.0));
    assert_eq!(world.speed(), 1);
}

/// A consumer sees exactly `floor(accum/dt)` shifts per tick, in order.
#[test]
fn tick_consumes_expected_shift_count() {
    let preset = Preset::sol_terra();
    let mut world = World::new(&preset).unwrap();
    let before = world.bodies()[1].state();
    let expected = world.prediction().frame(2).unwrap()[1];

    // 3 * dt + a hair: exactly three shifts.
    world.tick(3.0 * DT_FIXED + 1e-9);
    assert_ne!(world.bodies()[1].state(), before);
    assert_eq!(world.bodies()[1].state(), expected);
}
