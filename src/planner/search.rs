use crate::craft::{simulate_flight, CRAFT_ORBITAL_ALT};
use crate::craft::launch_frame_at;
use crate::planner::plan::{RejectedCandidate, TransferPlan, TRAJECTORY_SAMPLE_STRIDE};
use crate::sim::integrator::DT_FIXED;
use crate::sim::{BodyId, CorrectionBurn, CraftFrame, Snapshot, ThrustContext};

/// Orbit geometry of the requesting craft at the snapshot instant, plus the
/// endpoints of the transfer.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    pub source: BodyId,
    pub dest: BodyId,
    pub source_radius: f64,
    pub dest_radius: f64,
    /// Craft altitude above the source surface.
    pub altitude: f64,
    /// Orbit phase angle at the snapshot instant.
    pub angle: f64,
    /// Direction the parking orbit actually advances in.
    pub orbit_dir: f64,
}

/// Output of one batch of candidate launch frames.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub acceptable: Vec<TransferPlan>,
    pub best_rejected: Option<RejectedCandidate>,
}

/// Candidate search over one snapshot: per launch frame, a base trajectory
/// simulation, a conditional correction-burn optimization, and acceptance
/// classification.
#[derive(Debug)]
pub struct TransferSearch {
    snapshot: Snapshot,
    params: SearchParams,
}

impl TransferSearch {
    /// No launches scheduled sooner than this.
    pub const MIN_LAUNCH_LEAD: f64 = 5.0;
    /// A launch must leave at least this much remaining horizon.
    pub const MIN_TRAJECTORY_RUNWAY: f64 = 200.0;
    /// Launch frames per work unit.
    pub const BATCH_SIZE: usize = 50;
    /// Base score at or below which the correction optimizer runs.
    pub const PRE_OPT_THRESHOLD: f64 = 20.0;
    /// Corrected score at or below which a trajectory is acceptable.
    pub const POST_OPT_THRESHOLD: f64 = 5.0;
    /// Hard stop for the coordinate descent.
    pub const MAX_ITERATIONS: usize = 10_000;
    /// Width of the post-insertion scoring window, in frames.
    const SCORE_WINDOW: usize = 20;
    /// Angle neighbor step of the descent, in degrees.
    const ANGLE_STEP_DEG: f64 = 0.1;
    /// Upper bound on burn duration, in seconds.
    const MAX_BURN_TIME: f64 = 10.0;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn min_lead_frames() -> usize {
        (Self::MIN_LAUNCH_LEAD / DT_FIXED).ceil() as usize
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn runway_frames() -> usize {
        (Self::MIN_TRAJECTORY_RUNWAY / DT_FIXED).ceil() as usize
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn max_burn_frames() -> usize {
        (Self::MAX_BURN_TIME / DT_FIXED).ceil() as usize
    }

    pub fn new(snapshot: Snapshot, params: SearchParams) -> Self {
        Self { snapshot, params }
    }

    /// Ideal craft-to-destination distance: the capture altitude circle.
    fn ideal_distance(&self) -> f64 {
        self.params.dest_radius + CRAFT_ORBITAL_ALT
    }

    /// Evaluates every launch frame in `[frame_start, frame_end)`, probing
    /// both tangent directions, and returns all acceptable trajectories plus
    /// the best rejected fallback.
    pub fn search_batch(&self, frame_start: usize, frame_end: usize) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let limit = self.snapshot.len().saturating_sub(Self::runway_frames());
        for launch_frame in frame_start.max(1)..frame_end.min(limit) {
            let mut best: Option<TransferPlan> = None;
            let mut best_rejected_score = f64::INFINITY;
            for dir in [self.params.orbit_dir, -self.params.orbit_dir] {
                match self.evaluate(launch_frame, dir) {
                    Ok(plan) => {
                        if best.as_ref().is_none_or(|b| plan.score < b.score) {
                            best = Some(plan);
                        }
                    }
                    Err(score) => best_rejected_score = best_rejected_score.min(score),
                }
            }
            if let Some(plan) = best {
                outcome.acceptable.push(plan);
            } else if best_rejected_score.is_finite() {
                let candidate = RejectedCandidate {
                    launch_frame,
                    score: best_rejected_score,
                };
                if outcome.best_rejected.is_none_or(|r| candidate.score < r.score) {
                    outcome.best_rejected = Some(candidate);
                }
            }
        }
        outcome
    }

    /// Evaluates one candidate. `Ok` carries an acceptable plan, `Err` the
    /// best (lowest) score the candidate reached.
    fn evaluate(&self, launch_frame: usize, dir: f64) -> Result<TransferPlan, f64> {
        let (start, thrust) = self.launch_state(launch_frame, dir);
        let base_trajectory = simulate_flight(
            &start,
            &thrust,
            0,
            self.source_frames(launch_frame, 0),
            self.snapshot.masses(),
        );
        let base_distances = self.distances(launch_frame, 0, &base_trajectory);
        let Some((base_insertion, min_dist)) = closest_approach(&base_distances) else {
            return Err(f64::INFINITY);
        };
        let base_score = (min_dist - self.ideal_distance()).abs();
        if base_score > Self::PRE_OPT_THRESHOLD {
            return Err(base_score);
        }

        let (correction, corrected, insertion, score) = self.optimize_correction(
            launch_frame,
            &thrust,
            &start,
            base_trajectory,
            base_distances,
            base_insertion,
        );
        if score > Self::POST_OPT_THRESHOLD {
            return Err(score);
        }

        let mut truncated = corrected;
        truncated.truncate(insertion + 1);
        let arrival_frame = launch_frame + truncated.len();
        Ok(TransferPlan {
            source: self.params.source,
            dest: self.params.dest,
            launch_frame,
            arrival_frame,
            score,
            trajectory: truncated.into(),
            insertion_frame: insertion,
            correction,
            orbit_dir: dir,
            sample_offset: launch_frame % TRAJECTORY_SAMPLE_STRIDE,
        })
    }

    /// Craft state the instant the launch fires, `launch_frame` shifts from
    /// the snapshot: parent state from frame `launch_frame - 1`, orbit angle
    /// advanced by `ω·L·dt`.
    #[allow(clippy::cast_precision_loss)]
    fn launch_state(&self, launch_frame: usize, dir: f64) -> (CraftFrame, ThrustContext) {
        let radius = self.params.source_radius + self.params.altitude;
        let mass = self.snapshot.masses()[self.params.source];
        let omega = (crate::sim::integrator::G * mass / radius).sqrt() / radius;
        let angle = self.params.angle
            + self.params.orbit_dir * omega * (launch_frame as f64) * DT_FIXED;
        let parent = self.snapshot.body_state(launch_frame - 1, self.params.source);
        let (frame, escape_velocity) = launch_frame_at(&parent, mass, radius, angle, dir);
        let thrust = ThrustContext {
            launch_body: self.params.source,
            orbit_dir: dir,
            escape_velocity,
            correction: None,
        };
        (frame, thrust)
    }

    /// Gravity-source frames for flight frames `from_flight_frame..` of a
    /// launch at `launch_frame`: flight frame `i` is produced against
    /// snapshot frame `launch_frame + i - 1`.
    fn source_frames(
        &self,
        launch_frame: usize,
        from_flight_frame: usize,
    ) -> impl Iterator<Item = &[crate::sim::BodyState]> {
        (launch_frame + from_flight_frame..self.snapshot.len())
            .map(|i| self.snapshot.frame(i - 1))
    }

    /// Craft-to-destination distance per trajectory frame.
    fn distances(
        &self,
        launch_frame: usize,
        from_flight_frame: usize,
        trajectory: &[CraftFrame],
    ) -> Vec<f64> {
        trajectory
            .iter()
            .enumerate()
            .map(|(i, frame)| {
                let dest = self
                    .snapshot
                    .body_state(launch_frame + from_flight_frame + i, self.params.dest);
                frame.pos.euclid_distance(&dest.pos)
            })
            .collect()
    }

    /// Mean altitude error over the scoring window starting at `insertion`.
    /// Non-finite trajectories score `+∞` and fall out naturally.
    #[allow(clippy::cast_precision_loss)]
    fn corrected_score(&self, distances: &[f64], insertion: usize) -> f64 {
        let window = &distances[insertion..distances.len().min(insertion + Self::SCORE_WINDOW)];
        let ideal = self.ideal_distance();
        let sum: f64 = window.iter().map(|d| (d - ideal).abs()).sum();
        let score = sum / window.len() as f64;
        if score.is_finite() { score } else { f64::INFINITY }
    }

    /// Coordinate descent over the correction burn's angle and duration,
    /// starting retrograde at two thirds of the way to insertion.
    ///
    /// Returns the burn (if any), the corrected trajectory, the insertion
    /// frame and the corrected score.
    #[allow(clippy::type_complexity)]
    fn optimize_correction(
        &self,
        launch_frame: usize,
        thrust: &ThrustContext,
        launch: &CraftFrame,
        base_trajectory: Vec<CraftFrame>,
        base_distances: Vec<f64>,
        base_insertion: usize,
    ) -> (Option<CorrectionBurn>, Vec<CraftFrame>, usize, f64) {
        let burn_start = base_insertion * 2 / 3;
        let seed_velocity = base_trajectory[burn_start].vel;
        let prefix_frames = &base_trajectory[..burn_start];
        let prefix_distances = &base_distances[..burn_start];
        let resume_state = if burn_start == 0 { *launch } else { base_trajectory[burn_start - 1] };

        let evaluate = |burn: CorrectionBurn| -> (Vec<CraftFrame>, Vec<f64>, usize, f64) {
            let burned = ThrustContext {
                correction: Some(burn),
                ..*thrust
            };
            let suffix = simulate_flight(
                &resume_state,
                &burned,
                burn_start,
                self.source_frames(launch_frame, burn_start),
                self.snapshot.masses(),
            );
            let suffix_distances = self.distances(launch_frame, burn_start, &suffix);
            let mut distances = prefix_distances.to_vec();
            distances.extend_from_slice(&suffix_distances);
            let (insertion, _) = closest_approach(&distances)
                .unwrap_or((distances.len().saturating_sub(1), f64::INFINITY));
            let score = self.corrected_score(&distances, insertion);
            let mut trajectory = prefix_frames.to_vec();
            trajectory.extend_from_slice(&suffix);
            (trajectory, distances, insertion, score)
        };

        let max_duration = Self::max_burn_frames();
        let angle_step = Self::ANGLE_STEP_DEG.to_radians();
        let mut burn = CorrectionBurn {
            angle: std::f64::consts::PI + seed_velocity.angle(),
            duration: 1,
            start_frame: burn_start,
        };
        let mut current = evaluate(burn);

        for _ in 0..Self::MAX_ITERATIONS {
            let mut neighbors = vec![
                CorrectionBurn { angle: burn.angle + angle_step, ..burn },
                CorrectionBurn { angle: burn.angle - angle_step, ..burn },
            ];
            if burn.duration < max_duration {
                neighbors.push(CorrectionBurn { duration: burn.duration + 1, ..burn });
            }
            if burn.duration > 0 {
                neighbors.push(CorrectionBurn { duration: burn.duration - 1, ..burn });
            }
            let mut improved = false;
            for candidate in neighbors {
                let result = evaluate(candidate);
                if result.3 < current.3 {
                    burn = candidate;
                    current = result;
                    improved = true;
                }
            }
            if !improved {
                break;
            }
        }

        let (trajectory, _distances, insertion, score) = current;
        let correction = (burn.duration > 0).then_some(burn);
        (correction, trajectory, insertion, score)
    }
}

/// Index and value of the smallest finite distance, first occurrence wins.
fn closest_approach(distances: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &d) in distances.iter().enumerate() {
        if d.is_finite() && best.is_none_or(|(_, b)| d < b) {
            best = Some((i, d));
        }
    }
    best
}
