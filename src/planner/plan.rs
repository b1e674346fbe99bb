use crate::sim::{BodyId, CorrectionBurn, CraftFrame};
use std::sync::Arc;

/// Stride between rendered trajectory sample points; `sample_offset` cycles
/// inside it so the sampled dots stay put while the buffer shifts.
pub const TRAJECTORY_SAMPLE_STRIDE: usize = 30;

/// An accepted intercept trajectory produced by the planner.
///
/// `launch_frame` and `arrival_frame` are prediction-buffer relative and are
/// decremented on every shift; `insertion_frame` indexes into `trajectory`
/// and `correction.start_frame` is launch-relative, so neither moves.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub source: BodyId,
    pub dest: BodyId,
    /// Shifts until launch; plans expire when this reaches zero.
    pub launch_frame: usize,
    pub arrival_frame: usize,
    /// Mean altitude error over the insertion window; lower is better.
    pub score: f64,
    /// Craft frames from launch, truncated just past closest approach.
    pub trajectory: Arc<[CraftFrame]>,
    /// Index of closest approach inside `trajectory`.
    pub insertion_frame: usize,
    pub correction: Option<CorrectionBurn>,
    /// Tangent direction probed at launch, `+1.0` or `-1.0`.
    pub orbit_dir: f64,
    /// Rendering hint: phase of the trajectory sample pattern.
    pub sample_offset: usize,
}

impl TransferPlan {
    /// Consumes one buffer shift. Returns `false` once the launch time has
    /// passed and the plan must be evicted.
    pub(crate) fn shift(&mut self) -> bool {
        if self.launch_frame <= 1 {
            return false;
        }
        self.launch_frame -= 1;
        self.arrival_frame -= 1;
        self.sample_offset =
            (self.sample_offset + TRAJECTORY_SAMPLE_STRIDE - 1) % TRAJECTORY_SAMPLE_STRIDE;
        true
    }
}

/// The best candidate that missed the acceptance threshold, kept for display.
#[derive(Debug, Clone, Copy)]
pub struct RejectedCandidate {
    pub launch_frame: usize,
    pub score: f64,
}
