use crate::planner::plan::{RejectedCandidate, TransferPlan, TRAJECTORY_SAMPLE_STRIDE};
use crate::sim::BodyId;
use std::collections::HashMap;

/// A launch pinned to fire after `countdown` more shifts.
#[derive(Debug, Clone)]
pub struct ScheduledLaunch {
    plan: TransferPlan,
    countdown: usize,
}

impl ScheduledLaunch {
    pub fn plan(&self) -> &TransferPlan { &self.plan }

    pub fn countdown(&self) -> usize { self.countdown }
}

/// Shift-aware container for planner results.
///
/// Holds the acceptable trajectories sorted by arrival, the per-route cache
/// of the most recent acceptable plan, the best rejected candidate for
/// display, and the scheduled launch countdown. Everything buffer-relative
/// in here decrements together on every shift.
#[derive(Debug, Default)]
pub struct PlanRegistry {
    acceptable: Vec<TransferPlan>,
    cache: HashMap<(BodyId, BodyId), TransferPlan>,
    best_rejected: Option<RejectedCandidate>,
    scheduled: Option<ScheduledLaunch>,
}

impl PlanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh search for a route: clears the live list and the
    /// scheduled launch, then seeds from the cache when the last acceptable
    /// plan for this route is still launchable.
    pub(crate) fn reset_search(&mut self, source: BodyId, dest: BodyId) {
        self.acceptable.clear();
        self.best_rejected = None;
        self.scheduled = None;
        if let Some(hit) = self.cache.get(&(source, dest)) {
            if hit.launch_frame > 0 {
                self.acceptable.push(hit.clone());
            }
        }
    }

    /// Merges one batch result. `shifts` is the number of buffer shifts since
    /// the snapshot the batch was computed against; all buffer-relative
    /// indices are re-based by it and candidates whose launch time already
    /// passed are discarded.
    pub(crate) fn ingest(
        &mut self,
        plans: Vec<TransferPlan>,
        rejected: Option<RejectedCandidate>,
        shifts: usize,
    ) {
        for mut plan in plans {
            if plan.launch_frame <= shifts {
                continue;
            }
            plan.launch_frame -= shifts;
            plan.arrival_frame -= shifts;
            plan.sample_offset = (plan.sample_offset + TRAJECTORY_SAMPLE_STRIDE
                - shifts % TRAJECTORY_SAMPLE_STRIDE)
                % TRAJECTORY_SAMPLE_STRIDE;
            self.insert(plan);
        }
        if let Some(mut candidate) = rejected {
            if candidate.launch_frame > shifts {
                candidate.launch_frame -= shifts;
                if self.best_rejected.is_none_or(|best| candidate.score < best.score) {
                    self.best_rejected = Some(candidate);
                }
            }
        }
    }

    /// Sorted insert by arrival frame. A plan for an already-known launch
    /// frame replaces the old entry: results may arrive out of order and the
    /// last write wins.
    fn insert(&mut self, plan: TransferPlan) {
        let cached = self.cache.entry((plan.source, plan.dest));
        match cached {
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                if plan.score <= entry.get().score {
                    entry.insert(plan.clone());
                }
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(plan.clone());
            }
        }
        if let Some(existing) =
            self.acceptable.iter().position(|p| p.launch_frame == plan.launch_frame)
        {
            self.acceptable.remove(existing);
        }
        let at = self
            .acceptable
            .partition_point(|p| p.arrival_frame <= plan.arrival_frame);
        self.acceptable.insert(at, plan);
    }

    /// Consumes one shift event: decrements every buffer-relative index and
    /// evicts entries whose launch time has passed. Returns the plan of a
    /// scheduled launch exactly when its countdown reaches zero.
    pub(crate) fn on_shift(&mut self) -> Option<TransferPlan> {
        self.acceptable.retain_mut(TransferPlan::shift);
        self.cache.retain(|_, plan| plan.shift());
        // A route whose cached plan just expired falls back to the best
        // surviving acceptable plan, so a restart never sees a worse score
        // than the live list offers.
        for plan in &self.acceptable {
            let key = (plan.source, plan.dest);
            match self.cache.entry(key) {
                std::collections::hash_map::Entry::Occupied(mut entry) => {
                    if plan.score < entry.get().score {
                        entry.insert(plan.clone());
                    }
                }
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert(plan.clone());
                }
            }
        }
        if let Some(rejected) = &mut self.best_rejected {
            if rejected.launch_frame <= 1 {
                self.best_rejected = None;
            } else {
                rejected.launch_frame -= 1;
            }
        }
        if let Some(scheduled) = &mut self.scheduled {
            scheduled.plan.shift();
            scheduled.countdown -= 1;
            if scheduled.countdown == 0 {
                return self.scheduled.take().map(|s| s.plan);
            }
        }
        None
    }

    /// The earliest-arriving acceptable plan, if any.
    pub fn current_best(&self) -> Option<&TransferPlan> {
        self.acceptable.first()
    }

    pub fn acceptable(&self) -> &[TransferPlan] {
        &self.acceptable
    }

    pub fn best_rejected(&self) -> Option<RejectedCandidate> {
        self.best_rejected
    }

    pub fn scheduled(&self) -> Option<&ScheduledLaunch> {
        self.scheduled.as_ref()
    }

    /// Pins a launch; it fires after `plan.launch_frame` more shifts.
    /// Plans whose launch time has already passed are rejected.
    pub(crate) fn schedule(&mut self, plan: TransferPlan) -> bool {
        if plan.launch_frame == 0 {
            return false;
        }
        self.scheduled = Some(ScheduledLaunch {
            countdown: plan.launch_frame,
            plan,
        });
        true
    }

    pub(crate) fn cancel_schedule(&mut self) {
        self.scheduled = None;
    }

    /// Drops the live search results, keeping the route cache.
    pub(crate) fn clear_live(&mut self) {
        self.acceptable.clear();
        self.best_rejected = None;
        self.scheduled = None;
    }
}
