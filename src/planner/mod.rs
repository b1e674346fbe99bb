//! Worker-parallel transfer planning: a rolling sweep over future launch
//! frames, per-candidate correction-burn optimization, and the shift-aware
//! registry of acceptable plans.

mod plan;
mod registry;
mod search;
mod worker;

#[cfg(test)]
mod tests;

pub use plan::{RejectedCandidate, TransferPlan, TRAJECTORY_SAMPLE_STRIDE};
pub use registry::{PlanRegistry, ScheduledLaunch};
pub use search::{BatchOutcome, SearchParams, TransferSearch};

use crate::craft::Craft;
use crate::sim::{Body, BodyId, PredictionBuffer, Snapshot};
use crate::{error, event, log, plan};
use std::collections::HashMap;
use strum_macros::Display;
use worker::{WorkerCommand, WorkerPool, WorkerReply};

/// Externally visible state of a transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TransferState {
    /// The sweep has not produced an acceptable plan (yet, or anymore).
    Searching,
    /// At least one acceptable plan is available.
    Ready,
    /// A plan is pinned and counting down to launch.
    Scheduled,
    /// No transfer request is active.
    None,
}

/// One active transfer search: owns the worker pool and the sweep state.
///
/// Workers reason in snapshot-relative frames; the process tracks, per
/// in-flight batch, how many buffer shifts have happened since that batch's
/// snapshot so the registry can re-base results on receipt.
#[derive(Debug)]
pub struct TransferProcess {
    craft_id: usize,
    source: BodyId,
    dest: BodyId,
    pool: WorkerPool,
    generation: u64,
    /// Monotonic id of the snapshot installed on the workers.
    epoch: u64,
    worker_epoch: Vec<u64>,
    snapshot: Option<Snapshot>,
    /// Search parameters captured at the snapshot instant.
    search_params: Option<SearchParams>,
    /// Last searchable launch frame of the installed snapshot.
    snapshot_limit: usize,
    /// Shifts since the installed snapshot was taken.
    snapshot_shifts: usize,
    /// Per in-flight batch: shifts since the snapshot it runs against.
    in_flight: HashMap<u64, usize>,
    next_batch_id: u64,
    next_batch_start: usize,
    /// High-water mark of dispatched launch frames (buffer-relative).
    searched_up_to: usize,
    sweep_logged: bool,
}

impl TransferProcess {
    /// Spawns the worker pool and initializes the sweep bookkeeping.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub(crate) fn new(craft_id: usize, source: BodyId, dest: BodyId, pool_size: usize) -> Self {
        let pool = WorkerPool::spawn(pool_size);
        let lead = TransferSearch::min_lead_frames();
        let workers = pool.size();
        Self {
            craft_id,
            source,
            dest,
            pool,
            generation: 1,
            epoch: 0,
            worker_epoch: vec![0; workers],
            snapshot: None,
            search_params: None,
            snapshot_limit: 0,
            snapshot_shifts: 0,
            in_flight: HashMap::new(),
            next_batch_id: 0,
            next_batch_start: lead,
            searched_up_to: lead,
            sweep_logged: false,
        }
    }

    pub fn craft_id(&self) -> usize { self.craft_id }

    pub fn source(&self) -> BodyId { self.source }

    pub fn dest(&self) -> BodyId { self.dest }

    pub fn generation(&self) -> u64 { self.generation }

    /// Restarts the sweep for the same route: bumps the generation so every
    /// in-flight batch is dropped on receipt, and forces a fresh snapshot.
    pub(crate) fn restart(&mut self) {
        self.generation += 1;
        self.in_flight.clear();
        self.snapshot = None;
        self.search_params = None;
        self.snapshot_shifts = 0;
        let lead = TransferSearch::min_lead_frames();
        self.next_batch_start = lead;
        self.searched_up_to = lead;
        self.sweep_logged = false;
    }

    /// Consumes one shift event: every in-flight batch and the installed
    /// snapshot age by one frame. The search high-water mark only moves when
    /// nothing is in flight, preserving progress during an active sweep.
    pub(crate) fn on_shift(&mut self) {
        self.snapshot_shifts += 1;
        for shifts in self.in_flight.values_mut() {
            *shifts += 1;
        }
        if self.in_flight.is_empty() {
            let lead = TransferSearch::min_lead_frames();
            self.searched_up_to = self.searched_up_to.saturating_sub(1).max(lead);
        }
    }

    /// Drains worker replies into the registry, then keeps the pool saturated
    /// with one batch per idle worker until the searchable horizon is done.
    pub(crate) fn pump(
        &mut self,
        prediction: &PredictionBuffer,
        craft: &Craft,
        bodies: &[Body],
        registry: &mut PlanRegistry,
    ) {
        for reply in self.pool.drain_replies() {
            match reply {
                // An Init ack: records the installed epoch. Only a batch
                // reply returns the worker to idle.
                WorkerReply::Ready { worker, epoch } => {
                    self.worker_epoch[worker] = epoch;
                }
                WorkerReply::Failed {
                    worker,
                    batch_id,
                    message,
                } => {
                    error!("planner worker {worker} failed batch {batch_id}: {message}");
                    self.pool.mark_idle(worker);
                    self.in_flight.remove(&batch_id);
                }
                WorkerReply::Batch {
                    worker,
                    generation,
                    batch_id,
                    acceptable,
                    best_rejected,
                } => {
                    self.pool.mark_idle(worker);
                    let shifts = self.in_flight.remove(&batch_id);
                    if generation != self.generation {
                        event!("dropping stale batch {batch_id} (generation {generation})");
                        continue;
                    }
                    let Some(shifts) = shifts else { continue };
                    let had_best = registry.current_best().is_some();
                    registry.ingest(acceptable, best_rejected, shifts);
                    if !had_best {
                        if let Some(best) = registry.current_best() {
                            plan!(
                                "transfer window found: launch in {} frames, score {:.3}",
                                best.launch_frame,
                                best.score
                            );
                        }
                    }
                }
            }
        }

        if registry.scheduled().is_some() {
            return;
        }
        if craft.orbit().is_none() {
            return;
        }

        let current_limit = prediction.len().saturating_sub(TransferSearch::runway_frames());
        let sweep_done = self.snapshot.is_some() && self.next_batch_start >= self.snapshot_limit;
        if self.snapshot.is_none() || (sweep_done && self.searched_up_to < current_limit) {
            self.install_snapshot(prediction, craft, bodies);
        }

        let (Some(snapshot), Some(params)) = (self.snapshot.clone(), self.search_params) else {
            return;
        };
        while self.next_batch_start < self.snapshot_limit {
            let Some(worker) = self.pool.idle_worker() else { break };
            if self.worker_epoch[worker] != self.epoch {
                let init = WorkerCommand::Init {
                    epoch: self.epoch,
                    snapshot: snapshot.clone(),
                    params,
                };
                if !self.pool.try_send(worker, init) {
                    break;
                }
                self.worker_epoch[worker] = self.epoch;
            }
            let frame_end =
                (self.next_batch_start + TransferSearch::BATCH_SIZE).min(self.snapshot_limit);
            let search = WorkerCommand::Search {
                generation: self.generation,
                batch_id: self.next_batch_id,
                frame_start: self.next_batch_start,
                frame_end,
            };
            if !self.pool.try_send(worker, search) {
                break;
            }
            self.pool.mark_busy(worker);
            self.in_flight.insert(self.next_batch_id, self.snapshot_shifts);
            self.next_batch_id += 1;
            self.next_batch_start = frame_end;
            self.searched_up_to = self.searched_up_to.max(frame_end);
        }

        if !self.sweep_logged
            && self.snapshot_limit > TransferSearch::min_lead_frames()
            && self.next_batch_start >= self.snapshot_limit
        {
            log!(
                "launch sweep dispatched through frame {} for route {} -> {}",
                self.snapshot_limit,
                self.source,
                self.dest
            );
            self.sweep_logged = true;
        }
    }

    /// Takes a fresh snapshot, captures the craft's orbit geometry at the
    /// same instant, and resumes the sweep from the high-water mark.
    fn install_snapshot(&mut self, prediction: &PredictionBuffer, craft: &Craft, bodies: &[Body]) {
        let Some(orbit) = craft.orbit() else { return };
        let snapshot = prediction.snapshot();
        self.snapshot_limit = snapshot.len().saturating_sub(TransferSearch::runway_frames());
        self.snapshot = Some(snapshot);
        self.search_params = Some(SearchParams {
            source: self.source,
            dest: self.dest,
            source_radius: bodies[self.source].radius(),
            dest_radius: bodies[self.dest].radius(),
            altitude: orbit.altitude,
            angle: orbit.angle,
            orbit_dir: orbit.dir,
        });
        self.snapshot_shifts = 0;
        self.epoch += 1;
        let lead = TransferSearch::min_lead_frames();
        self.next_batch_start = self.searched_up_to.max(lead);
    }
}
