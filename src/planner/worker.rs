use crate::planner::plan::{RejectedCandidate, TransferPlan};
use crate::planner::search::{SearchParams, TransferSearch};
use crate::sim::Snapshot;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Commands from the main loop to one worker.
#[derive(Debug)]
pub enum WorkerCommand {
    /// Installs a fresh snapshot and search parameters; tagged with a
    /// snapshot epoch so the main loop knows which workers are current.
    Init {
        epoch: u64,
        snapshot: Snapshot,
        params: SearchParams,
    },
    /// Evaluates launch frames `[frame_start, frame_end)` against the
    /// installed snapshot.
    Search {
        generation: u64,
        batch_id: u64,
        frame_start: usize,
        frame_end: usize,
    },
}

/// Replies from a worker to the main loop.
#[derive(Debug)]
pub enum WorkerReply {
    /// Snapshot installed; the worker is ready for batches of this epoch.
    Ready { worker: usize, epoch: u64 },
    /// One evaluated batch, acceptable trajectories plus the best fallback.
    Batch {
        worker: usize,
        generation: u64,
        batch_id: u64,
        acceptable: Vec<TransferPlan>,
        best_rejected: Option<RejectedCandidate>,
    },
    /// The batch failed; the worker survives and returns to idle.
    Failed {
        worker: usize,
        batch_id: u64,
        message: String,
    },
}

/// A fixed-size pool of planner workers.
///
/// Workers own their snapshot copy, never touch main-loop state, and are
/// fed one batch at a time: a new batch is dispatched to a worker only after
/// its previous reply has been received.
#[derive(Debug)]
pub struct WorkerPool {
    commands: Vec<mpsc::Sender<WorkerCommand>>,
    replies: mpsc::Receiver<WorkerReply>,
    idle: Vec<bool>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Per-worker command queue depth: one pending re-init plus one batch.
    const COMMAND_DEPTH: usize = 4;

    /// Spawns `size` workers onto the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn spawn(size: usize) -> Self {
        let size = size.max(1);
        let (reply_tx, reply_rx) = mpsc::channel(size * 2 + Self::COMMAND_DEPTH);
        let cancel = CancellationToken::new();
        let mut commands = Vec::with_capacity(size);
        for worker in 0..size {
            let (tx, rx) = mpsc::channel(Self::COMMAND_DEPTH);
            commands.push(tx);
            tokio::spawn(run_worker(worker, rx, reply_tx.clone(), cancel.child_token()));
        }
        Self {
            commands,
            replies: reply_rx,
            idle: vec![true; size],
            cancel,
        }
    }

    pub fn size(&self) -> usize {
        self.commands.len()
    }

    /// Index of some idle worker, if any.
    pub fn idle_worker(&self) -> Option<usize> {
        self.idle.iter().position(|idle| *idle)
    }

    pub fn mark_idle(&mut self, worker: usize) {
        self.idle[worker] = true;
    }

    pub fn mark_busy(&mut self, worker: usize) {
        self.idle[worker] = false;
    }

    /// Non-blocking send; `false` when the worker's queue is full.
    pub fn try_send(&self, worker: usize, command: WorkerCommand) -> bool {
        self.commands[worker].try_send(command).is_ok()
    }

    /// Drains all replies that have arrived since the last pump.
    pub fn drain_replies(&mut self) -> Vec<WorkerReply> {
        let mut replies = Vec::new();
        while let Ok(reply) = self.replies.try_recv() {
            replies.push(reply);
        }
        replies
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_worker(
    worker: usize,
    mut commands: mpsc::Receiver<WorkerCommand>,
    replies: mpsc::Sender<WorkerReply>,
    cancel: CancellationToken,
) {
    let mut search: Option<TransferSearch> = None;
    loop {
        let command = tokio::select! {
            () = cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };
        let reply = match command {
            WorkerCommand::Init {
                epoch,
                snapshot,
                params,
            } => {
                search = Some(TransferSearch::new(snapshot, params));
                WorkerReply::Ready { worker, epoch }
            }
            WorkerCommand::Search {
                generation,
                batch_id,
                frame_start,
                frame_end,
            } => match &search {
                None => WorkerReply::Failed {
                    worker,
                    batch_id,
                    message: "batch dispatched before snapshot init".to_string(),
                },
                Some(active) => {
                    match catch_unwind(AssertUnwindSafe(|| {
                        active.search_batch(frame_start, frame_end)
                    })) {
                        Ok(outcome) => WorkerReply::Batch {
                            worker,
                            generation,
                            batch_id,
                            acceptable: outcome.acceptable,
                            best_rejected: outcome.best_rejected,
                        },
                        Err(_) => WorkerReply::Failed {
                            worker,
                            batch_id,
                            message: "batch evaluation panicked".to_string(),
                        },
                    }
                }
            },
        };
        if replies.send(reply).await.is_err() {
            break;
        }
    }
}
