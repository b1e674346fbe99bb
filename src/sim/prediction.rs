use crate::sim::body::{BodyFrame, BodyId, BodyState};
use crate::sim::integrator::{self, DT_FIXED};
use crate::util::BoundedDeque;
use std::sync::Arc;

/// Rolling lookahead of future body states, the single source of truth for
/// body motion.
///
/// Frames are produced at the tail by the integrator and consumed at the head
/// by the main loop; frame `i` represents the world state `(i+1)·dt` seconds
/// after the currently visible body state. The buffer splits into a solid
/// prefix and a fade suffix, which is purely a rendering hint.
#[derive(Debug)]
pub struct PredictionBuffer {
    frames: BoundedDeque<BodyFrame>,
    masses: Arc<[f64]>,
    /// Last integrated state; tail extension continues from here even when
    /// the buffer has been drained.
    tail: BodyFrame,
    solid_frames: usize,
}

impl PredictionBuffer {
    /// Lookahead horizon in seconds.
    pub const HORIZON_TIME: f64 = 360.0;
    /// Length of the solid prefix in seconds; the remainder fades out.
    pub const SOLID_TIME: f64 = 320.0;
    /// Upper bound on new frames integrated per advance.
    pub const MAX_CATCHUP: usize = 100;

    /// The horizon expressed in whole frames.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn horizon_frames() -> usize { (Self::HORIZON_TIME / DT_FIXED).ceil() as usize }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn solid_frames() -> usize { (Self::SOLID_TIME / DT_FIXED).ceil() as usize }

    /// Creates a buffer seeded from the visible body states and fills the
    /// first `MAX_CATCHUP` frames. Subsequent ticks fill the rest.
    pub fn new(masses: Arc<[f64]>, initial: BodyFrame) -> Self {
        let mut buffer = Self {
            frames: BoundedDeque::new(Self::horizon_frames()),
            masses,
            tail: initial,
            solid_frames: Self::solid_frames(),
        };
        buffer.extend(Self::MAX_CATCHUP);
        buffer
    }

    /// Integrates up to `max_new` frames onto the tail, bounded by the horizon.
    pub fn extend(&mut self, max_new: usize) {
        for _ in 0..max_new.min(self.frames.remaining()) {
            let mut next = self.tail.clone();
            integrator::step(&mut next, &self.masses, DT_FIXED);
            self.tail = next.clone();
            self.frames.push(next);
        }
    }

    /// Pops the head frame: the authoritative next body state.
    pub(crate) fn shift(&mut self) -> Option<BodyFrame> {
        self.frames.pop_front()
    }

    pub fn len(&self) -> usize { self.frames.len() }

    pub fn is_empty(&self) -> bool { self.frames.is_empty() }

    /// Number of leading frames in the solid region; the suffix is the fade.
    pub fn solid_len(&self) -> usize { self.frames.len().min(self.solid_frames) }

    /// Random read of a whole frame.
    pub fn frame(&self, index: usize) -> Option<&BodyFrame> {
        self.frames.get(index)
    }

    /// Random read of one body's state inside a frame.
    pub fn body_state(&self, index: usize, body: BodyId) -> Option<BodyState> {
        self.frames.get(index).and_then(|frame| frame.get(body).copied())
    }

    pub fn masses(&self) -> &Arc<[f64]> { &self.masses }

    /// Produces an immutable view of the buffer for the planner workers.
    ///
    /// The frames are copied once here; the snapshot itself is then shared by
    /// reference counting, never per-access.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            frames: self.frames.iter().cloned().collect(),
            masses: Arc::clone(&self.masses),
        }
    }

    /// Iterates the buffered frames from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &BodyFrame> {
        self.frames.iter()
    }
}

/// An immutable copy-on-send view of the prediction buffer.
#[derive(Debug, Clone)]
pub struct Snapshot {
    frames: Arc<[BodyFrame]>,
    masses: Arc<[f64]>,
}

impl Snapshot {
    pub fn len(&self) -> usize { self.frames.len() }

    pub fn is_empty(&self) -> bool { self.frames.is_empty() }

    pub fn frame(&self, index: usize) -> &[BodyState] { &self.frames[index] }

    pub fn body_state(&self, index: usize, body: BodyId) -> BodyState {
        self.frames[index][body]
    }

    pub fn masses(&self) -> &[f64] { &self.masses }
}
