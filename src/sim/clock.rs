use crate::sim::integrator::DT_FIXED;

/// Accumulates wall-clock time into whole fixed steps.
///
/// The main loop asks for [`pending`](Self::pending) steps and calls
/// [`consume`](Self::consume) once per prediction-buffer shift it actually
/// performed, so unconsumed time carries over when the buffer runs dry.
#[derive(Debug, Clone, Copy)]
pub struct SimClock {
    accum: f64,
    speed: u32,
    paused: bool,
}

impl SimClock {
    /// Permitted integer speed multipliers.
    pub const SPEED_STEPS: [u32; 5] = [1, 2, 4, 8, 16];

    pub fn new() -> Self {
        Self {
            accum: 0.0,
            speed: 1,
            paused: false,
        }
    }

    /// Feeds wall-clock seconds into the accumulator, scaled by the speed
    /// multiplier. Paused clocks ignore time entirely.
    pub fn accumulate(&mut self, real_dt: f64) {
        if self.paused || !real_dt.is_finite() || real_dt <= 0.0 {
            return;
        }
        self.accum += real_dt * f64::from(self.speed);
    }

    /// Number of whole fixed steps currently available.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pending(&self) -> usize {
        (self.accum / DT_FIXED).floor() as usize
    }

    /// Consumes exactly one fixed step from the accumulator.
    pub fn consume(&mut self) {
        self.accum -= DT_FIXED;
    }

    /// Sets the speed multiplier; rejects values outside [`Self::SPEED_STEPS`].
    pub fn set_speed(&mut self, multiplier: u32) -> bool {
        if Self::SPEED_STEPS.contains(&multiplier) {
            self.speed = multiplier;
            true
        } else {
            false
        }
    }

    pub fn speed(&self) -> u32 { self.speed }

    /// Freezes advance without discarding accumulated time or buffers.
    pub fn pause(&mut self) { self.paused = true; }

    pub fn resume(&mut self) { self.paused = false; }

    pub fn is_paused(&self) -> bool { self.paused }
}

impl Default for SimClock {
    fn default() -> Self { Self::new() }
}
