use crate::craft::{Craft, CraftEvent, CraftState, OrbitRide};
use crate::planner::{PlanRegistry, RejectedCandidate, TransferPlan, TransferProcess, TransferState};
use crate::sim::preset::Preset;
use crate::sim::{Body, BodyId, BodyState, PredictionBuffer, SimClock};
use crate::{info, log};
use std::sync::Arc;
use thiserror::Error;

/// Contract errors of the transfer API. The simulation continues after any
/// of these; they abort only the request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransferError {
    #[error("unknown craft id {0}")]
    UnknownCraft(usize),
    #[error("unknown body id {0}")]
    UnknownBody(usize),
    #[error("destination and source body are the same")]
    SameBody,
    #[error("craft is not in a stable orbit")]
    NotOrbiting,
    #[error("no transfer request is active")]
    NoActiveTransfer,
    #[error("no acceptable plan is ready")]
    NoPlanReady,
}

/// Errors raised while instantiating a preset.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PresetError {
    #[error("unknown preset '{0}'")]
    Unknown(String),
    #[error("craft '{craft}' references unknown parent body '{parent}'")]
    UnknownParent { craft: String, parent: String },
}

/// The opaque simulation handle: bodies, craft, the prediction buffer, the
/// clock and the plan registry, advanced in lock-step by [`tick`](Self::tick).
///
/// Everything here is touched only by the owning loop; the planner workers
/// communicate exclusively through message channels pumped inside `tick`.
#[derive(Debug)]
pub struct World {
    bodies: Vec<Body>,
    crafts: Vec<Craft>,
    prediction: PredictionBuffer,
    clock: SimClock,
    registry: PlanRegistry,
    transfer: Option<TransferProcess>,
    planner_pool_size: usize,
}

impl World {
    /// Builds a world from a preset. Body ids are assigned in preset order.
    pub fn new(preset: &Preset) -> Result<Self, PresetError> {
        let bodies: Vec<Body> = preset
            .bodies
            .iter()
            .enumerate()
            .map(|(id, def)| {
                Body::new(
                    id,
                    def.name.clone(),
                    def.mass,
                    def.radius,
                    BodyState {
                        pos: def.pos,
                        vel: def.vel,
                    },
                )
            })
            .collect();
        let mut crafts = Vec::with_capacity(preset.crafts.len());
        for (id, def) in preset.crafts.iter().enumerate() {
            let parent = bodies
                .iter()
                .position(|body| body.name() == def.parent)
                .ok_or_else(|| PresetError::UnknownParent {
                    craft: def.name.clone(),
                    parent: def.parent.clone(),
                })?;
            crafts.push(Craft::new(
                id,
                def.name.clone(),
                OrbitRide {
                    parent,
                    altitude: def.altitude,
                    angle: def.angle,
                    dir: 1.0,
                },
            ));
        }
        let masses: Arc<[f64]> = bodies.iter().map(Body::mass).collect();
        let initial: Box<[BodyState]> = bodies.iter().map(Body::state).collect();
        info!("world '{}' initialized: {} bodies, {} craft", preset.name, bodies.len(), crafts.len());
        Ok(Self {
            bodies,
            crafts,
            prediction: PredictionBuffer::new(masses, initial),
            clock: SimClock::new(),
            registry: PlanRegistry::new(),
            transfer: None,
            planner_pool_size: std::thread::available_parallelism().map_or(4, usize::from),
        })
    }

    /// Builds a world from a built-in preset name.
    pub fn from_named(name: &str) -> Result<Self, PresetError> {
        let preset = Preset::named(name).ok_or_else(|| PresetError::Unknown(name.to_string()))?;
        Self::new(&preset)
    }

    /// Discards all buffers and plans and reloads the given preset.
    pub fn reset(&mut self, preset: &Preset) -> Result<(), PresetError> {
        let mut fresh = Self::new(preset)?;
        fresh.planner_pool_size = self.planner_pool_size;
        *self = fresh;
        Ok(())
    }

    /// Advances the simulation by wall time, consuming whole fixed steps in
    /// lock-step with the prediction buffer and fanning each shift out to
    /// every consumer in a fixed order.
    pub fn tick(&mut self, real_dt: f64) {
        self.clock.accumulate(real_dt);
        while self.clock.pending() > 0 {
            let Some(frame) = self.prediction.shift() else { break };
            self.clock.consume();
            for (body, state) in self.bodies.iter_mut().zip(frame.iter()) {
                body.adopt(*state);
            }
            for craft in &mut self.crafts {
                if let Some(CraftEvent::Captured { parent }) = craft.on_shift(&self.bodies) {
                    info!(
                        "craft '{}' captured by '{}'",
                        craft.name(),
                        self.bodies[parent].name()
                    );
                }
            }
            if let Some(process) = &mut self.transfer {
                process.on_shift();
            }
            if let Some(plan) = self.registry.on_shift() {
                self.fire_scheduled(&plan);
            }
        }
        self.prediction.extend(PredictionBuffer::MAX_CATCHUP);
        for craft in &mut self.crafts {
            craft.extend_trajectory(&self.bodies, &self.prediction);
        }
        if let Some(process) = &mut self.transfer {
            let craft = &self.crafts[process.craft_id()];
            process.pump(&self.prediction, craft, &self.bodies, &mut self.registry);
        }
    }

    /// Executes a scheduled launch the moment its countdown hits zero.
    fn fire_scheduled(&mut self, plan: &TransferPlan) {
        let Some(process) = self.transfer.take() else { return };
        let craft = &mut self.crafts[process.craft_id()];
        if craft.launch_transfer(
            &self.bodies,
            &plan.trajectory,
            plan.correction,
            plan.dest,
            plan.orbit_dir,
        ) {
            info!(
                "craft '{}' launched for '{}', arrival in {} frames",
                craft.name(),
                self.bodies[plan.dest].name(),
                plan.arrival_frame
            );
        }
        self.registry.clear_live();
    }

    /// Sets the integer speed multiplier; out-of-range values are rejected.
    pub fn set_speed(&mut self, multiplier: u32) -> bool {
        self.clock.set_speed(multiplier)
    }

    pub fn speed(&self) -> u32 { self.clock.speed() }

    pub fn pause(&mut self) { self.clock.pause(); }

    pub fn resume(&mut self) { self.clock.resume(); }

    pub fn is_paused(&self) -> bool { self.clock.is_paused() }

    pub fn bodies(&self) -> &[Body] { &self.bodies }

    pub fn crafts(&self) -> &[Craft] { &self.crafts }

    /// Read-only view of the prediction buffer for the renderer.
    pub fn prediction(&self) -> &PredictionBuffer { &self.prediction }

    /// Finds a body id by name.
    pub fn body_id(&self, name: &str) -> Option<BodyId> {
        self.bodies.iter().position(|body| body.name() == name)
    }

    /// Begins (or restarts) transfer planning for a craft.
    ///
    /// Re-requesting the same route restarts the sweep in place; the route
    /// cache may immediately re-seed an acceptable plan.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime (the worker pool spawns
    /// onto the current runtime).
    pub fn request_transfer(
        &mut self,
        craft_id: usize,
        destination: BodyId,
    ) -> Result<(), TransferError> {
        let craft = self
            .crafts
            .get(craft_id)
            .ok_or(TransferError::UnknownCraft(craft_id))?;
        if destination >= self.bodies.len() {
            return Err(TransferError::UnknownBody(destination));
        }
        let CraftState::Orbiting(orbit) = craft.state() else {
            return Err(TransferError::NotOrbiting);
        };
        let source = orbit.parent;
        if source == destination {
            return Err(TransferError::SameBody);
        }
        self.registry.reset_search(source, destination);
        match &mut self.transfer {
            Some(process)
                if process.craft_id() == craft_id
                    && process.source() == source
                    && process.dest() == destination =>
            {
                process.restart();
                log!(
                    "transfer search restarted for '{}' (generation {})",
                    craft.name(),
                    process.generation()
                );
            }
            _ => {
                self.transfer = Some(TransferProcess::new(
                    craft_id,
                    source,
                    destination,
                    self.planner_pool_size,
                ));
                info!(
                    "transfer requested: '{}' from '{}' to '{}'",
                    craft.name(),
                    self.bodies[source].name(),
                    self.bodies[destination].name()
                );
            }
        }
        Ok(())
    }

    /// State of the active transfer request, [`TransferState::None`] without one.
    pub fn transfer_state(&self) -> TransferState {
        if self.transfer.is_none() {
            return TransferState::None;
        }
        if self.registry.scheduled().is_some() {
            TransferState::Scheduled
        } else if self.registry.current_best().is_some() {
            TransferState::Ready
        } else {
            TransferState::Searching
        }
    }

    /// The earliest-arriving acceptable plan of the active request.
    pub fn best_plan(&self) -> Option<&TransferPlan> {
        self.transfer.as_ref()?;
        self.registry.current_best()
    }

    /// All acceptable plans, time-ordered by arrival.
    pub fn acceptable_plans(&self) -> &[TransferPlan] {
        self.registry.acceptable()
    }

    /// The best candidate below acceptance, for the "searching" display.
    pub fn best_rejected(&self) -> Option<RejectedCandidate> {
        self.transfer.as_ref()?;
        self.registry.best_rejected()
    }

    /// Pins the current best plan for launch.
    pub fn schedule_transfer(&mut self) -> Result<(), TransferError> {
        if self.transfer.is_none() {
            return Err(TransferError::NoActiveTransfer);
        }
        let plan = self
            .registry
            .current_best()
            .cloned()
            .ok_or(TransferError::NoPlanReady)?;
        let launch_frame = plan.launch_frame;
        if !self.registry.schedule(plan) {
            return Err(TransferError::NoPlanReady);
        }
        info!("transfer scheduled: launch in {launch_frame} frames");
        Ok(())
    }

    /// Cancels the active transfer request, keeping the route cache.
    pub fn cancel_transfer(&mut self) {
        if self.transfer.take().is_some() {
            self.registry.cancel_schedule();
            self.registry.clear_live();
            log!("transfer cancelled");
        }
    }

    /// Manual escape launch: the craft leaves its orbit now, simulating its
    /// trajectory in-line against the prediction buffer.
    pub fn launch_craft(&mut self, craft_id: usize) -> Result<(), TransferError> {
        let craft = self
            .crafts
            .get(craft_id)
            .ok_or(TransferError::UnknownCraft(craft_id))?;
        if craft.orbit().is_none() {
            return Err(TransferError::NotOrbiting);
        }
        // A manual launch invalidates any plan being searched for this craft.
        if self.transfer.as_ref().is_some_and(|p| p.craft_id() == craft_id) {
            self.cancel_transfer();
        }
        self.crafts[craft_id].launch_free(&self.bodies, &self.prediction);
        info!("craft launched on escape trajectory");
        Ok(())
    }
}
