/// The simulation: tick-driven state machine over a voxel grid.
///
/// `Simulation` is the host-facing contract: construct from a validated
/// `Level`, feed one `Command` per tick, inspect status/state, and take the
/// determinism hash at any tick boundary.

pub mod bag;
pub mod event;
pub mod hash;
pub mod hazard;
pub mod level;
pub mod movement;
pub mod objective;
pub mod replay;
pub mod resolve;
pub mod rotation;
pub mod settle;
pub mod step;
pub mod water;
pub mod world;

use crate::domain::int3::GravityDirection;
use crate::domain::piece::ActivePiece;
use crate::sim::bag::PieceSpec;
use crate::sim::event::SimEvent;
use crate::sim::level::Level;
use crate::sim::movement::{Command, InputApplyResult};
use crate::sim::objective::Progress;
use crate::sim::world::{SimulationState, Status};

pub struct Simulation {
    state: SimulationState,
}

impl Simulation {
    /// Construct the simulation and spawn the first piece. The returned
    /// events cover construction (spawn, or an immediate spawn-blocked
    /// loss).
    pub fn new(level: Level) -> (Simulation, Vec<SimEvent>) {
        let (state, events) = SimulationState::new(level);
        (Simulation { state }, events)
    }

    /// Advance one tick. Runs to completion; state mutates atomically from
    /// the caller's perspective.
    pub fn tick(&mut self, input: Command) -> (InputApplyResult, Vec<SimEvent>) {
        step::step(&mut self.state, input)
    }

    pub fn status(&self) -> Status {
        self.state.status
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn active_piece(&self) -> Option<&ActivePiece> {
        self.state.active.as_ref()
    }

    pub fn gravity(&self) -> GravityDirection {
        self.state.gravity
    }

    /// Current progress of every objective, in level order.
    pub fn objectives(&self) -> Vec<Progress> {
        self.state
            .level
            .objectives
            .iter()
            .map(|o| {
                o.progress(
                    &self.state.grid,
                    self.state.counters.water_removed_total,
                    self.state.counters.rotations_executed,
                )
            })
            .collect()
    }

    /// Preview the next `k` bag draws without advancing the real stream.
    pub fn peek_next(&self, k: usize) -> Vec<PieceSpec> {
        self.state.bag.peek_next(k, &self.state.bag_rng)
    }

    /// Canonical hash of the observable state at this tick boundary.
    pub fn compute_determinism_hash(&self) -> String {
        hash::determinism_hash(&self.state)
    }
}
