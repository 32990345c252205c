/// The step function: advances the simulation by one tick.
///
/// Processing order:
///   1. Apply the player command (movement controller; may tilt the world,
///      may request a lock)
///   2. Natural gravity step (skipped when the command already locked)
///   3. Resolve pipeline, if a lock was requested
///   4. Wind scheduler
///   5. Objective / fail-state evaluation
///   6. Tick counter increment
///
/// A tick on a finished simulation (`Won`/`Lost`) is a complete no-op.

use crate::sim::event::SimEvent;
use crate::sim::movement::{self, Command, InputApplyResult};
use crate::sim::resolve;
use crate::sim::world::{SimulationState, Status};

pub fn step(state: &mut SimulationState, input: Command) -> (InputApplyResult, Vec<SimEvent>) {
    let mut events = Vec::new();
    if state.status != Status::InProgress {
        return (InputApplyResult::default(), events);
    }

    let result = movement::apply_command(state, input, &mut events);
    let mut locked = false;

    if result.lock_requested {
        lock_active_piece(state, &mut events);
        locked = true;
    }

    if !locked && state.status == Status::InProgress && movement::gravity_step(state) {
        lock_active_piece(state, &mut events);
    }

    if state.status == Status::InProgress {
        resolve_wind(state, &mut events);
    }

    resolve::evaluate(state, &mut events);
    state.counters.tick += 1;
    (result, events)
}

fn lock_active_piece(state: &mut SimulationState, events: &mut Vec<SimEvent>) {
    let Some(piece) = state.active.take() else {
        return;
    };
    resolve::resolve_lock(state, piece, events);
}

/// Fire every due wind scheduler. The gust counter and any RANDOM_SEEDED
/// draw advance whether or not a piece is in play; the push itself stops
/// at the first invalid placement.
fn resolve_wind(state: &mut SimulationState, events: &mut Vec<SimEvent>) {
    let tick = state.counters.tick;
    let mass_factor = state.active_mass_factor();

    for i in 0..state.wind.len() {
        if !state.wind[i].due(tick) {
            continue;
        }
        let direction = state.wind[i].fire(&mut state.hazard_rng);
        let push = state.wind[i].effective_push(mass_factor);

        let mut pushed = 0u32;
        let delta = direction.vector();
        while (pushed as i64) < push {
            let Some(piece) = state.active else { break };
            let mut target = piece;
            target.origin = piece.origin + delta;
            if !movement::placement_valid(state, &target) {
                break;
            }
            state.active = Some(target);
            pushed += 1;
        }
        events.push(SimEvent::WindGust { direction, pushed });
    }
}
