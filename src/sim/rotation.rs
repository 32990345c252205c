/// World rotation: remap the gravity axis and reconcile the settled world.
///
/// A tilt is accepted only if the rotated gravity is a permitted cardinal
/// direction, the cooldown has elapsed, and the tilt budget is not
/// exhausted. On acceptance the settled world is resolved with the active
/// piece as an immovable obstacle; if anything would settle into the piece,
/// the whole attempt is rolled back from a snapshot — there is no partial
/// commit.

use std::collections::BTreeMap;

use log::debug;

use crate::domain::grid::Grid;
use crate::domain::int3::{GravityDirection, Int3, Rot3};
use crate::sim::event::SimEvent;
use crate::sim::resolve;
use crate::sim::world::{Counters, SimulationState};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TiltDirection {
    Forward,
    Back,
    Left,
    Right,
}

impl TiltDirection {
    /// The canonical matrix applied to the gravity vector.
    /// From Down: Forward→North, Back→South, Left→East, Right→West.
    pub fn matrix(self) -> Rot3 {
        match self {
            TiltDirection::Forward => Rot3::PITCH_CW,
            TiltDirection::Back => Rot3::PITCH_CCW,
            TiltDirection::Left => Rot3::ROLL_CW,
            TiltDirection::Right => Rot3::ROLL_CCW,
        }
    }
}

/// Everything a tilt resolve may touch. Cloned before the attempt; the
/// cost is linear in cells and tilts are rare.
struct TiltSnapshot {
    grid: Grid,
    gravity: GravityDirection,
    counters: Counters,
    ice_timers: BTreeMap<Int3, i64>,
}

/// Attempt a world rotation. Returns false (with no state change) on any
/// rejection: Up result, disallowed direction, cooldown, exhausted budget,
/// or a settle collision with the active piece.
pub fn apply_tilt(
    state: &mut SimulationState,
    dir: TiltDirection,
    events: &mut Vec<SimEvent>,
) -> bool {
    let rotated = dir.matrix().apply(state.gravity.vector());
    let Some(new_gravity) = GravityDirection::from_vector(rotated) else {
        // Up is not a gameplay gravity value.
        return false;
    };
    if !state
        .level
        .rotation
        .allowed_directions
        .contains(&new_gravity)
    {
        return false;
    }
    if let Some(last) = state.last_tilt_tick {
        if state.counters.tick - last < state.level.rotation.cooldown_ticks {
            return false;
        }
    }
    if state.tilts_remaining == Some(0) {
        return false;
    }

    let snapshot = TiltSnapshot {
        grid: state.grid.clone(),
        gravity: state.gravity,
        counters: state.counters,
        ice_timers: state.ice_timers.clone(),
    };

    state.gravity = new_gravity;
    let piece_cells = state.active_cells();
    // Buffered so a rolled-back tilt leaks no events.
    let mut tilt_events = Vec::new();
    if !resolve::resolve_tilt(state, &piece_cells, &mut tilt_events) {
        debug!("tilt to {} rejected: settle hit the active piece", new_gravity.name());
        state.grid = snapshot.grid;
        state.gravity = snapshot.gravity;
        state.counters = snapshot.counters;
        state.ice_timers = snapshot.ice_timers;
        return false;
    }

    events.append(&mut tilt_events);
    state.counters.rotations_executed += 1;
    if let Some(budget) = state.tilts_remaining.as_mut() {
        *budget -= 1;
    }
    state.last_tilt_tick = Some(state.counters.tick);
    decay_anchors(state);
    events.push(SimEvent::WorldRotated {
        gravity: new_gravity,
    });
    true
}

/// Stabilize anchors decay one step per successful rotation; expired cells
/// revert to plain solids in place. Entries whose cell no longer holds an
/// anchored solid are dropped.
fn decay_anchors(state: &mut SimulationState) {
    let grid = &state.grid;
    let mut expired: Vec<Int3> = Vec::new();
    state.anchor_timers.retain(|&pos, timer| {
        if !grid.get(pos).anchored {
            return false;
        }
        *timer -= 1;
        if *timer <= 0 {
            expired.push(pos);
            false
        } else {
            true
        }
    });
    for pos in expired {
        let mut voxel = state.grid.get(pos);
        voxel.anchored = false;
        state.grid.set(pos, voxel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::voxel::VoxelKind;
    use crate::sim::level::parse_level;
    use crate::sim::world::Status;

    fn tilt_state(extra: &str) -> SimulationState {
        let json = format!(
            r#"{{
                "meta": {{"id": "t", "title": "", "schemaVersion": 1, "seed": 1}},
                "bounds": {{"x": 3, "y": 5, "z": 3}},
                "bag": {{"type": "sequence", "sequence": ["I2"]}}
                {extra}
            }}"#
        );
        SimulationState::new(parse_level(&json).unwrap().0).0
    }

    #[test]
    fn tilt_forward_goes_north() {
        let mut state = tilt_state("");
        let mut events = Vec::new();
        assert!(apply_tilt(&mut state, TiltDirection::Forward, &mut events));
        assert_eq!(state.gravity, GravityDirection::North);
        assert_eq!(state.counters.rotations_executed, 1);
        assert!(events
            .iter()
            .any(|e| matches!(e, SimEvent::WorldRotated { gravity: GravityDirection::North })));
    }

    #[test]
    fn tilt_to_up_is_rejected() {
        let mut state = tilt_state("");
        let mut events = Vec::new();
        assert!(apply_tilt(&mut state, TiltDirection::Forward, &mut events));
        // From North, another Forward pitch would point gravity Up.
        assert!(!apply_tilt(&mut state, TiltDirection::Forward, &mut events));
        assert_eq!(state.gravity, GravityDirection::North);
        assert_eq!(state.counters.rotations_executed, 1);
    }

    #[test]
    fn disallowed_direction_is_rejected() {
        let mut state =
            tilt_state(r#", "rotation": {"allowedDirections": ["down", "south"]}"#);
        let mut events = Vec::new();
        assert!(!apply_tilt(&mut state, TiltDirection::Forward, &mut events));
        assert!(apply_tilt(&mut state, TiltDirection::Back, &mut events));
        assert_eq!(state.gravity, GravityDirection::South);
    }

    #[test]
    fn cooldown_gates_consecutive_tilts() {
        let mut state = tilt_state(r#", "rotation": {"cooldownTicks": 30}"#);
        let mut events = Vec::new();
        assert!(apply_tilt(&mut state, TiltDirection::Forward, &mut events));
        assert!(!apply_tilt(&mut state, TiltDirection::Back, &mut events));
        state.counters.tick += 30;
        assert!(apply_tilt(&mut state, TiltDirection::Back, &mut events));
    }

    #[test]
    fn budget_exhaustion_rejects() {
        let mut state = tilt_state(r#", "rotation": {"tiltBudget": 1}"#);
        let mut events = Vec::new();
        assert!(apply_tilt(&mut state, TiltDirection::Forward, &mut events));
        assert_eq!(state.tilts_remaining, Some(0));
        assert!(!apply_tilt(&mut state, TiltDirection::Back, &mut events));
        assert_eq!(state.status, Status::InProgress);
    }

    #[test]
    fn blocked_tilt_rolls_back_completely() {
        // Gravity Down → North. A free solid sits so that under North
        // gravity it would fall straight through the active piece.
        let mut state =
            tilt_state(r#", "initialVoxels": [{"pos": [1, 1, 2], "type": "solid"}]"#);
        // Pin the active piece into the solid's northward fall path.
        let mut piece = state.active.unwrap();
        piece.origin = Int3::new(1, 1, 1);
        state.active = Some(piece);

        let grid_before = state.grid.clone();
        let mut events = Vec::new();
        assert!(!apply_tilt(&mut state, TiltDirection::Forward, &mut events));

        assert_eq!(state.gravity, GravityDirection::Down);
        assert_eq!(state.grid, grid_before);
        assert_eq!(state.counters.rotations_executed, 0);
        assert!(events.is_empty());
    }

    #[test]
    fn anchors_decay_after_two_rotations() {
        let mut state = tilt_state(
            r#", "initialVoxels": [{"pos": [1, 0, 1], "type": "solid", "anchored": true}]"#,
        );
        state.anchor_timers.insert(Int3::new(1, 0, 1), 2);

        let mut events = Vec::new();
        assert!(apply_tilt(&mut state, TiltDirection::Forward, &mut events));
        assert!(state.grid.get(Int3::new(1, 0, 1)).anchored);

        assert!(apply_tilt(&mut state, TiltDirection::Back, &mut events));
        assert!(!state.grid.get(Int3::new(1, 0, 1)).anchored);
        assert!(state.anchor_timers.is_empty());
        assert_eq!(state.grid.get(Int3::new(1, 0, 1)).kind, VoxelKind::Solid);
    }
}
