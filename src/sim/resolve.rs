/// The resolve pipeline: atomic multi-step reconciliation.
///
/// Processing order on a piece lock:
///   1. Arm-and-merge (pivot drain / anchoring / plain solid; collect
///      displaced water)
///   2. Apply freeze (armed only)
///   3. Settle solids
///   4. Settle water (absorbing all displaced sources so far)
///   5. Re-settle solids (water relocation may unblock supports)
///   6. Apply drains, then one water reflow
///   7. Advance ice timers, thaw expired cells, reflow if anything thawed
///   8. Evaluate objectives and fail states
///   9. Spawn the next piece
///
/// A tilt resolve runs steps 3–8 with the active piece as an immovable
/// obstacle set: if a settling component would enter a piece cell, the
/// whole resolve reports blocked and the caller restores its snapshot.
/// The solid↔water interlock is the fixed 3→4→5(→6 reflow) sequence;
/// further oscillation is treated as converged.

use std::collections::{BTreeSet, HashSet};

use log::debug;

use crate::domain::int3::{CellKey, Int3};
use crate::domain::piece::ActivePiece;
use crate::domain::voxel::{Scope, Voxel, VoxelKind};
use crate::sim::event::SimEvent;
use crate::sim::settle::{settle_solids, try_settle_solids, GatedSettleOutcome};
use crate::sim::water::settle_water;
use crate::sim::world::{SimulationState, Status};

/// Full pipeline for a locking piece. The piece has already been taken out
/// of `state.active`.
pub fn resolve_lock(state: &mut SimulationState, piece: ActivePiece, events: &mut Vec<SimEvent>) {
    debug!(
        "resolve: lock of {} at {:?}",
        piece.kind.name(),
        piece.origin
    );
    let displaced = merge_piece(state, &piece, events);
    if state.lock.freeze_armed {
        apply_freeze(state, &piece, events);
    }

    let committed = run_reconciliation(state, None, displaced, events);
    debug_assert!(committed, "ungated reconciliation cannot block");

    if state.status == Status::InProgress {
        state.spawn_from_bag(events);
    } else {
        state.active = None;
    }
}

/// Steps 3–8 with the active piece as obstacle. Returns `false` if a
/// settling component would enter a piece cell; the grid may then hold
/// partial progress and the caller must restore its snapshot.
pub fn resolve_tilt(
    state: &mut SimulationState,
    piece_cells: &HashSet<Int3>,
    events: &mut Vec<SimEvent>,
) -> bool {
    run_reconciliation(state, Some(piece_cells), Vec::new(), events)
}

// ── Step 1: arm-and-merge ──

fn merge_piece(
    state: &mut SimulationState,
    piece: &ActivePiece,
    events: &mut Vec<SimEvent>,
) -> Vec<Int3> {
    let abilities = &state.level.abilities;
    let mut displaced = Vec::new();
    let mut cells = 0u32;

    for cell in piece.cells() {
        if state.grid.get(cell).is_water() {
            displaced.push(cell);
        }
        let voxel = if cell == piece.pivot_cell() && state.lock.drain_placement_armed {
            Voxel::drain(abilities.drain_placement)
        } else if piece.material == Some(crate::domain::voxel::Material::Reinforced) {
            // Reinforced anchors permanently; no decay timer.
            Voxel::solid(crate::domain::voxel::Material::Reinforced, true)
        } else if state.lock.stabilize_armed {
            state
                .anchor_timers
                .insert(cell, abilities.stabilize_anchor_rotations);
            Voxel {
                kind: VoxelKind::Solid,
                material: piece.material,
                anchored: true,
                drain: None,
            }
        } else {
            Voxel {
                kind: VoxelKind::Solid,
                material: piece.material,
                anchored: false,
                drain: None,
            }
        };
        state.grid.set(cell, voxel);
        cells += 1;
    }

    state.counters.pieces_locked += 1;
    events.push(SimEvent::PieceLocked {
        kind: piece.kind,
        cells,
    });
    if !displaced.is_empty() {
        events.push(SimEvent::WaterDisplaced {
            units: displaced.len() as u64,
        });
    }
    displaced
}

// ── Step 2: freeze ──

fn apply_freeze(state: &mut SimulationState, piece: &ActivePiece, events: &mut Vec<SimEvent>) {
    let scope = state.level.abilities.freeze_scope;
    let duration = state.level.abilities.freeze_duration_resolves;

    let targets: BTreeSet<Int3> = piece
        .cells()
        .flat_map(|c| scope_cells(c, scope))
        .filter(|&c| state.grid.try_get(c).is_some_and(|v| v.is_water()))
        .collect();

    for &c in &targets {
        state.grid.set(c, Voxel::of(VoxelKind::Ice));
        let timer = state.ice_timers.entry(c).or_insert(0);
        *timer = (*timer).max(duration);
    }
    if !targets.is_empty() {
        events.push(SimEvent::WaterFrozen {
            cells: targets.len() as u32,
        });
    }
}

// ── Steps 3–8 ──

fn run_reconciliation(
    state: &mut SimulationState,
    blocked: Option<&HashSet<Int3>>,
    mut displaced: Vec<Int3>,
    events: &mut Vec<SimEvent>,
) -> bool {
    // 3. Settle solids.
    if !settle_step(state, blocked, &mut displaced, events) {
        return false;
    }

    // 4. Settle water with everything displaced so far.
    water_step(state, &mut displaced, events);

    // 5. Re-settle solids; water relocation may have unblocked supports.
    if !settle_step(state, blocked, &mut displaced, events) {
        return false;
    }

    // 6. Drains, then one reflow (absorbing step 5's displacements).
    apply_drains(state, events);
    water_step(state, &mut displaced, events);

    // 7. Ice timers.
    let thawed = advance_ice(state, events);
    if thawed > 0 {
        water_step(state, &mut displaced, events);
    }

    // 8. Objectives and fail states.
    evaluate(state, events);
    true
}

fn settle_step(
    state: &mut SimulationState,
    blocked: Option<&HashSet<Int3>>,
    displaced: &mut Vec<Int3>,
    events: &mut Vec<SimEvent>,
) -> bool {
    let result = match blocked {
        None => settle_solids(&mut state.grid, state.gravity),
        Some(set) => match try_settle_solids(&mut state.grid, state.gravity, set) {
            GatedSettleOutcome::Settled(r) => r,
            GatedSettleOutcome::Blocked => {
                debug!("resolve: settle blocked by the active piece");
                return false;
            }
        },
    };
    state.counters.shift_voxels_total += result.shifted_voxels;
    if result.shifted_voxels > 0 {
        events.push(SimEvent::SolidsSettled {
            shifted_voxels: result.shifted_voxels,
        });
    }
    if !result.displaced_water.is_empty() {
        events.push(SimEvent::WaterDisplaced {
            units: result.displaced_water.len() as u64,
        });
        displaced.extend(result.displaced_water);
    }
    true
}

fn water_step(
    state: &mut SimulationState,
    displaced: &mut Vec<Int3>,
    events: &mut Vec<SimEvent>,
) {
    let result = settle_water(&mut state.grid, state.gravity, displaced);
    displaced.clear();
    if result.overflow > 0 {
        state.counters.lost_voxels_total += result.overflow;
        events.push(SimEvent::WaterOverflowed {
            units: result.overflow,
        });
    }
}

// ── Step 6: drains ──

fn apply_drains(state: &mut SimulationState, events: &mut Vec<SimEvent>) {
    let gravity = state.gravity;
    let mut drains: Vec<(CellKey, Int3, crate::domain::voxel::DrainSpec)> = state
        .grid
        .iter_cells()
        .filter_map(|(c, v)| {
            (v.kind == VoxelKind::Drain).then(|| (CellKey::of(c, gravity), c, v.drain))
        })
        .filter_map(|(k, c, d)| d.map(|d| (k, c, d)))
        .collect();
    drains.sort_by_key(|&(k, _, _)| k);

    let mut removed = 0u64;
    for (_, pos, spec) in drains {
        let mut targets: Vec<(CellKey, Int3)> = scope_cells(pos, spec.scope)
            .filter(|&c| state.grid.try_get(c).is_some_and(|v| v.is_water()))
            .map(|c| (CellKey::of(c, gravity), c))
            .collect();
        targets.sort_by_key(|&(k, _)| k);
        for &(_, c) in targets.iter().take(spec.rate.max(0) as usize) {
            state.grid.set(c, Voxel::EMPTY);
            removed += 1;
        }
    }

    if removed > 0 {
        state.counters.water_removed_total += removed;
        events.push(SimEvent::WaterDrained { units: removed });
    }
}

// ── Step 7: ice ──

fn advance_ice(state: &mut SimulationState, events: &mut Vec<SimEvent>) -> u32 {
    let mut expired = Vec::new();
    for (&pos, timer) in state.ice_timers.iter_mut() {
        *timer -= 1;
        if *timer <= 0 {
            expired.push(pos);
        }
    }

    let mut thawed = 0u32;
    for pos in expired {
        state.ice_timers.remove(&pos);
        if state.grid.get(pos).kind == VoxelKind::Ice {
            state.grid.set(pos, Voxel::WATER);
            thawed += 1;
        }
    }
    if thawed > 0 {
        events.push(SimEvent::IceThawed { cells: thawed });
    }
    thawed
}

// ── Step 8: outcome ──

/// Fail states first (first match wins), then the win condition. A level
/// with no objectives can only end through a fail state.
pub fn evaluate(state: &mut SimulationState, events: &mut Vec<SimEvent>) {
    if state.status != Status::InProgress {
        return;
    }
    if let Some(reason) = crate::sim::objective::check_fail(
        &state.grid,
        state.gravity,
        &state.level.constraints,
        state.tilts_remaining,
    ) {
        state.set_status(Status::Lost(reason), events);
        return;
    }
    let objectives = &state.level.objectives;
    let won = !objectives.is_empty()
        && objectives.iter().all(|o| {
            o.progress(
                &state.grid,
                state.counters.water_removed_total,
                state.counters.rotations_executed,
            )
            .complete
        });
    if won {
        state.set_status(Status::Won, events);
    }
}

// ── Scope enumeration ──

/// Cells covered by an ability/drain scope, center included.
fn scope_cells(center: Int3, scope: Scope) -> impl Iterator<Item = Int3> {
    let deltas: Vec<Int3> = match scope {
        Scope::SelfCell => vec![Int3::ZERO],
        Scope::Adj6 => std::iter::once(Int3::ZERO)
            .chain(crate::domain::int3::NEIGHBORS_6)
            .collect(),
        Scope::Adj26 => {
            let mut v = Vec::with_capacity(27);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        v.push(Int3::new(dx, dy, dz));
                    }
                }
            }
            v
        }
    };
    deltas.into_iter().map(move |d| center + d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::int3::GravityDirection;
    use crate::sim::level::parse_level;

    fn state_from(json: &str) -> SimulationState {
        let (level, _) = parse_level(json).unwrap();
        SimulationState::new(level).0
    }

    fn water_cells(state: &SimulationState) -> Vec<Int3> {
        state
            .grid
            .iter_cells()
            .filter(|(_, v)| v.is_water())
            .map(|(c, _)| c)
            .collect()
    }

    /// 3×3×3 box: bedrock at (1,0,1), water at (0,0,0) and (1,1,1), a
    /// solid at (1,2,1). The solid settles onto (1,1,1), displacing one
    /// water unit, which redistributes at ground level.
    #[test]
    fn settling_solid_displaces_water() {
        let mut state = state_from(
            r#"{
                "meta": {"id": "r3", "title": "", "schemaVersion": 1, "seed": 1},
                "bounds": {"x": 3, "y": 3, "z": 3},
                "initialVoxels": [
                    {"pos": [1, 0, 1], "type": "bedrock"},
                    {"pos": [0, 0, 0], "type": "water"},
                    {"pos": [1, 1, 1], "type": "water"},
                    {"pos": [1, 2, 1], "type": "solid"}
                ],
                "bag": {"type": "sequence", "sequence": ["I2"]}
            }"#,
        );
        let mut events = Vec::new();
        assert!(resolve_tilt(&mut state, &HashSet::new(), &mut events));

        assert_eq!(state.grid.get(Int3::new(1, 1, 1)).kind, VoxelKind::Solid);
        assert_eq!(
            water_cells(&state),
            vec![Int3::new(0, 0, 0), Int3::new(0, 0, 1)]
        );
        assert!(events
            .iter()
            .any(|e| matches!(e, SimEvent::WaterDisplaced { units: 1 })));
    }

    /// Drain with rate 1, scope Adj6: exactly one unit removed per resolve;
    /// the survivor reflows to the canonical smallest cell.
    #[test]
    fn drain_removes_up_to_rate() {
        let mut json = String::from(
            r#"{
                "meta": {"id": "r4", "title": "", "schemaVersion": 1, "seed": 1},
                "bounds": {"x": 3, "y": 3, "z": 3},
                "initialVoxels": ["#,
        );
        let mut first = true;
        for x in 0..3 {
            for z in 0..3 {
                if !first {
                    json.push(',');
                }
                first = false;
                json.push_str(&format!(r#"{{"pos": [{x}, 0, {z}], "type": "bedrock"}}"#));
            }
        }
        json.push_str(
            r#",
                    {"pos": [1, 1, 1], "type": "drain", "drain": {"rate": 1, "scope": "adj6"}},
                    {"pos": [1, 1, 0], "type": "water"},
                    {"pos": [1, 1, 2], "type": "water"}
                ],
                "bag": {"type": "sequence", "sequence": ["I2"]}
            }"#,
        );
        let mut state = state_from(&json);
        let mut events = Vec::new();
        assert!(resolve_tilt(&mut state, &HashSet::new(), &mut events));

        assert_eq!(state.counters.water_removed_total, 1);
        assert_eq!(water_cells(&state), vec![Int3::new(0, 1, 0)]);
    }

    /// Resolving an already-settled grid changes nothing.
    #[test]
    fn resolve_is_idempotent_on_a_still_grid() {
        let mut state = state_from(
            r#"{
                "meta": {"id": "ri", "title": "", "schemaVersion": 1, "seed": 1},
                "bounds": {"x": 4, "y": 3, "z": 2},
                "initialVoxels": [
                    {"pos": [0, 0, 0], "type": "bedrock"},
                    {"pos": [0, 1, 0], "type": "solid"},
                    {"pos": [1, 0, 0], "type": "water"},
                    {"pos": [2, 0, 1], "type": "porous"}
                ],
                "bag": {"type": "sequence", "sequence": ["I2"]}
            }"#,
        );
        let mut events = Vec::new();
        assert!(resolve_tilt(&mut state, &HashSet::new(), &mut events));
        let settled = state.grid.clone();
        let counters = state.counters;

        let mut events = Vec::new();
        assert!(resolve_tilt(&mut state, &HashSet::new(), &mut events));
        assert_eq!(state.grid, settled);
        assert_eq!(state.counters, counters);
    }

    /// Water conservation: units + cumulative drained stays constant
    /// across resolves that displace water.
    #[test]
    fn water_is_conserved_up_to_drains() {
        let mut state = state_from(
            r#"{
                "meta": {"id": "rc", "title": "", "schemaVersion": 1, "seed": 1},
                "bounds": {"x": 4, "y": 4, "z": 1},
                "initialVoxels": [
                    {"pos": [0, 0, 0], "type": "water"},
                    {"pos": [1, 0, 0], "type": "water"},
                    {"pos": [2, 0, 0], "type": "water"},
                    {"pos": [1, 3, 0], "type": "solid"},
                    {"pos": [2, 3, 0], "type": "solid"}
                ],
                "bag": {"type": "sequence", "sequence": ["I2"]}
            }"#,
        );
        let before = water_cells(&state).len() as u64;
        let mut events = Vec::new();
        assert!(resolve_tilt(&mut state, &HashSet::new(), &mut events));
        let after = water_cells(&state).len() as u64;
        assert_eq!(
            after + state.counters.water_removed_total + state.counters.lost_voxels_total,
            before
        );
        // The falling pair displaced two units; nothing was drained or lost.
        assert_eq!(after, before);
    }

    /// Ice decays one resolve at a time and thaws back into water.
    #[test]
    fn ice_timers_advance_per_resolve() {
        let mut state = state_from(
            r#"{
                "meta": {"id": "rice", "title": "", "schemaVersion": 1, "seed": 1},
                "bounds": {"x": 2, "y": 2, "z": 1},
                "initialVoxels": [{"pos": [0, 0, 0], "type": "ice"}],
                "bag": {"type": "sequence", "sequence": ["I2"]}
            }"#,
        );
        state.ice_timers.insert(Int3::new(0, 0, 0), 2);

        let mut events = Vec::new();
        assert!(resolve_tilt(&mut state, &HashSet::new(), &mut events));
        assert_eq!(state.grid.get(Int3::new(0, 0, 0)).kind, VoxelKind::Ice);
        assert_eq!(state.ice_timers.get(&Int3::new(0, 0, 0)), Some(&1));

        let mut events = Vec::new();
        assert!(resolve_tilt(&mut state, &HashSet::new(), &mut events));
        assert!(state.grid.get(Int3::new(0, 0, 0)).is_water());
        assert!(state.ice_timers.is_empty());
        assert!(events
            .iter()
            .any(|e| matches!(e, SimEvent::IceThawed { cells: 1 })));
    }

    /// Scenario: tilting drops an unsupported solid onto the active
    /// piece's cells — the reconciliation reports blocked.
    #[test]
    fn reconciliation_blocks_on_piece_cells() {
        let mut state = state_from(
            r#"{
                "meta": {"id": "rb", "title": "", "schemaVersion": 1, "seed": 1},
                "bounds": {"x": 1, "y": 5, "z": 1},
                "initialVoxels": [{"pos": [0, 4, 0], "type": "solid"}],
                "bag": {"type": "sequence", "sequence": ["I2"]}
            }"#,
        );
        let blocked: HashSet<Int3> = [Int3::new(0, 0, 0)].into_iter().collect();
        let mut events = Vec::new();
        assert!(!resolve_tilt(&mut state, &blocked, &mut events));
    }

    #[test]
    fn gravity_matters_to_the_reconciliation() {
        let mut state = state_from(
            r#"{
                "meta": {"id": "rg", "title": "", "schemaVersion": 1, "seed": 1},
                "bounds": {"x": 4, "y": 2, "z": 1},
                "initialVoxels": [{"pos": [0, 1, 0], "type": "solid"}],
                "bag": {"type": "sequence", "sequence": ["I2"]}
            }"#,
        );
        state.gravity = GravityDirection::East;
        let mut events = Vec::new();
        assert!(resolve_tilt(&mut state, &HashSet::new(), &mut events));
        assert_eq!(state.grid.get(Int3::new(3, 1, 0)).kind, VoxelKind::Solid);
    }
}
