/// SimulationState: the complete snapshot of a running simulation.
///
/// ## Ownership
///
/// The grid and all counters are owned exclusively by this struct; the
/// solvers borrow the grid through explicit parameters and hand back
/// structured results. Snapshot/rollback for world rotation is a plain
/// clone of the fields a tilt resolve may touch.
///
/// ## Determinism
///
/// Every field is integer-valued. The only randomness is the two PCG32
/// streams (`bag`, `hazard`), both seeded from the level seed. Anything
/// observable here is serialized by the determinism hash except the
/// stabilize anchor timers, whose layout is pinned out of the hash by the
/// version tag.

use std::collections::{BTreeMap, HashSet};

use crate::domain::grid::Grid;
use crate::domain::int3::{GravityDirection, Int3};
use crate::domain::piece::{ActivePiece, PieceKind};
use crate::domain::rng::{Pcg32, STREAM_BAG, STREAM_HAZARD};
use crate::domain::voxel::Material;
use crate::sim::bag::{Bag, PieceSpec};
use crate::sim::event::SimEvent;
use crate::sim::hazard::WindScheduler;
use crate::sim::level::Level;
use crate::sim::objective::LossReason;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Status {
    InProgress,
    Won,
    Lost(LossReason),
}

/// Monotonic counters, all part of the determinism hash.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Counters {
    pub tick: u64,
    pub pieces_locked: u64,
    pub water_removed_total: u64,
    pub shift_voxels_total: u64,
    pub lost_voxels_total: u64,
    pub rotations_executed: u64,
}

/// Per-drop lock bookkeeping and armed-ability flags. Reset on every spawn.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LockState {
    pub grounded: bool,
    pub delay_remaining: u32,
    pub resets_used: u32,
    pub freeze_armed: bool,
    pub drain_placement_armed: bool,
    pub stabilize_armed: bool,
    pub hold_used_this_drop: bool,
}

/// Ticks of lock delay granted on first grounding.
pub const LOCK_DELAY_TICKS: u32 = 12;
/// Move/rotate resets allowed per drop; the next exhausted delay commits.
pub const LOCK_RESET_LIMIT: u32 = 4;

impl LockState {
    pub fn fresh() -> Self {
        LockState {
            grounded: false,
            delay_remaining: LOCK_DELAY_TICKS,
            resets_used: 0,
            freeze_armed: false,
            drain_placement_armed: false,
            stabilize_armed: false,
            hold_used_this_drop: false,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AbilityCharges {
    pub stabilize: i64,
    pub freeze: i64,
    pub drain_placement: i64,
}

pub struct SimulationState {
    pub level: Level,
    pub grid: Grid,
    pub gravity: GravityDirection,

    // ── Piece supply & control ──
    pub active: Option<ActivePiece>,
    pub lock: LockState,
    pub bag: Bag,
    pub hold: Option<PieceSpec>,

    // ── Randomness ──
    pub bag_rng: Pcg32,
    pub hazard_rng: Pcg32,

    // ── Tracking ──
    pub counters: Counters,
    /// Remaining resolves per frozen cell, sorted by position.
    pub ice_timers: BTreeMap<Int3, i64>,
    /// Remaining successful rotations per stabilize-anchored cell.
    /// Level-authored anchors get no entry; they never decay.
    pub anchor_timers: BTreeMap<Int3, i64>,
    pub wind: Vec<WindScheduler>,
    pub charges: AbilityCharges,
    /// `None` = unlimited.
    pub tilts_remaining: Option<i64>,
    pub last_tilt_tick: Option<u64>,
    pub status: Status,
}

impl SimulationState {
    /// Build the initial state and spawn the first piece. The level is
    /// trusted (validated by the loader).
    pub fn new(level: Level) -> (Self, Vec<SimEvent>) {
        let mut grid = Grid::new(level.bounds);
        for &(pos, voxel) in &level.initial {
            grid.set(pos, voxel);
        }

        let bag_rng = Pcg32::new(level.seed as u64, STREAM_BAG);
        let mut hazard_rng = Pcg32::new(level.seed as u64, STREAM_HAZARD);
        let wind = level
            .hazards
            .iter()
            .map(|cfg| WindScheduler::new(cfg.clone(), &mut hazard_rng))
            .collect();

        let mut state = SimulationState {
            grid,
            gravity: GravityDirection::Down,
            active: None,
            lock: LockState::fresh(),
            bag: Bag::new(level.bag.clone()),
            hold: None,
            bag_rng,
            hazard_rng,
            counters: Counters::default(),
            ice_timers: BTreeMap::new(),
            anchor_timers: BTreeMap::new(),
            wind,
            charges: AbilityCharges {
                stabilize: level.abilities.stabilize_charges,
                freeze: level.abilities.freeze_charges,
                drain_placement: level.abilities.drain_placement_charges,
            },
            tilts_remaining: level.rotation.tilt_budget,
            last_tilt_tick: None,
            status: Status::InProgress,
            level,
        };

        let mut events = Vec::new();
        state.spawn_from_bag(&mut events);
        (state, events)
    }

    // ── Piece spawning ──

    /// Draw the next piece and place it at the spawn origin.
    /// A blocked spawn loses the game.
    pub fn spawn_from_bag(&mut self, events: &mut Vec<SimEvent>) {
        let spec = self.bag.draw(&mut self.bag_rng);
        self.spawn_piece(spec, events);
    }

    /// Spawn a specific piece (bag draw or hold swap-in): orientation 0,
    /// centered on the non-up axes, flush against the top of the up axis.
    pub fn spawn_piece(&mut self, spec: PieceSpec, events: &mut Vec<SimEvent>) {
        let origin = self.spawn_origin(spec.kind);
        let piece = ActivePiece {
            kind: spec.kind,
            orientation: 0,
            origin,
            material: spec.material,
        };
        self.lock = LockState::fresh();
        if piece
            .cells()
            .all(|c| self.grid.try_get(c).is_some_and(|v| v.piece_passable()))
        {
            self.active = Some(piece);
            events.push(SimEvent::PieceSpawned { kind: spec.kind });
        } else {
            self.active = None;
            self.set_status(Status::Lost(LossReason::SpawnBlocked), events);
        }
    }

    fn spawn_origin(&self, kind: PieceKind) -> Int3 {
        let offsets = &kind.orientations()[0];
        let min = fold_each(offsets, i32::min);
        let max = fold_each(offsets, i32::max);
        let size = self.grid.size();
        let up = self.gravity.up();

        let axis = |sz: i32, lo: i32, hi: i32, u: i32| -> i32 {
            if u > 0 {
                // Up points positive: flush against the high boundary.
                (sz - 1) - hi
            } else if u < 0 {
                // Up points negative: flush against the low boundary.
                -lo
            } else {
                // Lateral axis: center the bounding box (low cell on ties).
                (sz - (hi - lo + 1)) / 2 - lo
            }
        };

        Int3::new(
            axis(size.x, min.x, max.x, up.x),
            axis(size.y, min.y, max.y, up.y),
            axis(size.z, min.z, max.z, up.z),
        )
    }

    // ── Queries ──

    pub fn active_cells(&self) -> HashSet<Int3> {
        self.active
            .as_ref()
            .map(|p| p.cells().collect())
            .unwrap_or_default()
    }

    /// Wind mass factor for the active piece (2 for Heavy, else 1).
    pub fn active_mass_factor(&self) -> i64 {
        match self.active.as_ref().and_then(|p| p.material) {
            Some(Material::Heavy) => 2,
            _ => 1,
        }
    }

    pub fn set_status(&mut self, status: Status, events: &mut Vec<SimEvent>) {
        if self.status != status {
            self.status = status;
            events.push(SimEvent::StatusChanged { status });
        }
    }
}

fn fold_each(offsets: &[Int3], f: fn(i32, i32) -> i32) -> Int3 {
    let mut acc = offsets[0];
    for &o in &offsets[1..] {
        acc = Int3::new(f(acc.x, o.x), f(acc.y, o.y), f(acc.z, o.z));
    }
    acc
}
