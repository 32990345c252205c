/// Solid settler — connected-component gravity settling.
///
/// ## Support specification
///
/// A component (6-connected set of Solid/Porous voxels) does NOT move if
/// ANY of:
///   - a member is `anchored`
///   - a member's cell below (along gravity) is support-capable terrain
///     (Solid, Wall, Bedrock, Ice, Drain, Porous) outside the component
///   - a member's cell below is outside the grid (the boundary is floor)
///   - a member is 6-adjacent to Wall, Bedrock, Ice, Drain, or an anchored
///     voxel (structural cohesion)
///
/// Water and Empty never support, and are transparent to a falling
/// component. Every water cell a component lands in is recorded as a
/// displaced-water source for the next water settle.
///
/// ## Processing order
///
/// Components move one at a time, lowest `(min gravElev, min tieCoord)`
/// first, re-scanning after every move until a pass moves nothing. The loop
/// is capped at one iteration per grid cell.

use std::collections::HashSet;

use crate::domain::grid::Grid;
use crate::domain::int3::{grav_elev, tie_coord, GravityDirection, Int3, NEIGHBORS_6};
use crate::domain::voxel::Voxel;

#[derive(Clone, Debug, Default)]
pub struct SolidSettleResult {
    /// Cells that held water when a settling voxel entered them, in the
    /// order the moves happened. One entry per displaced unit.
    pub displaced_water: Vec<Int3>,
    /// Sum of `component size × drop distance` over all executed moves.
    pub shifted_voxels: u64,
}

/// Outcome of the gated variant: either the settle ran to quiescence, or an
/// intended move would have entered the blocked set. On `Blocked` the grid
/// may hold partial progress — the caller snapshots and restores.
#[derive(Debug)]
pub enum GatedSettleOutcome {
    Settled(SolidSettleResult),
    Blocked,
}

pub fn settle_solids(grid: &mut Grid, gravity: GravityDirection) -> SolidSettleResult {
    match settle_inner(grid, gravity, None) {
        GatedSettleOutcome::Settled(r) => r,
        GatedSettleOutcome::Blocked => unreachable!("ungated settle cannot block"),
    }
}

/// Settle, but abort with `Blocked` if any move would write a cell in
/// `blocked` (used during tilt resolve with the active piece as obstacle).
pub fn try_settle_solids(
    grid: &mut Grid,
    gravity: GravityDirection,
    blocked: &HashSet<Int3>,
) -> GatedSettleOutcome {
    settle_inner(grid, gravity, Some(blocked))
}

fn settle_inner(
    grid: &mut Grid,
    gravity: GravityDirection,
    blocked: Option<&HashSet<Int3>>,
) -> GatedSettleOutcome {
    let g = gravity.vector();
    let mut result = SolidSettleResult::default();
    let cap = grid.volume();

    for _ in 0..cap {
        let mut components = collect_components(grid, gravity);
        components.sort_by_key(|c| c.order_key);

        let mover = components
            .iter()
            .find(|c| !is_supported(grid, g, c));
        let Some(comp) = mover else {
            return GatedSettleOutcome::Settled(result);
        };

        let d = drop_distance(grid, g, comp);
        if d == 0 {
            // Unsupported but immobile (wedged against the boundary);
            // nothing further can move below it either.
            return GatedSettleOutcome::Settled(result);
        }

        if let Some(blocked) = blocked {
            // The blocked set is not in the grid (the active piece), so a
            // fall can sweep straight through it; every swept position
            // counts as entering.
            let enters_blocked = comp.cells.iter().any(|&c| {
                (1..=d).any(|k| {
                    let target = c + g * k;
                    blocked.contains(&target) && !comp.members.contains(&target)
                })
            });
            if enters_blocked {
                return GatedSettleOutcome::Blocked;
            }
        }

        // Atomic move: clear every original cell, then write every target.
        let moved: Vec<(Int3, Voxel)> =
            comp.cells.iter().map(|&c| (c, grid.get(c))).collect();
        for &(c, _) in &moved {
            grid.set(c, Voxel::EMPTY);
        }
        for &(c, v) in &moved {
            let target = c + g * d;
            if grid.get(target).is_water() {
                result.displaced_water.push(target);
            }
            grid.set(target, v);
        }
        result.shifted_voxels += comp.cells.len() as u64 * d as u64;
    }

    GatedSettleOutcome::Settled(result)
}

// ── Components ──

struct Component {
    cells: Vec<Int3>,
    members: HashSet<Int3>,
    /// `(min gravElev, min tieCoord)` over the members.
    order_key: (i32, [i32; 3]),
}

fn collect_components(grid: &Grid, gravity: GravityDirection) -> Vec<Component> {
    let mut visited: HashSet<Int3> = HashSet::new();
    let mut out = Vec::new();
    for (start, v) in grid.iter_cells() {
        if !v.is_settleable() || visited.contains(&start) {
            continue;
        }
        let mut cells = Vec::new();
        let mut stack = vec![start];
        visited.insert(start);
        while let Some(c) = stack.pop() {
            cells.push(c);
            for n in NEIGHBORS_6 {
                let nc = c + n;
                if grid.try_get(nc).is_some_and(Voxel::is_settleable) && visited.insert(nc) {
                    stack.push(nc);
                }
            }
        }
        let members: HashSet<Int3> = cells.iter().copied().collect();
        out.push(Component {
            order_key: component_key(&cells, gravity),
            cells,
            members,
        });
    }
    out
}

/// `(min gravElev, min tieCoord)`, the two minima taken independently.
fn component_key(cells: &[Int3], gravity: GravityDirection) -> (i32, [i32; 3]) {
    let min_elev = cells
        .iter()
        .map(|&c| grav_elev(c, gravity))
        .min()
        .unwrap_or(i32::MAX);
    let min_tie = cells
        .iter()
        .map(|&c| tie_coord(c, gravity))
        .min()
        .unwrap_or([i32::MAX; 3]);
    (min_elev, min_tie)
}

fn is_supported(grid: &Grid, g: Int3, comp: &Component) -> bool {
    for &c in &comp.cells {
        let v = grid.get(c);
        if v.anchored {
            return true;
        }
        let below = c + g;
        match grid.try_get(below) {
            // The grid boundary is floor.
            None => return true,
            Some(b) => {
                if b.supports_from_below() && !comp.members.contains(&below) {
                    return true;
                }
            }
        }
        for n in NEIGHBORS_6 {
            if let Some(adj) = grid.try_get(c + n) {
                if adj.is_rigid_support() || adj.anchored {
                    return true;
                }
            }
        }
    }
    false
}

/// Largest `d ≥ 0` such that every member translated by each of
/// `1..=d` steps stays in bounds and lands only in transparent cells or
/// cells of the component itself. Growing step by step keeps a component
/// from tunneling through a thin floor.
fn drop_distance(grid: &Grid, g: Int3, comp: &Component) -> i32 {
    let mut d = 0;
    'outer: loop {
        let next = d + 1;
        for &c in &comp.cells {
            let target = c + g * next;
            if !grid.in_bounds(target) {
                break 'outer;
            }
            if !comp.members.contains(&target) && !grid.get(target).settle_transparent() {
                break 'outer;
            }
        }
        d = next;
    }
    d
}
