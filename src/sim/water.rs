/// Water equilibrium — discrete, unit-per-cell minimax flood fill.
///
/// For every cell, `req[c]` is the minimum over all paths from any source of
/// the maximum `gravElev` along the path: the water level a source must
/// reach before a unit can arrive at `c`. The fill then takes the first `N`
/// occupiable cells in `(req, gravElev, tieCoord)` order.
///
/// `N` counts the current water cells plus one unit per displacement event;
/// a displaced source cell seeds pathing only while it is still passable
/// (a source buried under a solid is dropped as a seed, its unit is not).
///
/// The solver is pure on its inputs: it clears the water cells it collected
/// and writes the cells it fills, nothing else.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use crate::domain::grid::Grid;
use crate::domain::int3::{grav_elev, CellKey, GravityDirection, Int3, NEIGHBORS_6};
use crate::domain::voxel::Voxel;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WaterSettleResult {
    /// Units placed back into the grid.
    pub filled: u64,
    /// Units beyond fillable capacity: `N − |C|` when positive. Whether this
    /// is a fail state is level policy, not the solver's concern.
    pub overflow: u64,
}

pub fn settle_water(
    grid: &mut Grid,
    gravity: GravityDirection,
    displaced: &[Int3],
) -> WaterSettleResult {
    // Collect and clear the current water set.
    let water: Vec<Int3> = grid
        .iter_cells()
        .filter(|(_, v)| v.is_water())
        .map(|(c, _)| c)
        .collect();
    let units = water.len() as u64 + displaced.len() as u64;
    if units == 0 {
        return WaterSettleResult::default();
    }

    let sources: BTreeSet<Int3> = water.iter().chain(displaced.iter()).copied().collect();
    for &c in &water {
        grid.set(c, Voxel::EMPTY);
    }

    let req = minimax_flood(grid, gravity, &sources);

    // Occupiable candidates in canonical fill order.
    let mut candidates: Vec<(i32, CellKey)> = req
        .iter()
        .filter(|(&c, _)| grid.get(c).water_occupiable())
        .map(|(&c, &r)| (r, CellKey::of(c, gravity)))
        .collect();
    candidates.sort_unstable();

    let fill = units.min(candidates.len() as u64);
    for &(_, key) in candidates.iter().take(fill as usize) {
        grid.set(cell_of_key(key, gravity), Voxel::WATER);
    }

    WaterSettleResult {
        filled: fill,
        overflow: units - fill,
    }
}

/// Dijkstra-style priority-first traversal with relaxation
/// `cand = max(req[cur], gravElev(next))`. The queue is ordered by
/// `(req, gravElev, tieCoord)` so ties pop in canonical order and the solve
/// is independent of insertion order.
fn minimax_flood(
    grid: &Grid,
    gravity: GravityDirection,
    sources: &BTreeSet<Int3>,
) -> HashMap<Int3, i32> {
    let mut req: HashMap<Int3, i32> = HashMap::new();
    let mut heap: BinaryHeap<Reverse<(i32, CellKey)>> = BinaryHeap::new();

    for &s in sources {
        // A source buried by a solid is dropped.
        if grid.get(s).water_passable() {
            let r = grav_elev(s, gravity);
            req.insert(s, r);
            heap.push(Reverse((r, CellKey::of(s, gravity))));
        }
    }

    while let Some(Reverse((r, key))) = heap.pop() {
        let c = cell_of_key(key, gravity);
        if req.get(&c).copied() != Some(r) {
            continue; // stale entry
        }
        for n in NEIGHBORS_6 {
            let next = c + n;
            if !grid.try_get(next).is_some_and(Voxel::water_passable) {
                continue;
            }
            let cand = r.max(grav_elev(next, gravity));
            if req.get(&next).is_none_or(|&cur| cand < cur) {
                req.insert(next, cand);
                heap.push(Reverse((cand, CellKey::of(next, gravity))));
            }
        }
    }
    req
}

/// Invert `tieCoord`: the `(U, R, F)` triple is an orthonormal basis, so a
/// key identifies exactly one cell.
fn cell_of_key(key: CellKey, gravity: GravityDirection) -> Int3 {
    let [cu, cr, cf] = key.tie;
    gravity.up() * cu + gravity.right() * cr + gravity.forward() * cf
}
