/// Objectives, constraints, and fail states — truth of "is this level done".
///
/// Objectives are integer-parameterized tagged variants; `progress` computes
/// the current value against the grid and counters without mutating
/// anything. Fail states are checked in a fixed order; the first match wins.
///
/// Heights in objectives and constraints are *world* Y coordinates — they do
/// not rotate with gravity.

use std::collections::HashSet;

use crate::domain::grid::Grid;
use crate::domain::int3::{GravityDirection, Int3};
use crate::domain::voxel::VoxelKind;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Objective {
    DrainWater { target: i64 },
    ReachHeight { height: i64 },
    BuildPlateau { area: i64, world_level: i64 },
    StayUnderWeight { max_mass: i64 },
    SurviveRotations { count: i64 },
}

/// Snapshot of one objective's completion state.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Progress {
    pub current: i64,
    pub target: i64,
    pub complete: bool,
}

impl Objective {
    pub fn progress(
        &self,
        grid: &Grid,
        water_removed_total: u64,
        rotations_executed: u64,
    ) -> Progress {
        match *self {
            Objective::DrainWater { target } => {
                let current = water_removed_total as i64;
                Progress {
                    current,
                    target,
                    complete: current >= target,
                }
            }
            Objective::ReachHeight { height } => {
                let current = max_built_height(grid);
                Progress {
                    current,
                    target: height,
                    complete: current >= height,
                }
            }
            Objective::BuildPlateau { area, world_level } => {
                let current = largest_plateau(grid, world_level);
                Progress {
                    current,
                    target: area,
                    complete: current >= area,
                }
            }
            Objective::StayUnderWeight { max_mass } => {
                let current = solid_mass(grid);
                Progress {
                    current,
                    target: max_mass,
                    complete: current <= max_mass,
                }
            }
            Objective::SurviveRotations { count } => {
                let current = rotations_executed as i64;
                Progress {
                    current,
                    target: count,
                    complete: current >= count,
                }
            }
        }
    }
}

/// Max world `y` over non-Empty, non-Water voxels; −1 on a bare grid.
fn max_built_height(grid: &Grid) -> i64 {
    grid.iter_cells()
        .filter(|(_, v)| !matches!(v.kind, VoxelKind::Empty | VoxelKind::Water))
        .map(|(c, _)| i64::from(c.y))
        .max()
        .unwrap_or(-1)
}

/// Total mass of Solid voxels (Standard = 1, Heavy = 2, Reinforced = 1).
pub fn solid_mass(grid: &Grid) -> i64 {
    grid.iter_cells()
        .filter(|(_, v)| v.kind == VoxelKind::Solid)
        .map(|(_, v)| v.material.map_or(1, |m| m.mass()))
        .sum()
}

/// Largest 4-connected (X, Z) region of support-capable voxels at
/// `y == world_level`.
fn largest_plateau(grid: &Grid, world_level: i64) -> i64 {
    let size = grid.size();
    if world_level < 0 || world_level >= i64::from(size.y) {
        return 0;
    }
    let y = world_level as i32;
    let member = |x: i32, z: i32| -> bool {
        grid.try_get(Int3::new(x, y, z))
            .is_some_and(|v| v.supports_from_below())
    };

    let mut visited: HashSet<(i32, i32)> = HashSet::new();
    let mut best = 0i64;
    for x in 0..size.x {
        for z in 0..size.z {
            if !member(x, z) || visited.contains(&(x, z)) {
                continue;
            }
            let mut area = 0i64;
            let mut stack = vec![(x, z)];
            visited.insert((x, z));
            while let Some((cx, cz)) = stack.pop() {
                area += 1;
                for (nx, nz) in [(cx + 1, cz), (cx - 1, cz), (cx, cz + 1), (cx, cz - 1)] {
                    if member(nx, nz) && visited.insert((nx, nz)) {
                        stack.push((nx, nz));
                    }
                }
            }
            best = best.max(area);
        }
    }
    best
}

// ── Constraints & fail states ──

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Constraints {
    pub max_world_height: Option<i64>,
    pub max_mass: Option<i64>,
    pub water_forbidden_min: Option<i64>,
    pub no_resting_on_water: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LossReason {
    Overflow,
    WeightExceeded,
    WaterForbidden,
    RestingOnWater,
    TiltBudgetExceeded,
    SpawnBlocked,
}

impl LossReason {
    pub fn describe(self) -> &'static str {
        match self {
            LossReason::Overflow => "solid above the maximum world height",
            LossReason::WeightExceeded => "total mass above the limit",
            LossReason::WaterForbidden => "water above the forbidden height",
            LossReason::RestingOnWater => "a solid came to rest on water",
            LossReason::TiltBudgetExceeded => "tilt budget overdrawn",
            LossReason::SpawnBlocked => "the next piece could not spawn",
        }
    }
}

/// First-match-wins fail check, in the pinned order.
pub fn check_fail(
    grid: &Grid,
    gravity: GravityDirection,
    constraints: &Constraints,
    tilts_remaining: Option<i64>,
) -> Option<LossReason> {
    if let Some(max_h) = constraints.max_world_height {
        let breached = grid
            .iter_cells()
            .any(|(c, v)| v.kind == VoxelKind::Solid && i64::from(c.y) > max_h);
        if breached {
            return Some(LossReason::Overflow);
        }
    }

    if let Some(max_mass) = constraints.max_mass {
        if solid_mass(grid) > max_mass {
            return Some(LossReason::WeightExceeded);
        }
    }

    if let Some(min_y) = constraints.water_forbidden_min {
        let breached = grid
            .iter_cells()
            .any(|(c, v)| v.is_water() && i64::from(c.y) >= min_y);
        if breached {
            return Some(LossReason::WaterForbidden);
        }
    }

    if constraints.no_resting_on_water {
        let g = gravity.vector();
        let breached = grid.iter_cells().any(|(c, v)| {
            v.is_settleable()
                && !v.anchored
                && grid.try_get(c + g).is_some_and(|below| below.is_water())
        });
        if breached {
            return Some(LossReason::RestingOnWater);
        }
    }

    // Rejected at input time normally; a negative counter is a hard fail.
    if tilts_remaining.is_some_and(|t| t < 0) {
        return Some(LossReason::TiltBudgetExceeded);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::voxel::{Material, Voxel};

    fn grid_3x3x3() -> Grid {
        Grid::new(Int3::new(3, 3, 3))
    }

    #[test]
    fn reach_height_ignores_water() {
        let mut g = grid_3x3x3();
        g.set(Int3::new(0, 2, 0), Voxel::WATER);
        g.set(Int3::new(1, 1, 1), Voxel::solid(Material::Standard, false));
        let p = Objective::ReachHeight { height: 1 }.progress(&g, 0, 0);
        assert_eq!(p.current, 1);
        assert!(p.complete);
        let p = Objective::ReachHeight { height: 2 }.progress(&g, 0, 0);
        assert!(!p.complete);
    }

    #[test]
    fn reach_height_on_bare_grid_is_negative() {
        let g = grid_3x3x3();
        let p = Objective::ReachHeight { height: 0 }.progress(&g, 0, 0);
        assert_eq!(p.current, -1);
        assert!(!p.complete);
    }

    #[test]
    fn drain_water_reads_the_counter() {
        let g = grid_3x3x3();
        let p = Objective::DrainWater { target: 5 }.progress(&g, 5, 0);
        assert!(p.complete);
        let p = Objective::DrainWater { target: 5 }.progress(&g, 4, 0);
        assert!(!p.complete);
    }

    #[test]
    fn weight_counts_solids_only() {
        let mut g = grid_3x3x3();
        g.set(Int3::new(0, 0, 0), Voxel::solid(Material::Heavy, false));
        g.set(Int3::new(1, 0, 0), Voxel::solid(Material::Standard, false));
        g.set(Int3::new(2, 0, 0), Voxel::of(VoxelKind::Bedrock));
        assert_eq!(solid_mass(&g), 3);
        let p = Objective::StayUnderWeight { max_mass: 3 }.progress(&g, 0, 0);
        assert!(p.complete);
        let p = Objective::StayUnderWeight { max_mass: 2 }.progress(&g, 0, 0);
        assert!(!p.complete);
    }

    #[test]
    fn plateau_is_largest_connected_region() {
        let mut g = Grid::new(Int3::new(4, 2, 4));
        // L-shaped region of 3 at y=0, plus an isolated cell.
        g.set(Int3::new(0, 0, 0), Voxel::solid(Material::Standard, false));
        g.set(Int3::new(1, 0, 0), Voxel::solid(Material::Standard, false));
        g.set(Int3::new(1, 0, 1), Voxel::of(VoxelKind::Bedrock));
        g.set(Int3::new(3, 0, 3), Voxel::solid(Material::Standard, false));
        let p = Objective::BuildPlateau {
            area: 3,
            world_level: 0,
        }
        .progress(&g, 0, 0);
        assert_eq!(p.current, 3);
        assert!(p.complete);
    }

    #[test]
    fn fail_order_overflow_before_weight() {
        let mut g = grid_3x3x3();
        g.set(Int3::new(0, 2, 0), Voxel::solid(Material::Heavy, false));
        let constraints = Constraints {
            max_world_height: Some(1),
            max_mass: Some(1),
            ..Constraints::default()
        };
        assert_eq!(
            check_fail(&g, GravityDirection::Down, &constraints, None),
            Some(LossReason::Overflow)
        );
    }

    #[test]
    fn water_forbidden_is_inclusive() {
        let mut g = grid_3x3x3();
        g.set(Int3::new(0, 2, 0), Voxel::WATER);
        let constraints = Constraints {
            water_forbidden_min: Some(2),
            ..Constraints::default()
        };
        assert_eq!(
            check_fail(&g, GravityDirection::Down, &constraints, None),
            Some(LossReason::WaterForbidden)
        );
    }

    #[test]
    fn resting_on_water_respects_anchors_and_gravity() {
        let mut g = grid_3x3x3();
        g.set(Int3::new(1, 1, 1), Voxel::solid(Material::Standard, false));
        g.set(Int3::new(1, 0, 1), Voxel::WATER);
        let constraints = Constraints {
            no_resting_on_water: true,
            ..Constraints::default()
        };
        assert_eq!(
            check_fail(&g, GravityDirection::Down, &constraints, None),
            Some(LossReason::RestingOnWater)
        );
        // Anchored solids are exempt.
        g.set(Int3::new(1, 1, 1), Voxel::solid(Material::Standard, true));
        assert_eq!(check_fail(&g, GravityDirection::Down, &constraints, None), None);
        // Under East gravity the water is no longer "below".
        g.set(Int3::new(1, 1, 1), Voxel::solid(Material::Standard, false));
        assert_eq!(check_fail(&g, GravityDirection::East, &constraints, None), None);
    }

    #[test]
    fn negative_tilt_budget_is_a_hard_fail() {
        let g = grid_3x3x3();
        assert_eq!(
            check_fail(&g, GravityDirection::Down, &Constraints::default(), Some(-1)),
            Some(LossReason::TiltBudgetExceeded)
        );
        assert_eq!(
            check_fail(&g, GravityDirection::Down, &Constraints::default(), Some(0)),
            None
        );
    }
}
