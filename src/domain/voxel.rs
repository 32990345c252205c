/// Voxel kinds and their properties.
/// Properties are queried via methods, not stored as flags,
/// so cell semantics are centralized here.

/// Ability/drain effect radius.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Scope {
    SelfCell,
    Adj6,
    Adj26,
}

impl Scope {
    pub fn from_name(s: &str) -> Option<Scope> {
        match s {
            "self" => Some(Scope::SelfCell),
            "adj6" => Some(Scope::Adj6),
            "adj26" => Some(Scope::Adj26),
            _ => None,
        }
    }
}

/// Solid material. Mass and lock behavior vary; everything else is uniform.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Material {
    Standard,
    Heavy,
    Reinforced,
}

impl Material {
    /// Mass contribution for the weight constraint and objective.
    pub fn mass(self) -> i64 {
        match self {
            Material::Standard => 1,
            Material::Heavy => 2,
            Material::Reinforced => 1,
        }
    }

    /// Stable single-byte code for the determinism hash.
    pub fn code(self) -> u8 {
        match self {
            Material::Standard => 0,
            Material::Heavy => 1,
            Material::Reinforced => 2,
        }
    }

    pub fn from_name(s: &str) -> Option<Material> {
        match s {
            "standard" => Some(Material::Standard),
            "heavy" => Some(Material::Heavy),
            "reinforced" => Some(Material::Reinforced),
            _ => None,
        }
    }
}

/// Per-drain configuration: how many water units it removes per resolve,
/// and from how far.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DrainSpec {
    pub rate: i32,
    pub scope: Scope,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VoxelKind {
    Empty,
    Solid,
    Wall,
    Bedrock,
    Water,
    Ice,
    Porous,
    Drain,
}

/// One cell of the grid: an occupancy tag plus optional material, the
/// anchored flag, and (for drains only) the drain configuration.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Voxel {
    pub kind: VoxelKind,
    pub material: Option<Material>,
    pub anchored: bool,
    pub drain: Option<DrainSpec>,
}

impl Voxel {
    pub const EMPTY: Voxel = Voxel {
        kind: VoxelKind::Empty,
        material: None,
        anchored: false,
        drain: None,
    };

    pub const WATER: Voxel = Voxel {
        kind: VoxelKind::Water,
        material: None,
        anchored: false,
        drain: None,
    };

    pub fn of(kind: VoxelKind) -> Voxel {
        Voxel {
            kind,
            material: None,
            anchored: false,
            drain: None,
        }
    }

    pub fn solid(material: Material, anchored: bool) -> Voxel {
        Voxel {
            kind: VoxelKind::Solid,
            material: Some(material),
            anchored,
            drain: None,
        }
    }

    pub fn drain(spec: DrainSpec) -> Voxel {
        Voxel {
            kind: VoxelKind::Drain,
            material: None,
            anchored: false,
            drain: Some(spec),
        }
    }

    // ── Occupancy queries ──

    pub fn is_empty(self) -> bool {
        self.kind == VoxelKind::Empty
    }

    pub fn is_water(self) -> bool {
        self.kind == VoxelKind::Water
    }

    /// Can a solid settling along gravity rest on this cell?
    /// Water and Empty never support.
    pub fn supports_from_below(self) -> bool {
        matches!(
            self.kind,
            VoxelKind::Solid
                | VoxelKind::Wall
                | VoxelKind::Bedrock
                | VoxelKind::Ice
                | VoxelKind::Drain
                | VoxelKind::Porous
        )
    }

    /// Immovable terrain whose mere 6-adjacency supports a solid.
    /// Solid and Porous are not in this set; anchored voxels are handled
    /// separately by the settler.
    pub fn is_rigid_support(self) -> bool {
        matches!(
            self.kind,
            VoxelKind::Wall | VoxelKind::Bedrock | VoxelKind::Ice | VoxelKind::Drain
        )
    }

    /// Does this cell belong to a settling component (a movable solid)?
    pub fn is_settleable(self) -> bool {
        matches!(self.kind, VoxelKind::Solid | VoxelKind::Porous)
    }

    /// Can the active piece occupy this cell? Water is displaced on merge,
    /// so it counts as free space for the piece.
    pub fn piece_passable(self) -> bool {
        matches!(self.kind, VoxelKind::Empty | VoxelKind::Water)
    }

    /// Can water *pathing* traverse this cell? Porous is passable but never
    /// occupiable; Water cells are cleared before the flood runs.
    pub fn water_passable(self) -> bool {
        matches!(self.kind, VoxelKind::Empty | VoxelKind::Water | VoxelKind::Porous)
    }

    /// Can water *end its fill* in this cell? Only truly empty cells.
    pub fn water_occupiable(self) -> bool {
        self.kind == VoxelKind::Empty
    }

    /// Does a falling component pass through this cell? The settler treats
    /// water and empty space as transparent.
    pub fn settle_transparent(self) -> bool {
        matches!(self.kind, VoxelKind::Empty | VoxelKind::Water)
    }

    /// Stable single-byte code for the determinism hash.
    pub fn kind_code(self) -> u8 {
        match self.kind {
            VoxelKind::Empty => 0,
            VoxelKind::Solid => 1,
            VoxelKind::Wall => 2,
            VoxelKind::Bedrock => 3,
            VoxelKind::Water => 4,
            VoxelKind::Ice => 5,
            VoxelKind::Porous => 6,
            VoxelKind::Drain => 7,
        }
    }
}

impl Default for Voxel {
    fn default() -> Self {
        Voxel::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_never_supports() {
        assert!(!Voxel::WATER.supports_from_below());
        assert!(!Voxel::EMPTY.supports_from_below());
        assert!(Voxel::of(VoxelKind::Porous).supports_from_below());
        assert!(Voxel::of(VoxelKind::Ice).supports_from_below());
    }

    #[test]
    fn porous_is_passable_not_occupiable() {
        let p = Voxel::of(VoxelKind::Porous);
        assert!(p.water_passable());
        assert!(!p.water_occupiable());
        assert!(!p.piece_passable());
    }

    #[test]
    fn drain_blocks_water_pathing() {
        let d = Voxel::drain(DrainSpec {
            rate: 1,
            scope: Scope::Adj6,
        });
        assert!(!d.water_passable());
        assert!(d.supports_from_below());
        assert!(d.is_rigid_support());
    }

    #[test]
    fn piece_passes_water_but_not_solids() {
        assert!(Voxel::WATER.piece_passable());
        assert!(Voxel::EMPTY.piece_passable());
        assert!(!Voxel::solid(Material::Standard, false).piece_passable());
        assert!(!Voxel::of(VoxelKind::Wall).piece_passable());
    }

    #[test]
    fn material_masses() {
        assert_eq!(Material::Standard.mass(), 1);
        assert_eq!(Material::Heavy.mass(), 2);
        assert_eq!(Material::Reinforced.mass(), 1);
    }
}
