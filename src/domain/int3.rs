/// Integer coordinates, gravity directions, and the canonical cell order.
///
/// Everything the solvers iterate over is ordered by `(gravElev, tieCoord)`:
///   - `gravElev(c, d)` — projection of `c` onto the up vector of gravity `d`
///   - `tieCoord(c, d)` — `(c·U, c·R, c·F)` for a fixed per-gravity triple
///
/// The gravity → `(U, R, F)` table is closed. Changing any row is a breaking
/// change to the determinism hash and requires a new hash version tag.

use std::ops::{Add, Mul, Neg, Sub};

/// Three signed integer coordinates. The only coordinate type in the core;
/// no floating-point alternative exists.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Int3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Int3 {
    pub const ZERO: Int3 = Int3 { x: 0, y: 0, z: 0 };

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Int3 { x, y, z }
    }

    pub fn dot(self, other: Int3) -> i32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
}

impl Add for Int3 {
    type Output = Int3;
    fn add(self, o: Int3) -> Int3 {
        Int3::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl Sub for Int3 {
    type Output = Int3;
    fn sub(self, o: Int3) -> Int3 {
        Int3::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl Mul<i32> for Int3 {
    type Output = Int3;
    fn mul(self, k: i32) -> Int3 {
        Int3::new(self.x * k, self.y * k, self.z * k)
    }
}

impl Neg for Int3 {
    type Output = Int3;
    fn neg(self) -> Int3 {
        Int3::new(-self.x, -self.y, -self.z)
    }
}

// ── Integer 3×3 rotation matrices ──

/// A 3×3 integer matrix, stored as rows. Only the 24 proper cube rotations
/// (determinant +1, orthonormal integer columns) are ever constructed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rot3 {
    pub rows: [[i32; 3]; 3],
}

impl Rot3 {
    pub const IDENTITY: Rot3 = Rot3 {
        rows: [[1, 0, 0], [0, 1, 0], [0, 0, 1]],
    };

    /// 90° about +Y: (x, y, z) → (z, y, −x).
    pub const YAW_CW: Rot3 = Rot3 {
        rows: [[0, 0, 1], [0, 1, 0], [-1, 0, 0]],
    };
    /// −90° about +Y: (x, y, z) → (−z, y, x).
    pub const YAW_CCW: Rot3 = Rot3 {
        rows: [[0, 0, -1], [0, 1, 0], [1, 0, 0]],
    };
    /// 90° about +X: (x, y, z) → (x, −z, y).
    pub const PITCH_CW: Rot3 = Rot3 {
        rows: [[1, 0, 0], [0, 0, -1], [0, 1, 0]],
    };
    /// −90° about +X: (x, y, z) → (x, z, −y).
    pub const PITCH_CCW: Rot3 = Rot3 {
        rows: [[1, 0, 0], [0, 0, 1], [0, -1, 0]],
    };
    /// 90° about +Z: (x, y, z) → (−y, x, z).
    pub const ROLL_CW: Rot3 = Rot3 {
        rows: [[0, -1, 0], [1, 0, 0], [0, 0, 1]],
    };
    /// −90° about +Z: (x, y, z) → (y, −x, z).
    pub const ROLL_CCW: Rot3 = Rot3 {
        rows: [[0, 1, 0], [-1, 0, 0], [0, 0, 1]],
    };

    pub fn apply(self, v: Int3) -> Int3 {
        let r = &self.rows;
        Int3::new(
            r[0][0] * v.x + r[0][1] * v.y + r[0][2] * v.z,
            r[1][0] * v.x + r[1][1] * v.y + r[1][2] * v.z,
            r[2][0] * v.x + r[2][1] * v.y + r[2][2] * v.z,
        )
    }

    /// Matrix product `self · other` (apply `other` first, then `self`).
    #[allow(dead_code)]
    pub fn compose(self, other: Rot3) -> Rot3 {
        let mut rows = [[0i32; 3]; 3];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.rows[i][k] * other.rows[k][j]).sum();
            }
        }
        Rot3 { rows }
    }

    pub fn determinant(self) -> i32 {
        let r = &self.rows;
        r[0][0] * (r[1][1] * r[2][2] - r[1][2] * r[2][1])
            - r[0][1] * (r[1][0] * r[2][2] - r[1][2] * r[2][0])
            + r[0][2] * (r[1][0] * r[2][1] - r[1][1] * r[2][0])
    }
}

// ── Gravity ──

/// The five permitted gravity directions. Up is never a gameplay gravity
/// value; a world rotation that would produce it is rejected.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum GravityDirection {
    Down,
    North,
    South,
    East,
    West,
}

impl GravityDirection {
    pub const ALL: [GravityDirection; 5] = [
        GravityDirection::Down,
        GravityDirection::North,
        GravityDirection::South,
        GravityDirection::East,
        GravityDirection::West,
    ];

    /// The gravity vector `g`.
    pub fn vector(self) -> Int3 {
        match self {
            GravityDirection::Down => Int3::new(0, -1, 0),
            GravityDirection::North => Int3::new(0, 0, -1),
            GravityDirection::South => Int3::new(0, 0, 1),
            GravityDirection::East => Int3::new(1, 0, 0),
            GravityDirection::West => Int3::new(-1, 0, 0),
        }
    }

    /// The up vector `u = −g`.
    pub fn up(self) -> Int3 {
        -self.vector()
    }

    /// Right vector `R` from the closed table.
    pub fn right(self) -> Int3 {
        match self {
            GravityDirection::Down => Int3::new(1, 0, 0),
            GravityDirection::North => Int3::new(1, 0, 0),
            GravityDirection::South => Int3::new(1, 0, 0),
            GravityDirection::East => Int3::new(0, 0, 1),
            GravityDirection::West => Int3::new(0, 0, 1),
        }
    }

    /// Forward vector `F` from the closed table.
    pub fn forward(self) -> Int3 {
        match self {
            GravityDirection::Down => Int3::new(0, 0, 1),
            GravityDirection::North => Int3::new(0, -1, 0),
            GravityDirection::South => Int3::new(0, 1, 0),
            GravityDirection::East => Int3::new(0, -1, 0),
            GravityDirection::West => Int3::new(0, 1, 0),
        }
    }

    /// Map a unit vector back to a direction. `None` for Up or any
    /// non-cardinal vector.
    pub fn from_vector(v: Int3) -> Option<GravityDirection> {
        GravityDirection::ALL.iter().copied().find(|d| d.vector() == v)
    }

    /// Stable single-byte code for the determinism hash.
    pub fn code(self) -> u8 {
        match self {
            GravityDirection::Down => 0,
            GravityDirection::North => 1,
            GravityDirection::South => 2,
            GravityDirection::East => 3,
            GravityDirection::West => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GravityDirection::Down => "down",
            GravityDirection::North => "north",
            GravityDirection::South => "south",
            GravityDirection::East => "east",
            GravityDirection::West => "west",
        }
    }

    pub fn from_name(s: &str) -> Option<GravityDirection> {
        GravityDirection::ALL.iter().copied().find(|d| d.name() == s)
    }
}

// ── Canonical ordering ──

/// Elevation of `c` along the up axis of gravity `d`.
#[inline]
pub fn grav_elev(c: Int3, d: GravityDirection) -> i32 {
    c.dot(d.up())
}

/// Tie-break coordinates `(c·U, c·R, c·F)`.
#[inline]
pub fn tie_coord(c: Int3, d: GravityDirection) -> [i32; 3] {
    [c.dot(d.up()), c.dot(d.right()), c.dot(d.forward())]
}

/// The total order used wherever iteration order could leak
/// nondeterminism: settler component scheduling, water fill order,
/// drain passes. Compares `(gravElev, tieCoord)` ascending.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct CellKey {
    pub elev: i32,
    pub tie: [i32; 3],
}

impl CellKey {
    #[inline]
    pub fn of(c: Int3, d: GravityDirection) -> CellKey {
        CellKey {
            elev: grav_elev(c, d),
            tie: tie_coord(c, d),
        }
    }
}

/// The 6-neighborhood, in a fixed enumeration order. Traversals that need
/// determinism must feed results through `CellKey`, not rely on this order.
pub const NEIGHBORS_6: [Int3; 6] = [
    Int3 { x: 1, y: 0, z: 0 },
    Int3 { x: -1, y: 0, z: 0 },
    Int3 { x: 0, y: 1, z: 0 },
    Int3 { x: 0, y: -1, z: 0 },
    Int3 { x: 0, y: 0, z: 1 },
    Int3 { x: 0, y: 0, z: -1 },
];
