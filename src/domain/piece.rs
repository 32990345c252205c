/// Polycube pieces, their orientation sets, and the rotation kick table.
///
/// Each piece is a closed list of voxel offsets around a pivot at (0,0,0).
/// The orientation set is every distinct image of the offset list under the
/// 24 proper cube rotations, generated once at first use and cached for the
/// process lifetime. Orientation index 0 is always the identity image, which
/// is what a freshly spawned (or hold-reset) piece uses.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::int3::{Int3, Rot3};
use super::voxel::Material;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PieceKind {
    I2,
    I3,
    I4,
    O2,
    L3,
    L4,
    T4,
    S4,
    Z4,
    C8,
}

impl PieceKind {
    pub const ALL: [PieceKind; 10] = [
        PieceKind::I2,
        PieceKind::I3,
        PieceKind::I4,
        PieceKind::O2,
        PieceKind::L3,
        PieceKind::L4,
        PieceKind::T4,
        PieceKind::S4,
        PieceKind::Z4,
        PieceKind::C8,
    ];

    /// Base offsets, pivot at (0,0,0). Flat pieces lie in the XZ plane.
    pub fn base_offsets(self) -> &'static [Int3] {
        match self {
            PieceKind::I2 => &[Int3 { x: 0, y: 0, z: 0 }, Int3 { x: 1, y: 0, z: 0 }],
            PieceKind::I3 => &[Int3 { x: 0, y: 0, z: 0 }, Int3 { x: 1, y: 0, z: 0 }, Int3 { x: 2, y: 0, z: 0 }],
            PieceKind::I4 => &[
                Int3 { x: 0, y: 0, z: 0 },
                Int3 { x: 1, y: 0, z: 0 },
                Int3 { x: 2, y: 0, z: 0 },
                Int3 { x: 3, y: 0, z: 0 },
            ],
            PieceKind::O2 => &[
                Int3 { x: 0, y: 0, z: 0 },
                Int3 { x: 1, y: 0, z: 0 },
                Int3 { x: 0, y: 0, z: 1 },
                Int3 { x: 1, y: 0, z: 1 },
            ],
            PieceKind::L3 => &[Int3 { x: 0, y: 0, z: 0 }, Int3 { x: 1, y: 0, z: 0 }, Int3 { x: 0, y: 0, z: 1 }],
            PieceKind::L4 => &[
                Int3 { x: 0, y: 0, z: 0 },
                Int3 { x: 1, y: 0, z: 0 },
                Int3 { x: 2, y: 0, z: 0 },
                Int3 { x: 0, y: 0, z: 1 },
            ],
            PieceKind::T4 => &[
                Int3 { x: 0, y: 0, z: 0 },
                Int3 { x: 1, y: 0, z: 0 },
                Int3 { x: 2, y: 0, z: 0 },
                Int3 { x: 1, y: 0, z: 1 },
            ],
            PieceKind::S4 => &[
                Int3 { x: 1, y: 0, z: 0 },
                Int3 { x: 2, y: 0, z: 0 },
                Int3 { x: 0, y: 0, z: 1 },
                Int3 { x: 1, y: 0, z: 1 },
            ],
            PieceKind::Z4 => &[
                Int3 { x: 0, y: 0, z: 0 },
                Int3 { x: 1, y: 0, z: 0 },
                Int3 { x: 1, y: 0, z: 1 },
                Int3 { x: 2, y: 0, z: 1 },
            ],
            PieceKind::C8 => &[
                Int3 { x: 0, y: 0, z: 0 },
                Int3 { x: 1, y: 0, z: 0 },
                Int3 { x: 0, y: 1, z: 0 },
                Int3 { x: 1, y: 1, z: 0 },
                Int3 { x: 0, y: 0, z: 1 },
                Int3 { x: 1, y: 0, z: 1 },
                Int3 { x: 0, y: 1, z: 1 },
                Int3 { x: 1, y: 1, z: 1 },
            ],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PieceKind::I2 => "I2",
            PieceKind::I3 => "I3",
            PieceKind::I4 => "I4",
            PieceKind::O2 => "O2",
            PieceKind::L3 => "L3",
            PieceKind::L4 => "L4",
            PieceKind::T4 => "T4",
            PieceKind::S4 => "S4",
            PieceKind::Z4 => "Z4",
            PieceKind::C8 => "C8",
        }
    }

    pub fn from_name(s: &str) -> Option<PieceKind> {
        PieceKind::ALL.iter().copied().find(|k| k.name() == s)
    }

    /// Stable single-byte code for the determinism hash.
    pub fn code(self) -> u8 {
        PieceKind::ALL.iter().position(|k| *k == self).unwrap_or(0) as u8
    }

    /// This piece's deduplicated orientation set. Index 0 is the identity.
    pub fn orientations(self) -> &'static [Vec<Int3>] {
        &catalog()[&self]
    }
}

// ── Piece rotation commands ──

/// Axis a level may permit for local piece rotation (default: Yaw only).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RotationAxis {
    Yaw,
    Pitch,
    Roll,
}

impl RotationAxis {
    pub fn name(self) -> &'static str {
        match self {
            RotationAxis::Yaw => "yaw",
            RotationAxis::Pitch => "pitch",
            RotationAxis::Roll => "roll",
        }
    }

    pub fn from_name(s: &str) -> Option<RotationAxis> {
        match s {
            "yaw" => Some(RotationAxis::Yaw),
            "pitch" => Some(RotationAxis::Pitch),
            "roll" => Some(RotationAxis::Roll),
            _ => None,
        }
    }
}

/// One of the six canonical 90° local rotations.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PieceRotation {
    YawCw,
    YawCcw,
    PitchCw,
    PitchCcw,
    RollCw,
    RollCcw,
}

impl PieceRotation {
    pub fn matrix(self) -> Rot3 {
        match self {
            PieceRotation::YawCw => Rot3::YAW_CW,
            PieceRotation::YawCcw => Rot3::YAW_CCW,
            PieceRotation::PitchCw => Rot3::PITCH_CW,
            PieceRotation::PitchCcw => Rot3::PITCH_CCW,
            PieceRotation::RollCw => Rot3::ROLL_CW,
            PieceRotation::RollCcw => Rot3::ROLL_CCW,
        }
    }

    pub fn axis(self) -> RotationAxis {
        match self {
            PieceRotation::YawCw | PieceRotation::YawCcw => RotationAxis::Yaw,
            PieceRotation::PitchCw | PieceRotation::PitchCcw => RotationAxis::Pitch,
            PieceRotation::RollCw | PieceRotation::RollCcw => RotationAxis::Roll,
        }
    }
}

/// Kick offsets tried, in order, when a local rotation collides.
/// The first valid placement wins; if none fits the rotation is rejected.
pub const KICKS: [Int3; 10] = [
    Int3 { x: 0, y: 0, z: 0 },
    Int3 { x: 1, y: 0, z: 0 },
    Int3 { x: -1, y: 0, z: 0 },
    Int3 { x: 0, y: 0, z: 1 },
    Int3 { x: 0, y: 0, z: -1 },
    Int3 { x: 0, y: 1, z: 0 },
    Int3 { x: 1, y: 0, z: 1 },
    Int3 { x: 1, y: 0, z: -1 },
    Int3 { x: -1, y: 0, z: 1 },
    Int3 { x: -1, y: 0, z: -1 },
];

// ── Active piece ──

/// The piece under player control: a kind, an orientation index into the
/// kind's orientation set, a world origin, and an optional material.
/// Voxels translate with the origin; they do not rotate with the world.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ActivePiece {
    pub kind: PieceKind,
    pub orientation: usize,
    pub origin: Int3,
    pub material: Option<Material>,
}

impl ActivePiece {
    pub fn offsets(&self) -> &'static [Int3] {
        &self.kind.orientations()[self.orientation]
    }

    /// World cells currently covered by the piece.
    pub fn cells(&self) -> impl Iterator<Item = Int3> + '_ {
        let origin = self.origin;
        self.offsets().iter().map(move |&off| origin + off)
    }

    /// The pivot's world cell (offset (0,0,0) translated to the origin).
    pub fn pivot_cell(&self) -> Int3 {
        self.origin
    }

    /// Orientation index of this piece's offsets after applying `m`, if the
    /// rotated set is a known orientation (it always is, for proper
    /// rotations).
    pub fn rotated_orientation(&self, m: Rot3) -> Option<usize> {
        let mut rotated: Vec<Int3> = self.offsets().iter().map(|&o| m.apply(o)).collect();
        rotated.sort();
        self.kind
            .orientations()
            .iter()
            .position(|set| *set == rotated)
    }
}

// ── Orientation catalog ──

/// All 24 proper cube rotations, identity first, in a pinned order.
fn proper_rotations() -> Vec<Rot3> {
    let mut out = vec![Rot3::IDENTITY];
    // Enumerate every {-1,0,1} 3×3 matrix and keep the orthonormal,
    // determinant-+1 ones. Runs once at startup; the order is pinned by
    // the enumeration itself.
    let vals = [-1i32, 0, 1];
    for a in vals {
        for b in vals {
            for c in vals {
                for d in vals {
                    for e in vals {
                        for f in vals {
                            for g in vals {
                                for h in vals {
                                    for i in vals {
                                        let m = Rot3 {
                                            rows: [[a, b, c], [d, e, f], [g, h, i]],
                                        };
                                        if m != Rot3::IDENTITY && is_proper_rotation(m) {
                                            out.push(m);
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
    debug_assert_eq!(out.len(), 24);
    out
}

fn is_proper_rotation(m: Rot3) -> bool {
    if m.determinant() != 1 {
        return false;
    }
    // Rows must be orthonormal unit vectors.
    let rows: Vec<Int3> = m.rows.iter().map(|r| Int3::new(r[0], r[1], r[2])).collect();
    for (i, r) in rows.iter().enumerate() {
        if r.dot(*r) != 1 {
            return false;
        }
        for other in rows.iter().skip(i + 1) {
            if r.dot(*other) != 0 {
                return false;
            }
        }
    }
    true
}

fn catalog() -> &'static HashMap<PieceKind, Vec<Vec<Int3>>> {
    static CATALOG: OnceLock<HashMap<PieceKind, Vec<Vec<Int3>>>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let rotations = proper_rotations();
        let mut map = HashMap::new();
        for kind in PieceKind::ALL {
            let mut orientations: Vec<Vec<Int3>> = Vec::new();
            for m in &rotations {
                let mut set: Vec<Int3> =
                    kind.base_offsets().iter().map(|&o| m.apply(o)).collect();
                set.sort();
                if !orientations.contains(&set) {
                    orientations.push(set);
                }
            }
            map.insert(kind, orientations);
        }
        map
    })
}
