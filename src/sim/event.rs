/// Events emitted during a simulation tick.
/// A host or presentation layer consumes these for display; they carry no
/// authority and are derived entirely from state transitions.

use crate::domain::int3::GravityDirection;
use crate::domain::piece::PieceKind;
use crate::sim::hazard::WindDirection;
use crate::sim::world::Status;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SimEvent {
    PieceSpawned { kind: PieceKind },
    PieceHeld { stored: PieceKind, active: PieceKind },
    PieceLocked { kind: PieceKind, cells: u32 },
    SolidsSettled { shifted_voxels: u64 },
    WaterDisplaced { units: u64 },
    WaterOverflowed { units: u64 },
    WaterDrained { units: u64 },
    WaterFrozen { cells: u32 },
    IceThawed { cells: u32 },
    WorldRotated { gravity: GravityDirection },
    WindGust { direction: WindDirection, pushed: u32 },
    StatusChanged { status: Status },
}
