/// Active-piece control: translations, kicked rotations, drops, hold, and
/// ability arming. Pure "what is legal" checks live here; the resolve
/// pipeline handles what happens after a lock commits.
///
/// ## Lock delay
///
/// A piece is *grounded* when it cannot advance one cell along gravity.
/// The first grounded tick starts a 12-tick delay budget, decremented each
/// grounded tick by the gravity step. A successful move or rotation that
/// restores the ability to advance resets the budget, at most 4 times per
/// drop; after that the delay runs out wherever it stands. HardDrop
/// bypasses the delay entirely.

use crate::domain::int3::Int3;
use crate::domain::piece::{ActivePiece, PieceRotation, KICKS};
use crate::sim::bag::PieceSpec;
use crate::sim::event::SimEvent;
use crate::sim::rotation::{self, TiltDirection};
use crate::sim::world::{SimulationState, LOCK_DELAY_TICKS, LOCK_RESET_LIMIT};

/// The full per-tick input vocabulary. Replays serialize these by the
/// stable names in `name()`; the `inputEncoding` header tag pins that
/// vocabulary.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    None,
    MoveLeft,
    MoveRight,
    MoveForward,
    MoveBack,
    SoftDrop,
    HardDrop,
    RotatePiece(PieceRotation),
    RotateWorld(TiltDirection),
    Hold,
    FreezeAbility,
    DrainPlacementAbility,
    StabilizeAbility,
}

impl Command {
    pub const ALL: [Command; 21] = [
        Command::None,
        Command::MoveLeft,
        Command::MoveRight,
        Command::MoveForward,
        Command::MoveBack,
        Command::SoftDrop,
        Command::HardDrop,
        Command::RotatePiece(PieceRotation::YawCw),
        Command::RotatePiece(PieceRotation::YawCcw),
        Command::RotatePiece(PieceRotation::PitchCw),
        Command::RotatePiece(PieceRotation::PitchCcw),
        Command::RotatePiece(PieceRotation::RollCw),
        Command::RotatePiece(PieceRotation::RollCcw),
        Command::RotateWorld(TiltDirection::Forward),
        Command::RotateWorld(TiltDirection::Back),
        Command::RotateWorld(TiltDirection::Left),
        Command::RotateWorld(TiltDirection::Right),
        Command::Hold,
        Command::FreezeAbility,
        Command::DrainPlacementAbility,
        Command::StabilizeAbility,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Command::None => "None",
            Command::MoveLeft => "MoveLeft",
            Command::MoveRight => "MoveRight",
            Command::MoveForward => "MoveForward",
            Command::MoveBack => "MoveBack",
            Command::SoftDrop => "SoftDrop",
            Command::HardDrop => "HardDrop",
            Command::RotatePiece(PieceRotation::YawCw) => "RotatePieceYawCW",
            Command::RotatePiece(PieceRotation::YawCcw) => "RotatePieceYawCCW",
            Command::RotatePiece(PieceRotation::PitchCw) => "RotatePiecePitchCW",
            Command::RotatePiece(PieceRotation::PitchCcw) => "RotatePiecePitchCCW",
            Command::RotatePiece(PieceRotation::RollCw) => "RotatePieceRollCW",
            Command::RotatePiece(PieceRotation::RollCcw) => "RotatePieceRollCCW",
            Command::RotateWorld(TiltDirection::Forward) => "RotateWorldForward",
            Command::RotateWorld(TiltDirection::Back) => "RotateWorldBack",
            Command::RotateWorld(TiltDirection::Left) => "RotateWorldLeft",
            Command::RotateWorld(TiltDirection::Right) => "RotateWorldRight",
            Command::Hold => "Hold",
            Command::FreezeAbility => "FreezeAbility",
            Command::DrainPlacementAbility => "DrainPlacementAbility",
            Command::StabilizeAbility => "StabilizeAbility",
        }
    }

    pub fn from_name(s: &str) -> Option<Command> {
        Command::ALL.iter().copied().find(|c| c.name() == s)
    }
}

/// What a command did. Rejected inputs are normal play, not errors.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct InputApplyResult {
    pub accepted: bool,
    pub moved: bool,
    pub lock_requested: bool,
}

impl InputApplyResult {
    fn rejected() -> Self {
        InputApplyResult::default()
    }

    fn accepted(moved: bool) -> Self {
        InputApplyResult {
            accepted: true,
            moved,
            lock_requested: false,
        }
    }
}

// ── Placement ──

/// Every cell of the piece must be in bounds and Empty or Water. Any other
/// occupancy rejects atomically; partial moves never happen.
pub fn placement_valid(state: &SimulationState, piece: &ActivePiece) -> bool {
    piece
        .cells()
        .all(|c| state.grid.try_get(c).is_some_and(|v| v.piece_passable()))
}

fn can_advance(state: &SimulationState, piece: &ActivePiece) -> bool {
    let mut probe = *piece;
    probe.origin = probe.origin + state.gravity.vector();
    placement_valid(state, &probe)
}

// ── Command dispatch ──

pub fn apply_command(
    state: &mut SimulationState,
    cmd: Command,
    events: &mut Vec<SimEvent>,
) -> InputApplyResult {
    match cmd {
        Command::None => InputApplyResult::accepted(false),
        Command::MoveLeft => translate(state, Int3::new(-1, 0, 0)),
        Command::MoveRight => translate(state, Int3::new(1, 0, 0)),
        Command::MoveForward => translate(state, Int3::new(0, 0, 1)),
        Command::MoveBack => translate(state, Int3::new(0, 0, -1)),
        Command::SoftDrop => translate(state, state.gravity.vector()),
        Command::HardDrop => hard_drop(state),
        Command::RotatePiece(r) => rotate_piece(state, r),
        Command::RotateWorld(t) => {
            if rotation::apply_tilt(state, t, events) {
                InputApplyResult::accepted(false)
            } else {
                InputApplyResult::rejected()
            }
        }
        Command::Hold => hold(state, events),
        Command::FreezeAbility => arm_ability(state, Ability::Freeze),
        Command::DrainPlacementAbility => arm_ability(state, Ability::DrainPlacement),
        Command::StabilizeAbility => arm_ability(state, Ability::Stabilize),
    }
}

fn translate(state: &mut SimulationState, delta: Int3) -> InputApplyResult {
    let Some(piece) = state.active else {
        return InputApplyResult::rejected();
    };
    let mut target = piece;
    target.origin = piece.origin + delta;
    if !placement_valid(state, &target) {
        return InputApplyResult::rejected();
    }
    state.active = Some(target);
    refresh_grounding(state);
    InputApplyResult::accepted(true)
}

fn hard_drop(state: &mut SimulationState) -> InputApplyResult {
    let Some(piece) = state.active else {
        return InputApplyResult::rejected();
    };
    let g = state.gravity.vector();
    let mut dropped = piece;
    loop {
        let mut probe = dropped;
        probe.origin = dropped.origin + g;
        if !placement_valid(state, &probe) {
            break;
        }
        dropped = probe;
    }
    let moved = dropped.origin != piece.origin;
    state.active = Some(dropped);
    InputApplyResult {
        accepted: true,
        moved,
        lock_requested: true,
    }
}

fn rotate_piece(state: &mut SimulationState, rot: PieceRotation) -> InputApplyResult {
    let Some(piece) = state.active else {
        return InputApplyResult::rejected();
    };
    if !state.level.rotation.allowed_piece_axes.contains(&rot.axis()) {
        return InputApplyResult::rejected();
    }
    let Some(orientation) = piece.rotated_orientation(rot.matrix()) else {
        return InputApplyResult::rejected();
    };

    for kick in KICKS {
        let mut target = piece;
        target.orientation = orientation;
        target.origin = piece.origin + kick;
        if placement_valid(state, &target) {
            state.active = Some(target);
            refresh_grounding(state);
            return InputApplyResult::accepted(true);
        }
    }
    InputApplyResult::rejected()
}

/// An ungrounding move refunds lock delay, up to the per-drop reset cap.
fn refresh_grounding(state: &mut SimulationState) {
    let Some(piece) = state.active else { return };
    if state.lock.grounded && can_advance(state, &piece) {
        state.lock.grounded = false;
        if state.lock.resets_used < LOCK_RESET_LIMIT {
            state.lock.resets_used += 1;
            state.lock.delay_remaining = LOCK_DELAY_TICKS;
        }
    }
}

// ── Natural gravity ──

/// One gravity step per tick. Returns true when the lock delay has run out
/// and the piece must lock this tick.
pub fn gravity_step(state: &mut SimulationState) -> bool {
    let Some(piece) = state.active else {
        return false;
    };
    let g = state.gravity.vector();
    let mut advanced = piece;
    advanced.origin = piece.origin + g;
    if placement_valid(state, &advanced) {
        state.active = Some(advanced);
        state.lock.grounded = false;
        return false;
    }
    state.lock.grounded = true;
    state.lock.delay_remaining = state.lock.delay_remaining.saturating_sub(1);
    state.lock.delay_remaining == 0
}

// ── Hold ──

fn hold(state: &mut SimulationState, events: &mut Vec<SimEvent>) -> InputApplyResult {
    if !state.level.abilities.hold_enabled || state.lock.hold_used_this_drop {
        return InputApplyResult::rejected();
    }
    let Some(active) = state.active else {
        return InputApplyResult::rejected();
    };

    let outgoing = PieceSpec {
        kind: active.kind,
        material: active.material,
    };
    let incoming = state.hold.take();
    state.active = None;

    // Swapped-in pieces respawn at orientation 0; the outgoing piece's
    // armed flags die with the swap (charges stay consumed).
    match incoming {
        Some(spec) => state.spawn_piece(spec, events),
        None => state.spawn_from_bag(events),
    }
    state.hold = Some(outgoing);
    state.lock.hold_used_this_drop = true;

    if let Some(now_active) = &state.active {
        events.push(SimEvent::PieceHeld {
            stored: outgoing.kind,
            active: now_active.kind,
        });
    }
    InputApplyResult::accepted(true)
}

// ── Abilities ──

enum Ability {
    Freeze,
    DrainPlacement,
    Stabilize,
}

/// Arm on input, apply on lock. Arming consumes the charge immediately;
/// disarming does not refund it. Arming with no charge left is accepted
/// and does nothing.
fn arm_ability(state: &mut SimulationState, ability: Ability) -> InputApplyResult {
    if state.active.is_none() {
        return InputApplyResult::rejected();
    }
    let (flag, charges) = match ability {
        Ability::Freeze => (&mut state.lock.freeze_armed, &mut state.charges.freeze),
        Ability::DrainPlacement => (
            &mut state.lock.drain_placement_armed,
            &mut state.charges.drain_placement,
        ),
        Ability::Stabilize => (&mut state.lock.stabilize_armed, &mut state.charges.stabilize),
    };
    if *flag {
        *flag = false;
    } else if *charges > 0 {
        *charges -= 1;
        *flag = true;
    }
    InputApplyResult::accepted(false)
}
