/// Level loader: JSON schema, validation, and the canonical level hash.
///
/// ## Sources
///
/// A level is a single JSON document. Loading is strict: every numeric
/// value in the document must be an integer (a float anywhere is an error),
/// unknown enumerated names are errors, and all voxel positions must be in
/// bounds. A loader error means no simulation is ever constructed.
///
/// ## Level hash
///
/// SHA-256 over a canonical serialization of the document: UTF-8, object
/// keys sorted lexicographically, integers only, no insignificant
/// whitespace. Replays pin this hash, so whitespace and key-order variants
/// of the same level verify as identical.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::domain::int3::{GravityDirection, Int3};
use crate::domain::piece::RotationAxis;
use crate::domain::voxel::{DrainSpec, Material, Scope, Voxel, VoxelKind};
use crate::sim::bag::{BagConfig, PieceSpec, WeightedEntry};
use crate::sim::hazard::{WindConfig, WindDirection, WindMode};
use crate::sim::objective::{Constraints, Objective};

pub const SCHEMA_VERSION: i64 = 1;

#[derive(Error, Debug)]
pub enum LevelError {
    #[error("failed to read level: {0}")]
    Io(#[from] std::io::Error),
    #[error("level is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("non-integer number at {0}")]
    NonInteger(String),
    #[error("unsupported schema version {0}")]
    SchemaVersion(i64),
    #[error("bounds must be positive on every axis, got {0:?}")]
    Bounds(Int3),
    #[error("initial voxel out of bounds at {0:?}")]
    VoxelOutOfBounds(Int3),
    #[error("duplicate initial voxel at {0:?}")]
    DuplicateVoxel(Int3),
    #[error("unknown voxel type {0:?}")]
    UnknownVoxelKind(String),
    #[error("unknown material {0:?}")]
    UnknownMaterial(String),
    #[error("unknown scope {0:?}")]
    UnknownScope(String),
    #[error("unknown gravity direction {0:?}")]
    UnknownDirection(String),
    #[error("unknown piece {0:?} in bag")]
    UnknownPiece(String),
    #[error("unknown objective type {0:?}")]
    UnknownObjective(String),
    #[error("unknown hazard type {0:?}")]
    UnknownHazard(String),
    #[error("{0}")]
    Invalid(String),
}

// ── Validated level ──

/// Immutable level configuration, fully validated. The simulation trusts
/// every field.
#[derive(Clone, Debug)]
pub struct Level {
    pub id: String,
    pub title: String,
    pub schema_version: i64,
    pub seed: i64,
    pub bounds: Int3,
    pub initial: Vec<(Int3, Voxel)>,
    pub objectives: Vec<Objective>,
    pub rotation: RotationConfig,
    pub bag: BagConfig,
    pub hazards: Vec<WindConfig>,
    pub abilities: AbilitiesConfig,
    pub constraints: Constraints,
}

#[derive(Clone, Debug)]
pub struct RotationConfig {
    /// `None` = unlimited tilts.
    pub tilt_budget: Option<i64>,
    pub cooldown_ticks: u64,
    pub allowed_directions: Vec<GravityDirection>,
    pub allowed_piece_axes: Vec<RotationAxis>,
}

impl Default for RotationConfig {
    fn default() -> Self {
        RotationConfig {
            tilt_budget: None,
            cooldown_ticks: 0,
            allowed_directions: GravityDirection::ALL.to_vec(),
            allowed_piece_axes: vec![RotationAxis::Yaw],
        }
    }
}

#[derive(Clone, Debug)]
pub struct AbilitiesConfig {
    pub hold_enabled: bool,
    pub stabilize_charges: i64,
    pub freeze_charges: i64,
    pub freeze_scope: Scope,
    pub freeze_duration_resolves: i64,
    pub drain_placement_charges: i64,
    pub drain_placement: DrainSpec,
    /// Successful world rotations before a stabilize anchor decays.
    pub stabilize_anchor_rotations: i64,
}

impl Default for AbilitiesConfig {
    fn default() -> Self {
        AbilitiesConfig {
            hold_enabled: false,
            stabilize_charges: 0,
            freeze_charges: 0,
            freeze_scope: Scope::Adj6,
            freeze_duration_resolves: 2,
            drain_placement_charges: 0,
            drain_placement: DrainSpec {
                rate: 1,
                scope: Scope::Adj6,
            },
            stabilize_anchor_rotations: 2,
        }
    }
}

// ── JSON schema (serde side) ──

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct LevelDoc {
    meta: MetaDoc,
    bounds: BoundsDoc,
    #[serde(default)]
    initial_voxels: Vec<VoxelDoc>,
    #[serde(default)]
    objectives: Vec<ObjectiveDoc>,
    rotation: Option<RotationDoc>,
    bag: BagDoc,
    #[serde(default)]
    hazards: Vec<HazardDoc>,
    abilities: Option<AbilitiesDoc>,
    constraints: Option<ConstraintsDoc>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct MetaDoc {
    id: String,
    title: String,
    schema_version: i64,
    seed: i64,
}

#[derive(Deserialize, Debug)]
struct BoundsDoc {
    x: i64,
    y: i64,
    z: i64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct VoxelDoc {
    pos: [i64; 3],
    #[serde(rename = "type")]
    kind: String,
    material_id: Option<String>,
    anchored: Option<bool>,
    drain: Option<DrainDoc>,
}

#[derive(Deserialize, Debug)]
struct DrainDoc {
    rate: i64,
    scope: String,
}

#[derive(Deserialize, Debug)]
struct ObjectiveDoc {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    params: serde_json::Map<String, Value>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RotationDoc {
    max_rotations: Option<i64>,
    tilt_budget: Option<i64>,
    cooldown_ticks: Option<i64>,
    allowed_directions: Option<Vec<String>>,
    allowed_piece_rotation_axes: Option<Vec<String>>,
}

#[derive(Deserialize, Debug)]
struct BagDoc {
    #[serde(rename = "type")]
    kind: String,
    sequence: Option<Vec<String>>,
    weights: Option<BTreeMap<String, i64>>,
}

#[derive(Deserialize, Debug)]
struct HazardDoc {
    #[serde(rename = "type")]
    kind: String,
    enabled: Option<bool>,
    #[serde(default)]
    params: serde_json::Map<String, Value>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct AbilitiesDoc {
    hold_enabled: Option<bool>,
    stabilize_charges: Option<i64>,
    freeze_charges: Option<i64>,
    freeze_scope: Option<String>,
    freeze_duration_resolves: Option<i64>,
    drain_placement_charges: Option<i64>,
    drain_placement: Option<DrainDoc>,
    stabilize_anchor_rotations: Option<i64>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ConstraintsDoc {
    max_world_height: Option<i64>,
    max_mass: Option<i64>,
    water_forbidden_world_height_min: Option<i64>,
    no_resting_on_water: Option<bool>,
}

// ── Loading ──

/// Parse and validate a level document. Returns the level together with its
/// canonical hash (the hash replays pin).
pub fn parse_level(text: &str) -> Result<(Level, String), LevelError> {
    let value: Value = serde_json::from_str(text)?;
    let hash = level_hash(&value)?;
    let doc: LevelDoc = serde_json::from_value(value)?;
    let level = build_level(doc)?;
    Ok((level, hash))
}

pub fn load_level(path: &Path) -> Result<(Level, String), LevelError> {
    let text = std::fs::read_to_string(path)?;
    parse_level(&text)
}

fn build_level(doc: LevelDoc) -> Result<Level, LevelError> {
    if doc.meta.schema_version != SCHEMA_VERSION {
        return Err(LevelError::SchemaVersion(doc.meta.schema_version));
    }

    let bounds = Int3::new(doc.bounds.x as i32, doc.bounds.y as i32, doc.bounds.z as i32);
    if doc.bounds.x < 1 || doc.bounds.y < 1 || doc.bounds.z < 1 {
        return Err(LevelError::Bounds(bounds));
    }

    let mut initial: Vec<(Int3, Voxel)> = Vec::with_capacity(doc.initial_voxels.len());
    for v in &doc.initial_voxels {
        let pos = Int3::new(v.pos[0] as i32, v.pos[1] as i32, v.pos[2] as i32);
        if v.pos.iter().any(|&p| p < 0)
            || pos.x >= bounds.x
            || pos.y >= bounds.y
            || pos.z >= bounds.z
        {
            return Err(LevelError::VoxelOutOfBounds(pos));
        }
        if initial.iter().any(|(p, _)| *p == pos) {
            return Err(LevelError::DuplicateVoxel(pos));
        }
        initial.push((pos, parse_voxel(v)?));
    }

    let objectives = doc
        .objectives
        .iter()
        .map(parse_objective)
        .collect::<Result<Vec<_>, _>>()?;

    let rotation = parse_rotation(doc.rotation)?;
    let bag = parse_bag(&doc.bag)?;
    let hazards = doc
        .hazards
        .iter()
        .map(parse_hazard)
        .collect::<Result<Vec<_>, _>>()?;
    let abilities = parse_abilities(doc.abilities)?;
    let constraints = parse_constraints(doc.constraints);

    Ok(Level {
        id: doc.meta.id,
        title: doc.meta.title,
        schema_version: doc.meta.schema_version,
        seed: doc.meta.seed,
        bounds,
        initial,
        objectives,
        rotation,
        bag,
        hazards,
        abilities,
        constraints,
    })
}

fn parse_voxel(doc: &VoxelDoc) -> Result<Voxel, LevelError> {
    let kind = match doc.kind.as_str() {
        "empty" => VoxelKind::Empty,
        "solid" => VoxelKind::Solid,
        "wall" => VoxelKind::Wall,
        "bedrock" => VoxelKind::Bedrock,
        "water" => VoxelKind::Water,
        "ice" => VoxelKind::Ice,
        "porous" => VoxelKind::Porous,
        "drain" => VoxelKind::Drain,
        other => return Err(LevelError::UnknownVoxelKind(other.to_string())),
    };

    let material = match &doc.material_id {
        Some(name) => {
            if kind != VoxelKind::Solid {
                return Err(LevelError::Invalid(format!(
                    "materialId on a non-solid voxel ({})",
                    doc.kind
                )));
            }
            Some(
                Material::from_name(name)
                    .ok_or_else(|| LevelError::UnknownMaterial(name.clone()))?,
            )
        }
        None => None,
    };

    let drain = match (&doc.drain, kind) {
        (Some(d), VoxelKind::Drain) => Some(parse_drain(d)?),
        (Some(_), _) => {
            return Err(LevelError::Invalid(format!(
                "drain config on a non-drain voxel ({})",
                doc.kind
            )))
        }
        (None, VoxelKind::Drain) => Some(AbilitiesConfig::default().drain_placement),
        (None, _) => None,
    };

    Ok(Voxel {
        kind,
        material,
        anchored: doc.anchored.unwrap_or(false),
        drain,
    })
}

fn parse_drain(doc: &DrainDoc) -> Result<DrainSpec, LevelError> {
    if doc.rate < 0 {
        return Err(LevelError::Invalid(format!(
            "drain rate must be non-negative, got {}",
            doc.rate
        )));
    }
    Ok(DrainSpec {
        rate: doc.rate as i32,
        scope: Scope::from_name(&doc.scope)
            .ok_or_else(|| LevelError::UnknownScope(doc.scope.clone()))?,
    })
}

fn parse_objective(doc: &ObjectiveDoc) -> Result<Objective, LevelError> {
    let p = &doc.params;
    match doc.kind.as_str() {
        "drainWater" => Ok(Objective::DrainWater {
            target: req_int(p, "target", &doc.kind)?,
        }),
        "reachHeight" => Ok(Objective::ReachHeight {
            height: req_int(p, "height", &doc.kind)?,
        }),
        "buildPlateau" => Ok(Objective::BuildPlateau {
            area: req_int(p, "area", &doc.kind)?,
            world_level: req_int(p, "worldLevel", &doc.kind)?,
        }),
        "stayUnderWeight" => Ok(Objective::StayUnderWeight {
            max_mass: req_int(p, "maxMass", &doc.kind)?,
        }),
        "surviveRotations" => Ok(Objective::SurviveRotations {
            count: req_int(p, "count", &doc.kind)?,
        }),
        other => Err(LevelError::UnknownObjective(other.to_string())),
    }
}

fn parse_rotation(doc: Option<RotationDoc>) -> Result<RotationConfig, LevelError> {
    let Some(doc) = doc else {
        return Ok(RotationConfig::default());
    };

    // `maxRotations` is the legacy spelling of `tiltBudget`.
    let tilt_budget = match (doc.tilt_budget, doc.max_rotations) {
        (Some(a), Some(b)) if a != b => {
            return Err(LevelError::Invalid(format!(
                "tiltBudget ({a}) conflicts with maxRotations ({b})"
            )))
        }
        (Some(a), _) => Some(a),
        (None, b) => b,
    };
    if tilt_budget.is_some_and(|b| b < 0) {
        return Err(LevelError::Invalid("tiltBudget must be non-negative".into()));
    }

    let cooldown = doc.cooldown_ticks.unwrap_or(0);
    if cooldown < 0 {
        return Err(LevelError::Invalid("cooldownTicks must be non-negative".into()));
    }

    let allowed_directions = match doc.allowed_directions {
        None => GravityDirection::ALL.to_vec(),
        Some(names) => {
            if names.is_empty() {
                return Err(LevelError::Invalid("allowedDirections is empty".into()));
            }
            names
                .iter()
                .map(|n| {
                    GravityDirection::from_name(n)
                        .ok_or_else(|| LevelError::UnknownDirection(n.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let allowed_piece_axes = match doc.allowed_piece_rotation_axes {
        None => vec![RotationAxis::Yaw],
        Some(names) => names
            .iter()
            .map(|n| {
                RotationAxis::from_name(n)
                    .ok_or_else(|| LevelError::Invalid(format!("unknown rotation axis {n:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(RotationConfig {
        tilt_budget,
        cooldown_ticks: cooldown as u64,
        allowed_directions,
        allowed_piece_axes,
    })
}

fn parse_bag(doc: &BagDoc) -> Result<BagConfig, LevelError> {
    match doc.kind.as_str() {
        "sequence" => {
            let names = doc
                .sequence
                .as_ref()
                .ok_or_else(|| LevelError::Invalid("sequence bag without sequence".into()))?;
            if names.is_empty() {
                return Err(LevelError::Invalid("bag sequence is empty".into()));
            }
            let seq = names
                .iter()
                .map(|n| PieceSpec::parse(n).ok_or_else(|| LevelError::UnknownPiece(n.clone())))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(BagConfig::Sequence(seq))
        }
        "weighted" => {
            let weights = doc
                .weights
                .as_ref()
                .ok_or_else(|| LevelError::Invalid("weighted bag without weights".into()))?;
            if weights.is_empty() {
                return Err(LevelError::Invalid("bag weights are empty".into()));
            }
            // BTreeMap iteration gives the pinned lexicographic key order.
            let entries = weights
                .iter()
                .map(|(key, &weight)| {
                    if weight <= 0 {
                        return Err(LevelError::Invalid(format!(
                            "bag weight for {key:?} must be positive"
                        )));
                    }
                    let spec = PieceSpec::parse(key)
                        .ok_or_else(|| LevelError::UnknownPiece(key.clone()))?;
                    Ok(WeightedEntry {
                        key: key.clone(),
                        spec,
                        weight,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(BagConfig::Weighted(entries))
        }
        other => Err(LevelError::Invalid(format!("unknown bag type {other:?}"))),
    }
}

fn parse_hazard(doc: &HazardDoc) -> Result<WindConfig, LevelError> {
    if doc.kind != "wind" {
        return Err(LevelError::UnknownHazard(doc.kind.clone()));
    }
    let p = &doc.params;

    let interval = req_int(p, "intervalTicks", "wind")?;
    if interval < 1 {
        return Err(LevelError::Invalid("wind intervalTicks must be >= 1".into()));
    }
    let push_strength = req_int(p, "pushStrength", "wind")?;
    if push_strength < 0 {
        return Err(LevelError::Invalid("wind pushStrength must be non-negative".into()));
    }

    let mode = match opt_str(p, "direction")?.unwrap_or("ALTERNATE_EW") {
        "ALTERNATE_EW" => WindMode::AlternateEw,
        "FIXED" => WindMode::Fixed,
        "RANDOM_SEEDED" => WindMode::RandomSeeded,
        other => {
            return Err(LevelError::Invalid(format!(
                "unknown wind direction mode {other:?}"
            )))
        }
    };

    let fixed_direction = match opt_str(p, "fixedDirection")? {
        Some(name) => WindDirection::from_name(name)
            .ok_or_else(|| LevelError::Invalid(format!("unknown wind direction {name:?}")))?,
        None => WindDirection::East,
    };

    let random_directions = match p.get("randomDirections") {
        None => vec![WindDirection::East, WindDirection::West],
        Some(Value::Array(items)) => {
            let dirs = items
                .iter()
                .map(|v| {
                    v.as_str().and_then(WindDirection::from_name).ok_or_else(|| {
                        LevelError::Invalid(format!("bad randomDirections entry {v}"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if dirs.is_empty() {
                return Err(LevelError::Invalid("randomDirections is empty".into()));
            }
            dirs
        }
        Some(other) => {
            return Err(LevelError::Invalid(format!(
                "randomDirections must be an array, got {other}"
            )))
        }
    };

    let first_gust_offset = match opt_int(p, "firstGustOffsetTicks")? {
        Some(o) if o < 0 => {
            return Err(LevelError::Invalid(
                "firstGustOffsetTicks must be non-negative".into(),
            ))
        }
        Some(o) => Some(o as u64),
        None => None,
    };

    Ok(WindConfig {
        enabled: doc.enabled.unwrap_or(true),
        interval_ticks: interval as u64,
        push_strength,
        first_gust_offset,
        mode,
        fixed_direction,
        random_directions,
    })
}

fn parse_abilities(doc: Option<AbilitiesDoc>) -> Result<AbilitiesConfig, LevelError> {
    let defaults = AbilitiesConfig::default();
    let Some(doc) = doc else {
        return Ok(defaults);
    };
    let freeze_scope = match doc.freeze_scope {
        Some(name) => Scope::from_name(&name).ok_or(LevelError::UnknownScope(name))?,
        None => defaults.freeze_scope,
    };
    let drain_placement = match &doc.drain_placement {
        Some(d) => parse_drain(d)?,
        None => defaults.drain_placement,
    };
    let cfg = AbilitiesConfig {
        hold_enabled: doc.hold_enabled.unwrap_or(defaults.hold_enabled),
        stabilize_charges: doc.stabilize_charges.unwrap_or(defaults.stabilize_charges),
        freeze_charges: doc.freeze_charges.unwrap_or(defaults.freeze_charges),
        freeze_scope,
        freeze_duration_resolves: doc
            .freeze_duration_resolves
            .unwrap_or(defaults.freeze_duration_resolves),
        drain_placement_charges: doc
            .drain_placement_charges
            .unwrap_or(defaults.drain_placement_charges),
        drain_placement,
        stabilize_anchor_rotations: doc
            .stabilize_anchor_rotations
            .unwrap_or(defaults.stabilize_anchor_rotations),
    };
    for (name, v) in [
        ("stabilizeCharges", cfg.stabilize_charges),
        ("freezeCharges", cfg.freeze_charges),
        ("freezeDurationResolves", cfg.freeze_duration_resolves),
        ("drainPlacementCharges", cfg.drain_placement_charges),
        ("stabilizeAnchorRotations", cfg.stabilize_anchor_rotations),
    ] {
        if v < 0 {
            return Err(LevelError::Invalid(format!("{name} must be non-negative")));
        }
    }
    Ok(cfg)
}

fn parse_constraints(doc: Option<ConstraintsDoc>) -> Constraints {
    let Some(doc) = doc else {
        return Constraints::default();
    };
    Constraints {
        max_world_height: doc.max_world_height,
        max_mass: doc.max_mass,
        water_forbidden_min: doc.water_forbidden_world_height_min,
        no_resting_on_water: doc.no_resting_on_water.unwrap_or(false),
    }
}

// ── Param helpers ──

fn req_int(
    params: &serde_json::Map<String, Value>,
    key: &str,
    owner: &str,
) -> Result<i64, LevelError> {
    opt_int(params, key)?
        .ok_or_else(|| LevelError::Invalid(format!("{owner} is missing integer param {key:?}")))
}

fn opt_int(params: &serde_json::Map<String, Value>, key: &str) -> Result<Option<i64>, LevelError> {
    match params.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| LevelError::NonInteger(format!("params.{key}"))),
    }
}

fn opt_str<'a>(
    params: &'a serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<&'a str>, LevelError> {
    match params.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(LevelError::Invalid(format!(
            "param {key:?} must be a string, got {other}"
        ))),
    }
}

// ── Canonical JSON & level hash ──

/// SHA-256 (lowercase hex) of the canonical serialization of `value`.
pub fn level_hash(value: &Value) -> Result<String, LevelError> {
    let mut bytes = Vec::new();
    write_canonical(value, &mut bytes, "$")?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Canonical JSON: sorted object keys, integer numbers only, no
/// insignificant whitespace. Written by hand so the byte stream can never
/// drift with a serializer's formatting choices.
fn write_canonical(value: &Value, out: &mut Vec<u8>, path: &str) -> Result<(), LevelError> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => {
            let Some(i) = n.as_i64() else {
                return Err(LevelError::NonInteger(path.to_string()));
            };
            out.extend_from_slice(i.to_string().as_bytes());
        }
        Value::String(s) => {
            // serde_json's scalar string encoding is stable JSON escaping.
            out.extend_from_slice(json_string(s).as_bytes());
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out, &format!("{path}[{i}]"))?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                out.extend_from_slice(json_string(key).as_bytes());
                out.push(b':');
                write_canonical(&map[*key], out, &format!("{path}.{key}"))?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| unreachable!("string encoding cannot fail"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_level_json() -> String {
        r#"{
            "meta": {"id": "t-01", "title": "Test", "schemaVersion": 1, "seed": 7},
            "bounds": {"x": 4, "y": 4, "z": 4},
            "initialVoxels": [
                {"pos": [0, 0, 0], "type": "bedrock"},
                {"pos": [1, 0, 0], "type": "water"},
                {"pos": [2, 0, 0], "type": "drain", "drain": {"rate": 2, "scope": "adj6"}},
                {"pos": [3, 0, 0], "type": "solid", "materialId": "heavy"}
            ],
            "objectives": [{"type": "drainWater", "params": {"target": 3}}],
            "rotation": {"tiltBudget": 2, "cooldownTicks": 10, "allowedDirections": ["down", "north"]},
            "bag": {"type": "sequence", "sequence": ["I4", "O2", "L3"]},
            "hazards": [{"type": "wind", "enabled": true, "params": {"intervalTicks": 2, "pushStrength": 1, "direction": "ALTERNATE_EW", "firstGustOffsetTicks": 0}}],
            "abilities": {"holdEnabled": true, "freezeCharges": 1, "freezeScope": "adj6", "freezeDurationResolves": 2},
            "constraints": {"maxWorldHeight": 3, "noRestingOnWater": true}
        }"#
        .to_string()
    }

    #[test]
    fn parses_a_complete_level() {
        let (level, hash) = parse_level(&minimal_level_json()).unwrap();
        assert_eq!(level.id, "t-01");
        assert_eq!(level.seed, 7);
        assert_eq!(level.bounds, Int3::new(4, 4, 4));
        assert_eq!(level.initial.len(), 4);
        assert_eq!(level.objectives.len(), 1);
        assert_eq!(level.rotation.tilt_budget, Some(2));
        assert_eq!(level.rotation.allowed_directions.len(), 2);
        assert!(level.abilities.hold_enabled);
        assert_eq!(level.constraints.max_world_height, Some(3));
        assert_eq!(hash.len(), 64);
        let drain = level
            .initial
            .iter()
            .find(|(p, _)| *p == Int3::new(2, 0, 0))
            .unwrap()
            .1;
        assert_eq!(
            drain.drain,
            Some(DrainSpec {
                rate: 2,
                scope: Scope::Adj6
            })
        );
    }

    #[test]
    fn floats_are_rejected() {
        let json = minimal_level_json().replace("\"seed\": 7", "\"seed\": 7.5");
        match parse_level(&json) {
            Err(LevelError::NonInteger(path)) => assert!(path.contains("seed"), "{path}"),
            other => panic!("expected NonInteger, got {other:?}"),
        }
    }

    #[test]
    fn hash_ignores_whitespace_and_key_order() {
        let a = r#"{"meta": {"id": "x", "seed": 1}, "bounds": {"x": 1, "y": 2, "z": 3}}"#;
        let b = r#"{"bounds":{"z":3,"y":2,"x":1},"meta":{"seed":1,"id":"x"}}"#;
        let ha = level_hash(&serde_json::from_str(a).unwrap()).unwrap();
        let hb = level_hash(&serde_json::from_str(b).unwrap()).unwrap();
        assert_eq!(ha, hb);
    }

    #[test]
    fn hash_distinguishes_values() {
        let a = r#"{"seed": 1}"#;
        let b = r#"{"seed": 2}"#;
        let ha = level_hash(&serde_json::from_str(a).unwrap()).unwrap();
        let hb = level_hash(&serde_json::from_str(b).unwrap()).unwrap();
        assert_ne!(ha, hb);
    }

    #[test]
    fn voxel_out_of_bounds_is_an_error() {
        let json = minimal_level_json().replace("[3, 0, 0]", "[4, 0, 0]");
        assert!(matches!(
            parse_level(&json),
            Err(LevelError::VoxelOutOfBounds(_))
        ));
    }

    #[test]
    fn duplicate_voxel_is_an_error() {
        let json = minimal_level_json().replace("[1, 0, 0]", "[0, 0, 0]");
        assert!(matches!(
            parse_level(&json),
            Err(LevelError::DuplicateVoxel(_))
        ));
    }

    #[test]
    fn unknown_piece_in_bag_is_an_error() {
        let json = minimal_level_json().replace("\"I4\"", "\"I9\"");
        assert!(matches!(parse_level(&json), Err(LevelError::UnknownPiece(_))));
    }

    #[test]
    fn conflicting_tilt_budget_alias_is_an_error() {
        let json = minimal_level_json()
            .replace("\"tiltBudget\": 2", "\"tiltBudget\": 2, \"maxRotations\": 3");
        assert!(matches!(parse_level(&json), Err(LevelError::Invalid(_))));
    }

    #[test]
    fn max_rotations_alias_is_accepted() {
        let json = minimal_level_json().replace("\"tiltBudget\": 2", "\"maxRotations\": 5");
        let (level, _) = parse_level(&json).unwrap();
        assert_eq!(level.rotation.tilt_budget, Some(5));
    }

    #[test]
    fn weighted_bag_requires_positive_weights() {
        let json = minimal_level_json().replace(
            r#""bag": {"type": "sequence", "sequence": ["I4", "O2", "L3"]}"#,
            r#""bag": {"type": "weighted", "weights": {"I4": 0}}"#,
        );
        assert!(matches!(parse_level(&json), Err(LevelError::Invalid(_))));
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let json = r#"{
            "meta": {"id": "d", "title": "Defaults", "schemaVersion": 1, "seed": 0},
            "bounds": {"x": 2, "y": 2, "z": 2},
            "bag": {"type": "sequence", "sequence": ["I2"]}
        }"#;
        let (level, _) = parse_level(json).unwrap();
        assert_eq!(level.rotation.tilt_budget, None);
        assert_eq!(level.rotation.allowed_directions.len(), 5);
        assert_eq!(level.rotation.allowed_piece_axes, vec![RotationAxis::Yaw]);
        assert!(!level.abilities.hold_enabled);
        assert_eq!(level.constraints, Constraints::default());
        assert!(level.hazards.is_empty());
    }
}
