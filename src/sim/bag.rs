/// Piece supply: deterministic draws from a fixed sequence or a weighted set.
///
/// Weighted draws consume exactly one PRNG draw each and walk the entries in
/// lexicographic key order, so the sequence is a pure function of
/// `(seed, draw index)` on every platform. `peek_next` clones the stream
/// snapshot and never advances the real one.

use crate::domain::piece::PieceKind;
use crate::domain::rng::Pcg32;
use crate::domain::voxel::Material;

/// A drawable piece: kind plus optional material override.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PieceSpec {
    pub kind: PieceKind,
    pub material: Option<Material>,
}

impl PieceSpec {
    /// Parse a bag key: `"I4"` or `"I4:heavy"`.
    pub fn parse(key: &str) -> Option<PieceSpec> {
        let (name, material) = match key.split_once(':') {
            Some((n, m)) => (n, Some(Material::from_name(m)?)),
            None => (key, None),
        };
        Some(PieceSpec {
            kind: PieceKind::from_name(name)?,
            material,
        })
    }
}

/// One weighted-bag entry, pre-validated at level load.
/// Entries are stored sorted by key; the draw walks them in that order.
#[derive(Clone, Debug)]
pub struct WeightedEntry {
    pub key: String,
    pub spec: PieceSpec,
    pub weight: i64,
}

#[derive(Clone, Debug)]
pub enum BagConfig {
    /// Fixed order, wrapping on overflow.
    Sequence(Vec<PieceSpec>),
    /// Weighted draw; one PRNG call per draw.
    Weighted(Vec<WeightedEntry>),
}

#[derive(Clone, Debug)]
pub struct Bag {
    config: BagConfig,
    cursor: u64,
}

impl Bag {
    pub fn new(config: BagConfig) -> Self {
        Bag { config, cursor: 0 }
    }

    pub fn draw(&mut self, rng: &mut Pcg32) -> PieceSpec {
        self.cursor += 1;
        match &self.config {
            BagConfig::Sequence(seq) => {
                let idx = ((self.cursor - 1) % seq.len() as u64) as usize;
                seq[idx]
            }
            BagConfig::Weighted(entries) => weighted_draw(entries, rng),
        }
    }

    /// Preview the next `k` draws without advancing the bag or the stream.
    pub fn peek_next(&self, k: usize, rng: &Pcg32) -> Vec<PieceSpec> {
        let mut bag = self.clone();
        let mut rng = *rng;
        (0..k).map(|_| bag.draw(&mut rng)).collect()
    }
}

fn weighted_draw(entries: &[WeightedEntry], rng: &mut Pcg32) -> PieceSpec {
    let total: i64 = entries.iter().map(|e| e.weight).sum();
    let mut roll = rng.next_below(total as u64) as i64;
    for e in entries {
        if roll < e.weight {
            return e.spec;
        }
        roll -= e.weight;
    }
    unreachable!("weighted draw overran total weight {total}")
}
