/// Wind gusts: tick-scheduled lateral pushes on the active piece.
///
/// The scheduler fires at `offset + k · interval`. Both the gust counter and
/// the `RANDOM_SEEDED` direction draw advance on every firing — piece or no
/// piece — so hazard-stream consumption is a pure function of the tick
/// number and the state stays replayable.

use crate::domain::int3::Int3;
use crate::domain::rng::Pcg32;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WindDirection {
    East,
    West,
    North,
    South,
}

impl WindDirection {
    pub fn vector(self) -> Int3 {
        match self {
            WindDirection::East => Int3::new(1, 0, 0),
            WindDirection::West => Int3::new(-1, 0, 0),
            WindDirection::North => Int3::new(0, 0, -1),
            WindDirection::South => Int3::new(0, 0, 1),
        }
    }

    pub fn from_name(s: &str) -> Option<WindDirection> {
        match s {
            "east" => Some(WindDirection::East),
            "west" => Some(WindDirection::West),
            "north" => Some(WindDirection::North),
            "south" => Some(WindDirection::South),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WindMode {
    /// EAST, WEST, EAST, … indexed by the gust counter.
    AlternateEw,
    /// Always the configured direction.
    Fixed,
    /// One hazard-stream draw per gust over the configured subset.
    RandomSeeded,
}

#[derive(Clone, Debug)]
pub struct WindConfig {
    pub enabled: bool,
    pub interval_ticks: u64,
    pub push_strength: i64,
    /// Unset: derived as one hazard-stream draw in `[0, interval)`.
    pub first_gust_offset: Option<u64>,
    pub mode: WindMode,
    pub fixed_direction: WindDirection,
    /// Draw subset for `RandomSeeded`; defaults to `[East, West]`.
    pub random_directions: Vec<WindDirection>,
}

#[derive(Clone, Debug)]
pub struct WindScheduler {
    config: WindConfig,
    next_fire: u64,
    gusts: u64,
}

impl WindScheduler {
    /// Consumes one hazard-stream draw iff the offset is unspecified.
    pub fn new(config: WindConfig, hazard_rng: &mut Pcg32) -> Self {
        let offset = match config.first_gust_offset {
            Some(o) => o,
            None => hazard_rng.next_below(config.interval_ticks),
        };
        WindScheduler {
            config,
            next_fire: offset,
            gusts: 0,
        }
    }

    pub fn due(&self, tick: u64) -> bool {
        self.config.enabled && tick == self.next_fire
    }

    /// Advance the schedule and return this gust's direction.
    pub fn fire(&mut self, hazard_rng: &mut Pcg32) -> WindDirection {
        let dir = match self.config.mode {
            WindMode::AlternateEw => {
                if self.gusts % 2 == 0 {
                    WindDirection::East
                } else {
                    WindDirection::West
                }
            }
            WindMode::Fixed => self.config.fixed_direction,
            WindMode::RandomSeeded => {
                let dirs = &self.config.random_directions;
                let idx = hazard_rng.next_below(dirs.len() as u64) as usize;
                dirs[idx]
            }
        };
        self.gusts += 1;
        self.next_fire += self.config.interval_ticks;
        dir
    }

    /// Effective push count for a piece of the given mass factor.
    pub fn effective_push(&self, mass_factor: i64) -> i64 {
        self.config.push_strength / mass_factor
    }

    /// Scheduler state serialized into the determinism hash.
    pub fn hash_state(&self) -> (u64, u64) {
        (self.next_fire, self.gusts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rng::STREAM_HAZARD;

    fn config(interval: u64, offset: Option<u64>, mode: WindMode) -> WindConfig {
        WindConfig {
            enabled: true,
            interval_ticks: interval,
            push_strength: 1,
            first_gust_offset: offset,
            mode,
            fixed_direction: WindDirection::East,
            random_directions: vec![WindDirection::East, WindDirection::West],
        }
    }

    #[test]
    fn alternate_ew_cycles() {
        let mut rng = Pcg32::new(0, STREAM_HAZARD);
        let mut w = WindScheduler::new(config(2, Some(0), WindMode::AlternateEw), &mut rng);
        assert!(w.due(0));
        assert_eq!(w.fire(&mut rng), WindDirection::East);
        assert!(!w.due(1));
        assert!(w.due(2));
        assert_eq!(w.fire(&mut rng), WindDirection::West);
        assert!(w.due(4));
        assert_eq!(w.fire(&mut rng), WindDirection::East);
    }

    #[test]
    fn derived_offset_is_below_interval() {
        for seed in 0..32 {
            let mut rng = Pcg32::new(seed, STREAM_HAZARD);
            let w = WindScheduler::new(config(7, None, WindMode::Fixed), &mut rng);
            assert!(w.hash_state().0 < 7);
        }
    }

    #[test]
    fn random_seeded_is_reproducible() {
        let mut a_rng = Pcg32::new(9, STREAM_HAZARD);
        let mut b_rng = Pcg32::new(9, STREAM_HAZARD);
        let mut a = WindScheduler::new(config(1, Some(0), WindMode::RandomSeeded), &mut a_rng);
        let mut b = WindScheduler::new(config(1, Some(0), WindMode::RandomSeeded), &mut b_rng);
        for _ in 0..40 {
            assert_eq!(a.fire(&mut a_rng), b.fire(&mut b_rng));
        }
    }

    #[test]
    fn heavy_pieces_halve_the_push() {
        let mut rng = Pcg32::new(0, STREAM_HAZARD);
        let mut cfg = config(1, Some(0), WindMode::Fixed);
        cfg.push_strength = 3;
        let w = WindScheduler::new(cfg, &mut rng);
        assert_eq!(w.effective_push(1), 3);
        assert_eq!(w.effective_push(2), 1);
    }

    #[test]
    fn disabled_never_fires() {
        let mut rng = Pcg32::new(0, STREAM_HAZARD);
        let mut cfg = config(1, Some(0), WindMode::Fixed);
        cfg.enabled = false;
        let w = WindScheduler::new(cfg, &mut rng);
        assert!(!w.due(0));
    }
}
