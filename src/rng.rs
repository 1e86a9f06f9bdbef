//! Seedable random number source for the simulation.
//!
//! All randomness in the core (monster wandering, boss attack rolls) flows
//! through [`GameRng`], and the simulation is the only code that advances
//! it. Replaying a recorded input stream against the same seed therefore
//! reproduces a run exactly.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::map::direction::Direction;

#[derive(Debug, Clone)]
pub struct GameRng {
    inner: SmallRng,
}

impl GameRng {
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: SmallRng::seed_from_u64(seed),
        }
    }

    /// Uniform integer in `[min, max]`, both bounds inclusive.
    pub fn range(&mut self, min: i32, max: i32) -> i32 {
        debug_assert!(min <= max);
        self.inner.random_range(min..=max)
    }

    /// A one-in-`n` roll.
    pub fn chance(&mut self, n: i32) -> bool {
        debug_assert!(n > 0);
        self.range(0, n - 1) == 0
    }

    /// Uniformly chosen cardinal direction.
    pub fn direction(&mut self) -> Direction {
        Direction::DIRECTIONS[self.range(0, 3) as usize]
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::seeded(0)
    }
}
