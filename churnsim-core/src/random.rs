//! ## churnsim-core::random
//! **Uniform variates for the churn model**
//!
//! - `SeededRandomSource`: ChaCha8 stream selected by a `(seed, run)` pair,
//!   identical on every platform for a given pair.
//! - `ScriptedRandomSource`: replays a fixed list of draws, for reproducing a
//!   recorded pass.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of independent uniform draws in `[0, 1)`.
pub trait RandomSource: Send {
    fn next_unit(&mut self) -> f64;

    /// Restarts the generator from a fresh seed and run number.
    fn reseed(&mut self, seed: u64, run: u64);
}

#[derive(Debug, Clone)]
pub struct SeededRandomSource {
    rng: ChaCha8Rng,
    seed: u64,
    run: u64,
}

impl SeededRandomSource {
    pub fn new(seed: u64) -> Self {
        Self::with_run(seed, 0)
    }

    pub fn with_run(seed: u64, run: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(run);
        Self { rng, seed, run }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn run(&self) -> u64 {
        self.run
    }
}

impl RandomSource for SeededRandomSource {
    #[inline]
    fn next_unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    fn reseed(&mut self, seed: u64, run: u64) {
        *self = Self::with_run(seed, run);
    }
}

/// Replays recorded draws in order, wrapping around at the end.
///
/// Reseeding rewinds to the first draw.
#[derive(Debug, Clone)]
pub struct ScriptedRandomSource {
    draws: Vec<f64>,
    position: usize,
}

impl ScriptedRandomSource {
    /// # Panics
    /// Panics if `draws` is empty or holds a value outside `[0, 1)`.
    pub fn new(draws: Vec<f64>) -> Self {
        assert!(!draws.is_empty(), "Scripted source needs at least one draw");
        assert!(
            draws.iter().all(|d| (0.0..1.0).contains(d)),
            "Scripted draws must lie in [0, 1)"
        );
        Self { draws, position: 0 }
    }

    /// Number of draws consumed since construction or the last reseed.
    pub fn consumed(&self) -> usize {
        self.position
    }
}

impl RandomSource for ScriptedRandomSource {
    fn next_unit(&mut self) -> f64 {
        let draw = self.draws[self.position % self.draws.len()];
        self.position += 1;
        draw
    }

    fn reseed(&mut self, _seed: u64, _run: u64) {
        self.position = 0;
    }
}
