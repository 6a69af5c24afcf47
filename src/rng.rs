// ── Seedable randomness ─────────────────────────────────────────────────────
// Weighted question selection and response-phrase picking must be seedable
// for tests (SPEC_FULL.md §9 design note). Callers take `&mut dyn CoreRng`
// so production code uses entropy-seeded randomness and tests inject a fixed
// seed. The trait is kept non-generic (`shuffle_strings` rather than a
// generic `shuffle<T>`) so it stays object-safe and usable behind `dyn`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait CoreRng: Send {
    fn gen_range_f64(&mut self, lo: f64, hi: f64) -> f64;
    fn gen_range_usize(&mut self, lo: usize, hi: usize) -> usize;
    fn shuffle_strings(&mut self, items: &mut [String]);
}

/// Entropy-seeded RNG for production use. Built on `StdRng` (rather than
/// `rand::rngs::ThreadRng`, which is `!Send`) so it can live behind a shared
/// lock inside types used from async tasks.
pub struct EntropyRng(StdRng);

impl EntropyRng {
    pub fn new() -> Self {
        Self(StdRng::from_entropy())
    }
}

impl Default for EntropyRng {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreRng for EntropyRng {
    fn gen_range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        self.0.gen_range(lo..hi)
    }

    fn gen_range_usize(&mut self, lo: usize, hi: usize) -> usize {
        self.0.gen_range(lo..hi)
    }

    fn shuffle_strings(&mut self, items: &mut [String]) {
        use rand::seq::SliceRandom;
        items.shuffle(&mut self.0);
    }
}

/// Fixed-seed RNG for deterministic tests.
pub struct SeededRng(StdRng);

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl CoreRng for SeededRng {
    fn gen_range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        self.0.gen_range(lo..hi)
    }

    fn gen_range_usize(&mut self, lo: usize, hi: usize) -> usize {
        self.0.gen_range(lo..hi)
    }

    fn shuffle_strings(&mut self, items: &mut [String]) {
        use rand::seq::SliceRandom;
        items.shuffle(&mut self.0);
    }
}
