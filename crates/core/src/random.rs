//! Injected random source, deterministic seed mixing, and weighted picking.

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::{Rng, SeedableRng};

/// The random operations generation consumes. Implemented for the seeded
/// ChaCha stream; tests may supply scripted sources.
pub trait GenRandom {
    /// Uniform value in `0..bound`; returns 0 when `bound` is 0.
    fn next_below(&mut self, bound: u32) -> u32;

    /// True with `chance` percent probability. Non-positive chances never pass.
    fn next_pct(&mut self, chance: i32) -> bool {
        chance > 0 && (self.next_below(100) as i32) < chance
    }
}

impl GenRandom for ChaCha8Rng {
    fn next_below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        (self.next_u64() % u64::from(bound)) as u32
    }
}

pub fn attempt_rng(seed: u64, attempt: u32) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(derive_attempt_seed(seed, attempt))
}

pub fn derive_attempt_seed(region_seed: u64, attempt: u32) -> u64 {
    let mut mixed = region_seed ^ 0x9E37_79B9_7F4A_7C15;
    mixed ^= u64::from(attempt).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    mixed ^= mixed >> 30;
    mixed = mixed.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    mixed ^= mixed >> 27;
    mixed = mixed.wrapping_mul(0x94D0_49BB_1331_11EB);
    mixed ^ (mixed >> 31)
}

/// Weighted random choice over a candidate pool.
#[derive(Clone, Debug)]
pub struct Picker<T> {
    entries: Vec<(T, u32)>,
    total_weight: u64,
}

impl<T> Default for Picker<T> {
    fn default() -> Self {
        Self { entries: Vec::new(), total_weight: 0 }
    }
}

impl<T> Picker<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-weight candidates are ignored.
    pub fn add(&mut self, item: T, weight: u32) {
        if weight == 0 {
            return;
        }
        self.total_weight += u64::from(weight);
        self.entries.push((item, weight));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_weight = 0;
    }

    pub fn pick(&self, rng: &mut impl GenRandom) -> Option<&T> {
        self.pick_index(rng).map(|index| &self.entries[index].0)
    }

    pub fn pick_remove(&mut self, rng: &mut impl GenRandom) -> Option<T> {
        let index = self.pick_index(rng)?;
        let (item, weight) = self.entries.remove(index);
        self.total_weight -= u64::from(weight);
        Some(item)
    }

    fn pick_index(&self, rng: &mut impl GenRandom) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        let bound = u32::try_from(self.total_weight).unwrap_or(u32::MAX);
        let mut roll = u64::from(rng.next_below(bound));
        for (index, (_, weight)) in self.entries.iter().enumerate() {
            let weight = u64::from(*weight);
            if roll < weight {
                return Some(index);
            }
            roll -= weight;
        }
        Some(self.entries.len() - 1)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::GenRandom;

    /// Replays a fixed list of rolls, cycling when exhausted.
    pub(crate) struct ScriptedRandom {
        rolls: Vec<u32>,
        cursor: usize,
    }

    impl ScriptedRandom {
        pub(crate) fn new(rolls: &[u32]) -> Self {
            Self { rolls: rolls.to_vec(), cursor: 0 }
        }

        pub(crate) fn always(roll: u32) -> Self {
            Self::new(&[roll])
        }
    }

    impl GenRandom for ScriptedRandom {
        fn next_below(&mut self, bound: u32) -> u32 {
            if bound == 0 || self.rolls.is_empty() {
                return 0;
            }
            let roll = self.rolls[self.cursor % self.rolls.len()];
            self.cursor += 1;
            roll % bound
        }
    }
}
