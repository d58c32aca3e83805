//! Injectable randomness.
//!
//! Every random decision the engine makes goes through [`Sampler`], which
//! wraps a [`RandomSource`]. Production code seeds a `StdRng`; tests can
//! script exact draws.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::street::SegmentId;

/// A source of uniform draws in `[0, 1)`.
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;

    /// Raw bits, used for segment ids.
    fn next_u64(&mut self) -> u64 {
        (self.next_f64() * u64::MAX as f64) as u64
    }
}

/// Adapts any `rand` generator.
pub struct RngSource<R: RngCore>(pub R);

impl<R: RngCore> RandomSource for RngSource<R> {
    fn next_f64(&mut self) -> f64 {
        self.0.gen::<f64>()
    }

    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }
}

/// Random helpers used throughout the engine.
pub struct Sampler {
    source: Box<dyn RandomSource>,
}

impl Sampler {
    pub fn new(source: impl RandomSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// Deterministic sampler for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self::new(RngSource(StdRng::seed_from_u64(seed)))
    }

    pub fn from_entropy() -> Self {
        Self::new(RngSource(StdRng::from_entropy()))
    }

    pub fn next_f64(&mut self) -> f64 {
        self.source.next_f64()
    }

    /// True with probability `p`. `p >= 1` always fires, `p <= 0` never does.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform index in `0..len`. Returns 0 for an empty range.
    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        ((self.next_f64() * len as f64) as usize).min(len - 1)
    }

    pub fn choose<'t, T>(&mut self, items: &'t [T]) -> Option<&'t T> {
        if items.is_empty() {
            None
        } else {
            let i = self.index(items.len());
            items.get(i)
        }
    }

    /// Uniform integer in `lo..=hi`; swapped bounds are tolerated.
    pub fn range_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        lo + self.index((hi - lo) as usize + 1) as u32
    }

    /// Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.index(i + 1);
            items.swap(i, j);
        }
    }

    /// Weighted selection. Non-positive and non-finite weights are ignored;
    /// returns `None` when nothing has positive weight.
    pub fn select<T>(&mut self, items: impl IntoIterator<Item = (T, f64)>) -> Option<T> {
        let mut weighted: Vec<(T, f64)> = items
            .into_iter()
            .filter(|(_, w)| w.is_finite() && *w > 0.0)
            .collect();
        let total: f64 = weighted.iter().map(|(_, w)| w).sum();
        if weighted.is_empty() || total <= 0.0 {
            return None;
        }

        let mut roll = self.next_f64() * total;
        let mut chosen = weighted.len() - 1;
        for (i, (_, w)) in weighted.iter().enumerate() {
            if roll < *w {
                chosen = i;
                break;
            }
            roll -= w;
        }
        Some(weighted.swap_remove(chosen).0)
    }

    /// A fresh v4 segment id drawn from this sampler.
    pub fn segment_id(&mut self) -> SegmentId {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.source.next_u64().to_le_bytes());
        bytes[8..].copy_from_slice(&self.source.next_u64().to_le_bytes());
        SegmentId::from_uuid(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler").finish_non_exhaustive()
    }
}

/// Replays a fixed list of draws, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    draws: Vec<f64>,
    cursor: usize,
    counter: u64,
}

impl ScriptedSource {
    pub fn new(draws: Vec<f64>) -> Self {
        Self {
            draws,
            cursor: 0,
            counter: 0,
        }
    }
}

impl RandomSource for ScriptedSource {
    fn next_f64(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let value = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        value
    }

    fn next_u64(&mut self) -> u64 {
        self.counter = self.counter.wrapping_add(1);
        self.counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripted(draws: &[f64]) -> Sampler {
        Sampler::new(ScriptedSource::new(draws.to_vec()))
    }

    #[test]
    fn test_select_follows_cumulative_weights() {
        let items = || vec![("a", 1.0), ("b", 3.0)];
        // total 4: roll 0.2*4=0.8 lands in "a", 0.5*4=2.0 in "b"
        let mut s = scripted(&[0.2, 0.5, 0.99]);
        assert_eq!(s.select(items()), Some("a"));
        assert_eq!(s.select(items()), Some("b"));
        assert_eq!(s.select(items()), Some("b"));
    }

    #[test]
    fn test_select_zero_weights_is_none() {
        let mut s = Sampler::seeded(1);
        assert_eq!(s.select(vec![("a", 0.0), ("b", 0.0)]), None);
        assert_eq!(s.select(Vec::<(&str, f64)>::new()), None);
        assert_eq!(s.select(vec![("a", -2.0), ("b", 1.0)]), Some("b"));
    }

    #[test]
    fn test_chance_extremes() {
        let mut s = Sampler::seeded(3);
        for _ in 0..100 {
            assert!(s.chance(1.0));
            assert!(!s.chance(0.0));
        }
    }

    #[test]
    fn test_range_inclusive_bounds() {
        let mut s = Sampler::seeded(9);
        for _ in 0..200 {
            let n = s.range_inclusive(2, 5);
            assert!((2..=5).contains(&n));
        }
        assert_eq!(scripted(&[0.0]).range_inclusive(4, 4), 4);
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut s = Sampler::seeded(42);
        let mut items: Vec<u32> = (0..20).collect();
        s.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = Sampler::seeded(11);
        let mut b = Sampler::seeded(11);
        for _ in 0..10 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
        }
        assert_eq!(a.segment_id(), b.segment_id());
    }

    #[test]
    fn test_segment_ids_are_distinct() {
        let mut s = scripted(&[0.5]);
        let first = s.segment_id();
        let second = s.segment_id();
        assert_ne!(first, second);
    }
}
