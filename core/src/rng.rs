//! Deterministic random number generation for source seeding.
//!
//! RULE: Nothing in the pipeline may call a platform RNG.
//! Every generated value flows from a SeedRng derived from the seed
//! given on the command line, so the same seed yields the same rows.
//!
//! Each column family draws from its own stream, derived from
//! (seed XOR stream_index * golden ratio). Adding a stream never
//! changes the values of existing ones.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct SeedRng {
    pub stream: SeedStream,
    inner: Pcg64Mcg,
}

impl SeedRng {
    pub fn new(seed: u64, stream: SeedStream) -> Self {
        let derived_seed = seed ^ (stream as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            stream,
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll an i64 in [lo, hi], both inclusive.
    pub fn next_i64_between(&mut self, lo: i64, hi: i64) -> i64 {
        assert!(lo <= hi, "empty range {lo}..={hi}");
        lo + self.next_u64_below((hi - lo) as u64 + 1) as i64
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.next_u64_below(items.len() as u64) as usize]
    }
}

/// Stable stream assignments.
/// NEVER reorder or remove entries, only append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum SeedStream {
    Address = 0,
    Nation = 1,
    Phone = 2,
    Balance = 3,
    Segment = 4,
    Comment = 5,
}

/// One RNG per stream for a single seeding run.
pub struct SeedBank {
    pub address: SeedRng,
    pub nation: SeedRng,
    pub phone: SeedRng,
    pub balance: SeedRng,
    pub segment: SeedRng,
    pub comment: SeedRng,
}

impl SeedBank {
    pub fn new(seed: u64) -> Self {
        Self {
            address: SeedRng::new(seed, SeedStream::Address),
            nation: SeedRng::new(seed, SeedStream::Nation),
            phone: SeedRng::new(seed, SeedStream::Phone),
            balance: SeedRng::new(seed, SeedStream::Balance),
            segment: SeedRng::new(seed, SeedStream::Segment),
            comment: SeedRng::new(seed, SeedStream::Comment),
        }
    }
}
