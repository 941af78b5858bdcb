//! Random helpers over a caller-supplied bit source.

use rand::{Rng, RngCore};

/// Thin wrapper around the caller's random source.
///
/// All generation randomness flows through here, so a program is a pure
/// function of the source's output sequence.
pub struct Rand<'r> {
    rs: &'r mut dyn RngCore,
}

impl<'r> Rand<'r> {
    pub fn new(rs: &'r mut dyn RngCore) -> Self {
        Self { rs }
    }

    /// Uniform integer in `[0, n)`; 0 when `n` is 0.
    pub fn intn(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        self.rs.gen_range(0..n)
    }

    /// Uniform integer in `[lo, hi]`.
    pub fn range_inclusive(&mut self, lo: u64, hi: u64) -> u64 {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        self.rs.gen_range(lo..=hi)
    }

    /// True with probability `n/out_of`.
    pub fn n_out_of(&mut self, n: usize, out_of: usize) -> bool {
        self.intn(out_of) < n
    }

    pub fn u64(&mut self) -> u64 {
        self.rs.next_u64()
    }

    pub fn fill(&mut self, buf: &mut [u8]) {
        self.rs.fill_bytes(buf);
    }
}
