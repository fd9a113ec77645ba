//! Corruption of branch target addresses by single-bit flips.

use crate::errors::InjectError;
use crate::segments::SegmentTracker;
use rand::distr::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Upper bound on rejection-sampling rounds before giving up. Generous for
/// any realistic code layout while still turning an impossible constraint
/// into an error instead of a hang.
pub const DEFAULT_MAX_FLIP_ATTEMPTS: usize = 65_536;

/// Produces corrupted addresses by flipping one uniformly chosen bit in
/// positions `[0, 63]`.
///
/// The generator is seeded once per campaign. For a fixed seed and a fixed
/// call sequence the returned addresses are exactly reproducible, which is
/// what makes a prior injection run replayable.
pub struct Corruptor {
    generator: StdRng,
    bit_positions: Uniform<u32>,
    max_attempts: usize,
}

impl Corruptor {
    pub fn new(seed: u64, max_attempts: usize) -> Self {
        Self {
            generator: StdRng::seed_from_u64(seed),
            bit_positions: Uniform::new_inclusive(0u32, 63).expect("valid bit position bounds"),
            max_attempts,
        }
    }

    /// Flips one randomly chosen bit of `address`.
    pub fn flip_bit(&mut self, address: u64) -> u64 {
        let position = self.bit_positions.sample(&mut self.generator);
        address ^ (1u64 << position)
    }

    /// Corrupts `address` by a single bit flip.
    ///
    /// With `constrain_to_executable` set, the flip is re-sampled (with a
    /// fresh bit position each round) until the result lands inside a range
    /// known to `segments`. Callers are expected to have recorded at least
    /// one executable range first; if the bound is exhausted the campaign
    /// gets an [`InjectError::UnsatisfiableConstraint`] back.
    pub fn corrupt(
        &mut self,
        address: u64,
        constrain_to_executable: bool,
        segments: &SegmentTracker,
    ) -> Result<u64, InjectError> {
        if !constrain_to_executable {
            return Ok(self.flip_bit(address));
        }

        for _ in 0..self.max_attempts {
            let target = self.flip_bit(address);
            if segments.contains(target) {
                return Ok(target);
            }
        }

        Err(InjectError::UnsatisfiableConstraint {
            address,
            attempts: self.max_attempts,
        })
    }
}
