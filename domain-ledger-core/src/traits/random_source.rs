//! Randomness source abstraction

use rand::rngs::OsRng;
use rand::TryRngCore;

use crate::error::{CoreError, CoreResult};

/// Source of cryptographically secure random bytes
pub trait RandomSource: Send + Sync {
    /// Fill `buf` entirely with random bytes.
    ///
    /// # Errors
    /// `RandomnessUnavailable` when the underlying source cannot be read.
    fn fill(&self, buf: &mut [u8]) -> CoreResult<()>;
}

/// Operating system CSPRNG (`getrandom`)
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandomSource;

impl RandomSource for OsRandomSource {
    fn fill(&self, buf: &mut [u8]) -> CoreResult<()> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| CoreError::RandomnessUnavailable(e.to_string()))
    }
}
