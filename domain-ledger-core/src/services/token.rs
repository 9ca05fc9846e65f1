//! Verification token generation

use std::sync::Arc;

use crate::error::CoreResult;
use crate::traits::RandomSource;

/// Namespace tag prepended to every token so TXT records are self-describing.
pub const DEFAULT_TOKEN_PREFIX: &str = "nezha-verify-";

/// Bytes of entropy per token (128 bits).
pub const TOKEN_ENTROPY_BYTES: usize = 16;

/// Mints `<prefix><32 hex chars>` verification tokens.
#[derive(Clone)]
pub struct TokenGenerator {
    source: Arc<dyn RandomSource>,
    prefix: String,
}

impl TokenGenerator {
    #[must_use]
    pub fn new(source: Arc<dyn RandomSource>, prefix: impl Into<String>) -> Self {
        Self {
            source,
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Generate a fresh token.
    ///
    /// # Errors
    /// `RandomnessUnavailable` if the random source fails.
    pub fn generate(&self) -> CoreResult<String> {
        let mut bytes = [0u8; TOKEN_ENTROPY_BYTES];
        self.source.fill(&mut bytes)?;
        Ok(format!("{}{}", self.prefix, hex::encode(bytes)))
    }
}
