//! Share codes: the short public identifier of a published register.
//!
//! Six characters over a 32-symbol alphabet that drops 0/O and 1/I, since
//! codes get read over the phone and copied off whiteboards.  Codes are
//! stored uppercase and compared case-insensitively.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{CODE_ALPHABET, CODE_LENGTH};

/// A validated, uppercase share code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShareCode(String);

impl ShareCode {
    /// Generate a fresh random code, one uniform draw per character.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Generate with a caller-supplied RNG (deterministic tests).
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Parse user input: trims, uppercases, then checks length and alphabet.
    pub fn parse(input: &str) -> Result<Self, CodeError> {
        let normalized = input.trim().to_ascii_uppercase();
        if normalized.len() != CODE_LENGTH {
            return Err(CodeError::WrongLength(normalized.len()));
        }
        if let Some(bad) = normalized.bytes().find(|b| !CODE_ALPHABET.contains(b)) {
            return Err(CodeError::InvalidCharacter(bad as char));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShareCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ShareCode {
    type Error = CodeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ShareCode> for String {
    fn from(code: ShareCode) -> Self {
        code.0
    }
}

impl std::str::FromStr for ShareCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodeError {
    #[error("Share codes are {CODE_LENGTH} characters, got {0}")]
    WrongLength(usize),

    #[error("Invalid character in share code: {0:?}")]
    InvalidCharacter(char),
}
