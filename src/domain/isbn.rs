//! Book identifiers as typed in by a user.

use std::fmt;

use thiserror::Error;

/// Shortest identifier accepted for lookup (an ISBN-10).
pub const MIN_ISBN_LEN: usize = 10;

/// Rejected identifier input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid ISBN '{input}': expected at least {MIN_ISBN_LEN} characters, got {len}")]
pub struct InvalidIsbn {
    /// The trimmed input
    pub input: String,
    /// Character count after trimming
    pub len: usize,
}

/// A trimmed identifier eligible for lookup.
///
/// Only the length is checked. Digits, hyphens and check digits are passed
/// through to the providers untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Isbn(String);

impl Isbn {
    /// Trim surrounding whitespace and check the minimum length
    pub fn parse(raw: &str) -> Result<Self, InvalidIsbn> {
        let trimmed = raw.trim();
        let len = trimmed.chars().count();

        if len < MIN_ISBN_LEN {
            return Err(InvalidIsbn {
                input: trimmed.to_string(),
                len,
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Isbn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
