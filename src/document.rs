use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Opaque per-snapshot key. Index rows of a snapshot are replaced by identity.
///
/// Snapshots carry it as a fixed-width hex string; it is stored as the
/// signed 64-bit integer with the same bit pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(i64);

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity is empty")]
    Empty,

    #[error("identity {0:?} is not a hex number")]
    NotHex(String),

    #[error("identity must not be zero")]
    Zero,
}

impl Identity {
    pub fn new(value: i64) -> Self {
        Identity(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdentityError::Empty);
        }

        let hex = s.strip_prefix("0x").unwrap_or(s);
        let value =
            u64::from_str_radix(hex, 16).map_err(|_| IdentityError::NotHex(s.to_string()))?;
        if value == 0 {
            return Err(IdentityError::Zero);
        }

        Ok(Identity(value as i64))
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0 as u64)
    }
}

/// Searchable text of one snapshot, ready to be written to the index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDocument {
    pub identity: Identity,
    pub url: String,
    pub title: String,
    /// Headings and primary content in document order.
    pub text: String,
    /// Navigation and other boilerplate.
    pub aux_text: String,
}
