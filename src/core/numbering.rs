//! Human-readable RNC numbers (`YYYY-NNN`)
//!
//! Numbers are handed out per calendar year: the first record created in 2025
//! is `2025-001`, the second `2025-002`, and so on. A number is assigned once
//! at creation and never reused.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A `(year, sequence)` pair identifying one RNC
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RncNumber {
    year: i32,
    seq: u32,
}

impl RncNumber {
    /// Build a number; the sequence starts at 1
    pub fn new(year: i32, seq: u32) -> Result<Self, RncNumberError> {
        if seq == 0 {
            return Err(RncNumberError::ZeroSequence);
        }
        if !(1..=9999).contains(&year) {
            return Err(RncNumberError::InvalidYear(year.to_string()));
        }
        Ok(Self { year, seq })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// Next number for `year` given the numbers already in use
    ///
    /// Scans for the highest sequence of that year and adds one. Only safe
    /// when a single writer holds the full record list.
    pub fn next_after<'a, I>(year: i32, existing: I) -> Self
    where
        I: IntoIterator<Item = &'a RncNumber>,
    {
        let last = existing
            .into_iter()
            .filter(|n| n.year == year)
            .map(|n| n.seq)
            .max()
            .unwrap_or(0);
        Self {
            year,
            seq: last + 1,
        }
    }
}

impl fmt::Display for RncNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:03}", self.year, self.seq)
    }
}

impl FromStr for RncNumber {
    type Err = RncNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (year, seq) = s
            .split_once('-')
            .ok_or_else(|| RncNumberError::Malformed(s.to_string()))?;

        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(RncNumberError::InvalidYear(year.to_string()));
        }
        if seq.is_empty() || !seq.chars().all(|c| c.is_ascii_digit()) {
            return Err(RncNumberError::Malformed(s.to_string()));
        }

        let year: i32 = year
            .parse()
            .map_err(|_| RncNumberError::InvalidYear(year.to_string()))?;
        let seq: u32 = seq
            .parse()
            .map_err(|_| RncNumberError::Malformed(s.to_string()))?;

        Self::new(year, seq)
    }
}

impl Serialize for RncNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RncNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors parsing or building an RNC number
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RncNumberError {
    #[error("invalid RNC number '{0}': expected YYYY-NNN (e.g. 2025-003)")]
    Malformed(String),

    #[error("invalid year '{0}' in RNC number")]
    InvalidYear(String),

    #[error("RNC sequence numbers start at 1")]
    ZeroSequence,
}
