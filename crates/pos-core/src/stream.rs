//! Event stream identification and versioning types.
//!
//! These are distinct from [`pos_domain::ids`]: a `StreamId` names an
//! event-sourced aggregate's storage key (e.g. `"cart-{cart_id}"`), while the
//! domain ids name business entities. Carts, terminals and tranlogs all
//! resolve to a `StreamId` before talking to the event store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `StreamId` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid stream ID: {0}")]
pub struct ParseStreamIdError(String);

/// Unique identifier for an event stream (aggregate instance), e.g.
/// `"cart-3f9a..."` or `"terminal-ten1-st1-3"`.
///
/// # Validation
///
/// - `FromStr::from_str()`: validates input (rejects empty strings)
/// - `From::from()` / `new()`: no validation, for trusted internal input
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamId(String);

impl StreamId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StreamId {
    type Err = ParseStreamIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseStreamIdError("Stream ID cannot be empty".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for StreamId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StreamId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for StreamId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Event version number for optimistic concurrency control. Versions start
/// at 0 and increment by 1 per event appended to a stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    pub const INITIAL: Self = Self(0);

    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub const fn is_initial(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Version> for u64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

impl std::ops::Add<u64> for Version {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl std::ops::Sub<u64> for Version {
    type Output = Self;

    fn sub(self, rhs: u64) -> Self::Output {
        Self(self.0 - rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_string_fails() {
        assert!("".parse::<StreamId>().is_err());
    }

    #[test]
    fn parse_valid_stream_id() {
        let id: StreamId = "cart-123".parse().expect("parse should succeed");
        assert_eq!(id, StreamId::new("cart-123"));
    }

    #[test]
    fn version_next_and_ordering() {
        let v0 = Version::INITIAL;
        let v1 = v0.next();
        assert_eq!(v1, Version::new(1));
        assert!(v0 < v1);
    }

    #[test]
    fn version_arithmetic() {
        let v5 = Version::new(5);
        assert_eq!(v5 + 3, Version::new(8));
        assert_eq!(v5 - 2, Version::new(3));
    }
}
