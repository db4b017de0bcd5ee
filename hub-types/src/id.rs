//! Identity type for synchronized entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// The identifier of a synchronized entity.
///
/// Assigned by the remote side on creation. Both numeric and string ids are
/// accepted on the wire; `0` and `""` mean "not assigned yet".
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    /// Numeric identifier.
    Number(i64),
    /// String identifier (e.g. UUIDs or server-generated slugs).
    Text(String),
}

impl EntityId {
    /// The unassigned numeric id.
    pub fn unassigned() -> Self {
        Self::Number(0)
    }

    /// Whether this id has not been assigned by the remote side yet.
    pub fn is_unassigned(&self) -> bool {
        match self {
            Self::Number(n) => *n == 0,
            Self::Text(s) => s.is_empty(),
        }
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::unassigned()
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for EntityId {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<u32> for EntityId {
    fn from(value: u32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl FromStr for EntityId {
    type Err = TypesError;

    /// Parses decimal integers as numeric ids and anything else as text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TypesError::EmptyId);
        }
        Ok(trimmed
            .parse::<i64>()
            .map(Self::Number)
            .unwrap_or_else(|_| Self::Text(trimmed.to_string())))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self)
    }
}
