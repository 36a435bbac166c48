//! Pot lifecycle status.
//!
//! The contract stores status as a small integer; the projection keeps a
//! closed enum and persists it as TEXT. Lifecycle: Pending -> Open ->
//! Closed -> Ended, with Cancelled reachable from any non-terminal
//! state. Ended and Cancelled are terminal for the status field.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PotStatus {
    Pending,
    Open,
    Closed,
    Ended,
    Cancelled,
}

/// A persisted status string that is not one of the five variants.
#[derive(Debug, Error)]
#[error("invalid pot status: {0}")]
pub struct InvalidStatus(pub String);

impl PotStatus {
    /// Decode the contract's raw status integer; unknown values yield None.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Pending),
            1 => Some(Self::Open),
            2 => Some(Self::Closed),
            3 => Some(Self::Ended),
            4 => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Ended => "ENDED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// No status transition ever leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Cancelled)
    }
}

impl fmt::Display for PotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PotStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "OPEN" => Ok(Self::Open),
            "CLOSED" => Ok(Self::Closed),
            "ENDED" => Ok(Self::Ended),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

impl ToSql for PotStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for PotStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: InvalidStatus| FromSqlError::Other(Box::new(e)))
    }
}
