use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Mirrors the `blind_command` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "blind_command", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BlindCommand {
    Open,
    Close,
    Auto,
    Manual,
}

impl BlindCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlindCommand::Open => "open",
            BlindCommand::Close => "close",
            BlindCommand::Auto => "auto",
            BlindCommand::Manual => "manual",
        }
    }
}

impl fmt::Display for BlindCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown blind command: {0:?}")]
pub struct UnknownCommand(pub String);

impl FromStr for BlindCommand {
    type Err = UnknownCommand;

    /// Exact, case-sensitive match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "close" => Ok(Self::Close),
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            other => Err(UnknownCommand(other.to_owned())),
        }
    }
}

/// One sensor report from the blind controller.
///
/// Covers both firmware revisions: the first never sends `light_level`,
/// so rows written by it keep `None` there.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reading {
    pub id: Uuid,
    pub status: Option<String>,
    /// Relative humidity percentage
    pub humidity: Option<f64>,
    pub light_level: Option<f64>,
    /// Device-reported time, or `created_at` when the device omitted it or
    /// sent something that is not a recognisable date.
    pub timestamp: DateTime<Utc>,
    /// The device's timestamp string, kept verbatim when it could not be parsed.
    pub timestamp_raw: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reading that has been coerced from the request body but not yet stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewReading {
    pub status: Option<String>,
    pub humidity: Option<f64>,
    pub light_level: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub timestamp_raw: Option<String>,
}

/// A pending instruction waiting for the device to poll it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CommandRecord {
    pub id: Uuid,
    pub command: BlindCommand,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
