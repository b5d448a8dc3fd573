use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::models::{BlindCommand, NewReading, Reading},
    store::StoreError,
};

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadingDto {
    pub id: Uuid,
    /// Blind position or state as reported by the device.
    pub status: Option<String>,
    /// Relative humidity percentage
    pub humidity: Option<f64>,
    /// Only reported by the second firmware revision.
    pub light_level: Option<f64>,
    pub timestamp: DateTime<Utc>,
    /// Device timestamp text that could not be read as a date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_raw: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Reading> for ReadingDto {
    fn from(r: Reading) -> Self {
        Self {
            id: r.id,
            status: r.status,
            humidity: r.humidity,
            light_level: r.light_level,
            timestamp: r.timestamp,
            timestamp_raw: r.timestamp_raw,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Request body for `POST /api/blinds`.
///
/// Every field is optional and loosely typed; values are coerced the way a
/// document-store schema would cast them (see [`SubmitReadingRequest::into_new_reading`]).
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReadingRequest {
    #[schema(value_type = Option<String>)]
    pub status: Option<Value>,
    #[schema(value_type = Option<f64>)]
    pub humidity: Option<Value>,
    #[schema(value_type = Option<f64>)]
    pub light_level: Option<Value>,
    /// Date string or epoch number. Defaults to the creation time.
    #[schema(value_type = Option<String>)]
    pub timestamp: Option<Value>,
}

impl SubmitReadingRequest {
    /// Casts the raw JSON values into typed reading fields.
    ///
    /// - `status`: strings as-is; numbers and booleans are stringified.
    /// - `humidity` / `lightLevel`: numbers, numeric strings, booleans (0/1);
    ///   an empty string counts as absent.
    /// - `timestamp`: date strings or epoch numbers (see `cast_timestamp`). Text that is not a date is kept
    ///   in `timestamp_raw` rather than rejected.
    pub fn into_new_reading(self) -> Result<NewReading, StoreError> {
        let (timestamp, timestamp_raw) = cast_timestamp("timestamp", self.timestamp)?;
        Ok(NewReading {
            status: cast_string("status", self.status)?,
            humidity: cast_number("humidity", self.humidity)?,
            light_level: cast_number("lightLevel", self.light_level)?,
            timestamp,
            timestamp_raw,
        })
    }
}

fn cast_error(field: &'static str, expected: &'static str, value: &Value) -> StoreError {
    StoreError::Cast {
        field,
        expected,
        value: value.to_string(),
    }
}

fn cast_string(field: &'static str, value: Option<Value>) -> Result<Option<String>, StoreError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(cast_error(field, "string", &other)),
    }
}

fn cast_number(field: &'static str, value: Option<Value>) -> Result<Option<f64>, StoreError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let parsed = match &value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(cast_error(field, "Number", &value)),
    }
}

/// Epoch numbers below this magnitude are read as seconds, not milliseconds.
/// 1e11 ms is early 1973; 1e11 s is far beyond any plausible device clock.
const EPOCH_SECONDS_CUTOFF: f64 = 1e11;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%d.%m.%Y %H:%M:%S%.f",
];

/// Casts a device timestamp.
///
/// Accepted as a date: RFC3339 / RFC2822 strings, zone-less
/// `YYYY-MM-DD HH:MM:SS` style strings and bare dates (taken as UTC), and
/// epoch numbers or digit-only strings. Epochs are milliseconds unless small
/// enough to only make sense as seconds.
///
/// Any other non-empty string is returned as the raw text with no date, so
/// the reading is still stored. Booleans, arrays and objects are cast errors.
fn cast_timestamp(
    field: &'static str,
    value: Option<Value>,
) -> Result<(Option<DateTime<Utc>>, Option<String>), StoreError> {
    let Some(value) = value else {
        return Ok((None, None));
    };
    match &value {
        Value::Null => Ok((None, None)),
        Value::String(s) if s.trim().is_empty() => Ok((None, None)),
        Value::String(s) => match parse_date_text(s.trim()) {
            Some(at) => Ok((Some(at), None)),
            None => Ok((None, Some(s.clone()))),
        },
        Value::Number(n) => n
            .as_f64()
            .and_then(from_epoch)
            .map(|at| (Some(at), None))
            .ok_or_else(|| cast_error(field, "Date", &value)),
        _ => Err(cast_error(field, "Date", &value)),
    }
}

fn parse_date_text(s: &str) -> Option<DateTime<Utc>> {
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<f64>().ok().and_then(from_epoch);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn from_epoch(n: f64) -> Option<DateTime<Utc>> {
    if !n.is_finite() {
        return None;
    }
    let millis = if n.abs() < EPOCH_SECONDS_CUTOFF { n * 1000.0 } else { n };
    DateTime::from_timestamp_millis(millis.round() as i64)
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitReadingResponse {
    pub message: String,
    pub data: ReadingDto,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Request body for `POST /api/blinds/control`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ControlRequest {
    /// One of `open`, `close`, `auto`, `manual`.
    #[schema(value_type = Option<BlindCommand>)]
    pub command: Option<Value>,
}

impl ControlRequest {
    /// `None` unless `command` is a string naming a known command exactly.
    pub fn blind_command(&self) -> Option<BlindCommand> {
        self.command.as_ref()?.as_str()?.parse().ok()
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ControlResponse {
    pub message: String,
    pub command: BlindCommand,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PollCommandResponse {
    /// `null` when nothing is pending.
    pub command: Option<BlindCommand>,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Body of every 4xx/5xx response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
