use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;
use utoipa::OpenApi;

use super::{
    dto::{
        ControlRequest, ControlResponse, ErrorResponse, HealthResponse, PollCommandResponse,
        ReadingDto, SubmitReadingRequest, SubmitReadingResponse,
    },
    errors::ApiError,
    AppState,
};
use crate::{config::CommandDelivery, db::models::BlindCommand, store::RECENT_READINGS_LIMIT};

/// Parses a JSON request body. An empty body or a top-level array counts as
/// `{}`, and the `Content-Type` header is not checked: device firmware does
/// not always send one.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: Value = serde_json::from_slice(body)?;
    if value.is_array() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value)?)
}

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// Store one sensor report from the device.
#[utoipa::path(
    post,
    path = "/api/blinds",
    request_body = SubmitReadingRequest,
    responses(
        (status = 201, description = "Reading stored", body = SubmitReadingResponse),
        (status = 400, description = "Body is not valid JSON", body = ErrorResponse),
        (status = 500, description = "Error saving data", body = ErrorResponse),
    ),
    tag = "readings"
)]
pub async fn submit_reading(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SubmitReadingResponse>), ApiError> {
    let request: SubmitReadingRequest = parse_body(&body)?;
    let reading = request
        .into_new_reading()
        .map_err(ApiError::store("Error saving data"))?;

    info!(
        status = ?reading.status,
        humidity = ?reading.humidity,
        light_level = ?reading.light_level,
        timestamp = ?reading.timestamp,
        "Received reading"
    );

    let stored = state
        .store
        .insert_reading(reading)
        .await
        .map_err(ApiError::store("Error saving data"))?;

    info!(id = %stored.id, "Reading saved");
    Ok((
        StatusCode::CREATED,
        Json(SubmitReadingResponse {
            message: "Data saved successfully".to_owned(),
            data: stored.into(),
        }),
    ))
}

/// Fetch the most recent readings, newest first (at most 100).
#[utoipa::path(
    get,
    path = "/api/blinds",
    responses(
        (status = 200, description = "Recent readings, newest first", body = Vec<ReadingDto>),
        (status = 500, description = "Error fetching data", body = ErrorResponse),
    ),
    tag = "readings"
)]
pub async fn list_readings(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReadingDto>>, ApiError> {
    let rows = state
        .store
        .recent_readings(RECENT_READINGS_LIMIT)
        .await
        .map_err(ApiError::store("Error fetching data"))?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Queue an operator command for the device.
#[utoipa::path(
    post,
    path = "/api/blinds/control",
    request_body = ControlRequest,
    responses(
        (status = 200, description = "Command queued", body = ControlResponse),
        (status = 400, description = "Unknown command or malformed body", body = ErrorResponse),
        (status = 500, description = "Error saving command", body = ErrorResponse),
    ),
    tag = "commands"
)]
pub async fn submit_command(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ControlResponse>, ApiError> {
    let request: ControlRequest = parse_body(&body)?;
    let command = request.blind_command().ok_or(ApiError::InvalidCommand)?;

    info!(command = %command, "Received command");

    state
        .store
        .insert_command(command)
        .await
        .map_err(ApiError::store("Error saving command"))?;

    Ok(Json(ControlResponse {
        message: "Command received".to_owned(),
        command,
    }))
}

/// Hand the next pending command to the polling device.
///
/// With `COMMAND_DELIVERY=latest` the newest command is returned and every
/// pending command is discarded; with `fifo` only the oldest is removed.
#[utoipa::path(
    get,
    path = "/api/blinds/command",
    responses(
        (status = 200, description = "Next command, or null when none is pending", body = PollCommandResponse),
        (status = 500, description = "Error fetching command", body = ErrorResponse),
    ),
    tag = "commands"
)]
pub async fn poll_command(
    State(state): State<AppState>,
) -> Result<Json<PollCommandResponse>, ApiError> {
    let taken = match state.command_delivery {
        CommandDelivery::Latest => state.store.take_latest_command().await,
        CommandDelivery::Fifo => state.store.take_oldest_command().await,
    }
    .map_err(ApiError::store("Error fetching command"))?;

    let command: Option<BlindCommand> = taken.map(|record| record.command);
    if let Some(command) = command {
        info!(command = %command, "Delivered command to device");
    }

    Ok(Json(PollCommandResponse { command }))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` whenever the process is serving. Does not touch the store.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_owned(),
        message: "Server is running".to_owned(),
    })
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(submit_reading, list_readings, submit_command, poll_command, health),
    components(schemas(
        ReadingDto,
        SubmitReadingRequest,
        SubmitReadingResponse,
        ControlRequest,
        ControlResponse,
        PollCommandResponse,
        HealthResponse,
        ErrorResponse,
        BlindCommand,
    )),
    tags(
        (name = "readings", description = "Sensor readings reported by the blind controller"),
        (name = "commands", description = "Operator commands relayed to the blind controller"),
        (name = "system",   description = "System endpoints"),
    ),
    info(
        title = "Smart Blinds Backend API",
        version = "0.1.0",
        description = "Telemetry ingestion and command relay for a motorized window-blind controller"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
