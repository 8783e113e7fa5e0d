//! Record routes
//!
//! - `POST /processed_agent_data/` - ingest one batch (persist, then broadcast)
//! - `GET /processed_agent_data/` - list records
//! - `GET|PUT|DELETE /processed_agent_data/{id}` - single record administration
//! - `GET /health` - liveness and subscriber count

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use contracts::{PersistedRecord, ProcessedReading};
use serde::Serialize;
use tracing::info;

use super::error::Result;
use super::AppState;

/// POST /processed_agent_data/
pub async fn create_records(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Vec<ProcessedReading>>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<PersistedRecord>>)> {
    let Json(batch) = payload?;
    let persisted = state.service.ingest(&batch).await?;
    Ok((StatusCode::CREATED, Json(persisted)))
}

/// GET /processed_agent_data/
pub async fn list_records(State(state): State<AppState>) -> Result<Json<Vec<PersistedRecord>>> {
    Ok(Json(state.service.list().await?))
}

/// GET /processed_agent_data/{id}
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PersistedRecord>> {
    Ok(Json(state.service.get(id).await?))
}

/// PUT /processed_agent_data/{id}
pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: std::result::Result<Json<ProcessedReading>, JsonRejection>,
) -> Result<Json<PersistedRecord>> {
    let Json(reading) = payload?;
    let updated = state.service.update(id, &reading).await?;
    info!(id, "Record updated");
    Ok(Json(updated))
}

/// DELETE /processed_agent_data/{id}
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PersistedRecord>> {
    let deleted = state.service.delete(id).await?;
    info!(id, "Record deleted");
    Ok(Json(deleted))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub subscribers: usize,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        subscribers: state.service.broadcaster().subscriber_count(),
    })
}
