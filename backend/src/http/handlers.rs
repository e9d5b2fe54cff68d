//! HTTP handlers for the REST API.
//!
//! Handlers parse their input, delegate to the service layer and wrap the
//! outcome in the response envelope.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::Uri,
    Json,
};

use super::dto::{HealthResponse, MeasurementsParams, StationsParams};
use super::error::AppError;
use super::state::AppState;
use crate::api::{ApiResult, FeederData, MeasurementsResult, StationsResult};
use crate::db::services as db_services;
use crate::services::ingestion;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let (status, repository) = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => ("ok", "connected".to_string()),
        Ok(false) => ("degraded", "disconnected".to_string()),
        Err(e) => ("degraded", format!("error: {}", e)),
    };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        repository,
    }))
}

/// POST /v1/feeder
///
/// An unknown token is a client error, not a missing resource.
pub async fn post_feeder(
    State(state): State<AppState>,
    payload: Result<Json<FeederData>, JsonRejection>,
) -> HandlerResult<ApiResult> {
    let Json(data) = payload?;
    let token = data.token_id.clone();

    match ingestion::ingest_feeder_data(state.repository.as_ref(), data).await {
        Ok(_) => Ok(Json(ApiResult::ok())),
        Err(e) if e.is_not_found() => {
            let msg = format!("can't get station by token id [{}]: {}", token, e);
            tracing::error!("{}", msg);
            Err(AppError::BadRequest(msg))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /v1/stations
pub async fn get_stations(
    State(state): State<AppState>,
    params: Result<Query<StationsParams>, QueryRejection>,
) -> HandlerResult<StationsResult> {
    let Query(params) = params?;
    let query = params.to_query()?;
    let stations = db_services::list_stations(state.repository.as_ref(), &query).await?;
    Ok(Json(StationsResult::new(stations)))
}

/// GET /v1/measurements
pub async fn get_measurements(
    State(state): State<AppState>,
    params: Result<Query<MeasurementsParams>, QueryRejection>,
) -> HandlerResult<MeasurementsResult> {
    let Query(params) = params?;
    let request = params.to_request()?;
    let measurements = db_services::measurements(
        state.repository.as_ref(),
        request.station_id,
        request.range,
        &request.variables,
    )
    .await?;
    Ok(Json(MeasurementsResult::new(measurements)))
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}
