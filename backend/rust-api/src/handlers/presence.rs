use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    models::presence::{HeartbeatRequest, HeartbeatResponse, OpponentsQuery, OpponentsResponse},
    services::{presence_service::PresenceService, AppState},
};

pub async fn heartbeat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HeartbeatRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = PresenceService::new(state.mongo.clone(), state.redis.clone());

    service
        .heartbeat(&req.user_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to record heartbeat: {}", e);
            e.into_http()
        })?;

    Ok((StatusCode::OK, Json(HeartbeatResponse { status: "ok" })))
}

pub async fn list_opponents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OpponentsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = PresenceService::new(state.mongo.clone(), state.redis.clone());

    let opponents = service
        .list_available_opponents(&query.user_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list opponents: {}", e);
            e.into_http()
        })?;

    Ok((StatusCode::OK, Json(OpponentsResponse { opponents })))
}
