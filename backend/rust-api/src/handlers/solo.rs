use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    models::solo::{CreateSoloRequest, SubmitSoloAnswerRequest},
    services::{solo_service::SoloService, AppState},
};

fn solo_service(state: &AppState) -> SoloService {
    SoloService::new(
        state.mongo.clone(),
        state.redis.clone(),
        state.question_provider.clone(),
    )
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSoloRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!(
        "Creating solo session for user_id={} topic={}",
        req.user_id,
        req.topic
    );

    let response = solo_service(&state)
        .create_session(&req.user_id, &req.topic, req.question_count)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create solo session: {}", e);
            e.into_http()
        })?;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<SubmitSoloAnswerRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let response = solo_service(&state)
        .submit_answer(&session_id, &req.answer)
        .await
        .map_err(|e| {
            tracing::error!("Failed to submit solo answer: {}", e);
            e.into_http()
        })?;

    Ok((StatusCode::OK, Json(response)))
}

pub async fn complete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!("Completing solo session: {}", session_id);

    let response = solo_service(&state)
        .complete_session(&session_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to complete solo session: {}", e);
            e.into_http()
        })?;

    Ok((StatusCode::OK, Json(response)))
}
