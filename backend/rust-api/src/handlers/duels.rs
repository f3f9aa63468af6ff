use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    models::{
        CreateChallengeRequest, CreateChallengeResponse, PendingChallengeResponse,
        SubmitDuelAnswerRequest,
    },
    models::duel::PendingChallengeQuery,
    services::{duel_service::DuelService, AppState},
};

fn duel_service(state: &AppState) -> DuelService {
    DuelService::new(
        state.mongo.clone(),
        state.question_provider.clone(),
        state.reward_hooks.clone(),
    )
}

pub async fn create_challenge(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateChallengeRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!(
        "Creating challenge: {} -> {} on {}",
        req.challenger_id,
        req.opponent_id,
        req.topic
    );

    let duel_id = duel_service(&state)
        .create_challenge(&req.challenger_id, &req.opponent_id, &req.topic)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create challenge: {}", e);
            e.into_http()
        })?;

    Ok((StatusCode::CREATED, Json(CreateChallengeResponse { duel_id })))
}

pub async fn get_pending_challenge(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PendingChallengeQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let challenge = duel_service(&state)
        .get_pending_challenge(&query.user_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch pending challenge: {}", e);
            e.into_http()
        })?;

    // 200 with null rather than 404: this endpoint is on the poll path.
    Ok((StatusCode::OK, Json(PendingChallengeResponse { challenge })))
}

pub async fn accept_challenge(
    State(state): State<Arc<AppState>>,
    Path(duel_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!("Accepting challenge: {}", duel_id);

    let view = duel_service(&state)
        .accept_challenge(&duel_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to accept challenge {}: {}", duel_id, e);
            e.into_http()
        })?;

    Ok((StatusCode::OK, Json(view)))
}

#[derive(Debug, serde::Deserialize)]
pub struct DuelStateQuery {
    /// Polling participant; shapes the directive for pending duels.
    pub user_id: Option<String>,
}

pub async fn get_duel_state(
    State(state): State<Arc<AppState>>,
    Path(duel_id): Path<String>,
    Query(query): Query<DuelStateQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let view = duel_service(&state)
        .get_duel_state(&duel_id, query.user_id.as_deref())
        .await
        .map_err(|e| e.into_http())?;

    Ok((StatusCode::OK, Json(view)))
}

pub async fn get_duel_summary(
    State(state): State<Arc<AppState>>,
    Path(duel_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let view = duel_service(&state)
        .get_duel_summary(&duel_id)
        .await
        .map_err(|e| e.into_http())?;

    Ok((StatusCode::OK, Json(view)))
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(duel_id): Path<String>,
    Json(req): Json<SubmitDuelAnswerRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!(
        "Answer submitted: duel={} participant={} index={} correct={}",
        duel_id,
        req.participant_id,
        req.question_index,
        req.correct
    );

    let response = duel_service(&state)
        .submit_answer(&duel_id, &req.participant_id, req.question_index, req.correct)
        .await
        .map_err(|e| {
            tracing::error!("Failed to submit answer for duel {}: {}", duel_id, e);
            e.into_http()
        })?;

    Ok((StatusCode::OK, Json(response)))
}
