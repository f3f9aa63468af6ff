use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::services::{duel_service::DuelService, AppState};

/// Administrative override: clear a stuck duel so both participants become
/// available for matchmaking again.
pub async fn force_expire_duel(
    State(state): State<Arc<AppState>>,
    Path(duel_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::warn!("Force-expiring duel: {}", duel_id);

    let service = DuelService::new(
        state.mongo.clone(),
        state.question_provider.clone(),
        state.reward_hooks.clone(),
    );

    service.force_expire(&duel_id).await.map_err(|e| {
        tracing::error!("Failed to force-expire duel {}: {}", duel_id, e);
        e.into_http()
    })?;

    Ok((StatusCode::OK, Json(json!({ "status": "expired" }))))
}
