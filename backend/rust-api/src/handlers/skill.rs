use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    models::{Difficulty, SkillResponse},
    services::{skill_service::SkillService, AppState},
};

#[derive(Debug, Deserialize)]
pub struct SkillQuery {
    pub user_id: String,
    pub topic: String,
}

pub async fn get_skill(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SkillQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = SkillService::new(state.mongo.clone());

    let score = service
        .get_skill(&query.user_id, &query.topic)
        .await
        .map_err(|e| e.into_http())?;

    Ok((
        StatusCode::OK,
        Json(SkillResponse {
            user_id: query.user_id,
            topic: query.topic,
            score,
            band: Difficulty::band_for(score),
        }),
    ))
}
