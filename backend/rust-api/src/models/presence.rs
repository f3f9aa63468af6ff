use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct OpponentsQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct OpponentsResponse {
    pub opponents: Vec<String>,
}
