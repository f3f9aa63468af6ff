use axum::http::StatusCode;
use thiserror::Error;

/// Service-level error taxonomy. Race-lost answer submissions are deliberately
/// NOT represented here: losing the claim race is a normal outcome carried in
/// the submit response, not an error.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    /// The requested transition is not valid for the row's current state,
    /// e.g. accepting a duel that is no longer pending.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("storage error: {0}")]
    Store(#[from] mongodb::error::Error),

    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) | ApiError::Cache(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Map to the (status, message) tuple the handlers return.
    pub fn into_http(self) -> (StatusCode, String) {
        let status = self.status();
        (status, self.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Internal(anyhow::Error::new(e))
    }
}
