use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("{0} not found")]
    NotFound(&'static str),
}

impl ApiError {
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Failure detail goes to the logs only; callers see a bare status.
        let status = match self {
            ApiError::Persistence(ref err) => {
                tracing::error!("store failure: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::NotFound(resource) => {
                tracing::debug!("{} not found", resource);
                StatusCode::NOT_FOUND
            }
        };

        status.into_response()
    }
}

// Driver error mapping: every database-level failure is a persistence
// failure as far as the handlers are concerned.
impl From<mongodb::error::Error> for ApiError {
    fn from(err: mongodb::error::Error) -> Self {
        ApiError::Persistence(err.to_string())
    }
}
