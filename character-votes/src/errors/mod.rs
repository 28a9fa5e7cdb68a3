//! Error types for the Character Votes service.
//! Consolidates errors from configuration, the catalog, the vote store and the
//! voting flow, and maps them onto HTTP responses.
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use character_votes_flow::{RankingError, SessionError};
use character_votes_repository::VoteStoreError;
use character_votes_shared::CatalogError;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Vote store error: {0}")]
    Store(#[from] VoteStoreError),
    #[error("Ranking error: {0}")]
    Ranking(#[from] RankingError),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error("Sign in required")]
    Unauthorized,
    #[error("Identity is still being resolved")]
    IdentityPending,
    #[error("Unknown tab: {0}")]
    UnknownTab(String),
}

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        AppError::Config(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::IdentityPending => StatusCode::SERVICE_UNAVAILABLE,
            AppError::UnknownTab(_) => StatusCode::NOT_FOUND,
            AppError::Session(SessionError::NotSignedIn) => StatusCode::UNAUTHORIZED,
            AppError::Session(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        (
            status,
            Json(serde_json::json!({
                "status": "error",
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}
