//! Administrative API errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::routing::RuleError;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidRule(#[from] RuleError),

    #[error("Failed to import settings: rule {index}: {source}")]
    InvalidImport { index: usize, source: RuleError },

    #[error("Proxy rule not found")]
    NotFound,

    #[error("Failed to export settings")]
    Export(#[source] serde_json::Error),
}

impl AdminError {
    pub fn status(&self) -> StatusCode {
        match self {
            AdminError::InvalidBody(_)
            | AdminError::InvalidRule(_)
            | AdminError::InvalidImport { .. } => StatusCode::BAD_REQUEST,
            AdminError::NotFound => StatusCode::NOT_FOUND,
            AdminError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Admin request failed");
        } else {
            tracing::debug!(error = %self, "Admin request rejected");
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(AdminError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AdminError::InvalidRule(RuleError::MissingTarget).status(),
            StatusCode::BAD_REQUEST
        );
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(AdminError::InvalidBody(parse).status(), StatusCode::BAD_REQUEST);
    }
}
