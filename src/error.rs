use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Single error-to-response mapping for all API handlers. Not-found
/// conditions become 404s with an `{error}` body; data-access failures
/// become 500s carrying the raw driver message in `details`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Failed to {context}")]
    Database {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl ApiError {
    /// Adapter for `map_err` on gateway calls: tags the failure with the
    /// operation being attempted.
    pub fn db(context: &'static str) -> impl FnOnce(sqlx::Error) -> ApiError {
        move |source| ApiError::Database { context, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(entity) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("{entity} not found") })),
            )
                .into_response(),
            ApiError::Database { context, source } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": format!("Failed to {context}"),
                    "details": source.to_string(),
                })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn not_found_maps_to_404_with_error_body() {
        let response = ApiError::NotFound("Expense").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Expense not found");
    }

    #[tokio::test]
    async fn database_failure_maps_to_500_with_details() {
        let error = ApiError::Database {
            context: "retrieve expenses",
            source: sqlx::Error::RowNotFound,
        };
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Failed to retrieve expenses");
        assert!(json["details"].as_str().is_some());
    }
}
