pub mod chat;
pub mod expenses;
pub mod lookups;
pub mod users;

use axum::Json;
use serde_json::{json, Value};

use crate::error::ApiError;

/// Maps the rows-affected contract shared by every mutating endpoint:
/// zero rows means the target row does not exist.
fn rows_or_not_found(
    rows_affected: i32,
    entity: &'static str,
    message: &str,
) -> Result<Json<Value>, ApiError> {
    if rows_affected == 0 {
        Err(ApiError::NotFound(entity))
    } else {
        Ok(Json(json!({ "message": message })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn zero_rows_affected_is_never_a_success() {
        assert!(rows_or_not_found(0, "Expense", "ignored").is_err());
        assert!(rows_or_not_found(1, "Expense", "Expense updated successfully").is_ok());
        assert!(rows_or_not_found(3, "User", "User updated successfully").is_ok());
    }

    #[tokio::test]
    async fn missing_target_reports_the_entity_name() {
        let response = rows_or_not_found(0, "User", "unused")
            .unwrap_err()
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "User not found");
    }
}
