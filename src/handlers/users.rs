use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use super::rows_or_not_found;
use crate::error::ApiError;
use crate::models::{CreateUserRequest, UpdateUserRequest, User};
use crate::AppState;

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state
        .db
        .get_users()
        .await
        .map_err(ApiError::db("retrieve users"))?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .db
        .get_user_by_id(id)
        .await
        .map_err(ApiError::db("retrieve user"))?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(user))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user_id = state
        .db
        .create_user(&request)
        .await
        .map_err(ApiError::db("create user"))?;
    Ok((StatusCode::CREATED, Json(json!({ "userId": user_id }))))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    let rows_affected = state
        .db
        .update_user(id, &request)
        .await
        .map_err(ApiError::db("update user"))?;
    rows_or_not_found(rows_affected, "User", "User updated successfully")
}
