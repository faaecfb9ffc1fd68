use axum::extract::State;
use axum::Json;

use crate::error::ApiError;
use crate::models::{ExpenseCategory, ExpenseStatusRow, Role};
use crate::AppState;

pub async fn get_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<ExpenseCategory>>, ApiError> {
    let categories = state
        .db
        .get_expense_categories()
        .await
        .map_err(ApiError::db("retrieve categories"))?;
    Ok(Json(categories))
}

pub async fn get_statuses(
    State(state): State<AppState>,
) -> Result<Json<Vec<ExpenseStatusRow>>, ApiError> {
    let statuses = state
        .db
        .get_expense_statuses()
        .await
        .map_err(ApiError::db("retrieve statuses"))?;
    Ok(Json(statuses))
}

pub async fn get_roles(State(state): State<AppState>) -> Result<Json<Vec<Role>>, ApiError> {
    let roles = state
        .db
        .get_roles()
        .await
        .map_err(ApiError::db("retrieve roles"))?;
    Ok(Json(roles))
}
