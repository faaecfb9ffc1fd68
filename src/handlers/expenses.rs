use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use super::rows_or_not_found;
use crate::error::ApiError;
use crate::models::{CreateExpenseRequest, Expense, UpdateExpenseRequest};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseFilters {
    pub user_id: Option<i32>,
    pub status_id: Option<i32>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

pub async fn list_expenses(
    State(state): State<AppState>,
    Query(filters): Query<ExpenseFilters>,
) -> Result<Json<Vec<Expense>>, ApiError> {
    let expenses = state
        .db
        .get_expenses(
            filters.user_id,
            filters.status_id,
            filters.from_date,
            filters.to_date,
        )
        .await
        .map_err(ApiError::db("retrieve expenses"))?;
    Ok(Json(expenses))
}

pub async fn get_expense(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Expense>, ApiError> {
    let expense = state
        .db
        .get_expense_by_id(id)
        .await
        .map_err(ApiError::db("retrieve expense"))?
        .ok_or(ApiError::NotFound("Expense"))?;
    Ok(Json(expense))
}

pub async fn create_expense(
    State(state): State<AppState>,
    Json(request): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let expense_id = state
        .db
        .create_expense(&request)
        .await
        .map_err(ApiError::db("create expense"))?;
    Ok((StatusCode::CREATED, Json(json!({ "expenseId": expense_id }))))
}

pub async fn update_expense(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateExpenseRequest>,
) -> Result<Json<Value>, ApiError> {
    let rows_affected = state
        .db
        .update_expense(id, &request)
        .await
        .map_err(ApiError::db("update expense"))?;
    rows_or_not_found(rows_affected, "Expense", "Expense updated successfully")
}

pub async fn submit_expense(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let rows_affected = state
        .db
        .submit_expense(id)
        .await
        .map_err(ApiError::db("submit expense"))?;
    rows_or_not_found(rows_affected, "Expense", "Expense submitted successfully")
}

pub async fn approve_expense(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(reviewer_id): Json<i32>,
) -> Result<Json<Value>, ApiError> {
    let rows_affected = state
        .db
        .approve_expense(id, reviewer_id)
        .await
        .map_err(ApiError::db("approve expense"))?;
    rows_or_not_found(rows_affected, "Expense", "Expense approved successfully")
}

pub async fn reject_expense(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(reviewer_id): Json<i32>,
) -> Result<Json<Value>, ApiError> {
    let rows_affected = state
        .db
        .reject_expense(id, reviewer_id)
        .await
        .map_err(ApiError::db("reject expense"))?;
    rows_or_not_found(rows_affected, "Expense", "Expense rejected successfully")
}

pub async fn delete_expense(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let rows_affected = state
        .db
        .delete_expense(id)
        .await
        .map_err(ApiError::db("delete expense"))?;
    rows_or_not_found(rows_affected, "Expense", "Expense deleted successfully")
}
