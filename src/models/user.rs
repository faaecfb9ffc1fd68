use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: i32,
    pub user_name: String,
    pub email: String,
    pub role_id: i32,
    pub role_name: String,
    pub manager_id: Option<i32>,
    pub manager_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub user_name: String,
    pub email: String,
    pub role_id: i32,
    pub manager_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub user_name: String,
    pub email: String,
    pub role_id: i32,
    pub manager_id: Option<i32>,
}
