use chrono::NaiveDate;
use log::error;
use sqlx::PgPool;

use crate::models::{
    to_minor_units, CreateExpenseRequest, CreateUserRequest, Expense, ExpenseCategory,
    ExpenseStatusRow, Role, UpdateExpenseRequest, UpdateUserRequest, User,
};

/// Persistence gateway. Every method invokes one stored procedure over a
/// pooled connection and maps its rows to a domain record, propagating
/// driver failures unchanged after logging. Mutating procedures return a
/// single integer row with the number of rows affected; zero means the
/// target row does not exist.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPool::connect(database_url).await?;

        // Test the connection
        sqlx::query("SELECT 1").fetch_one(&pool).await?;

        Ok(Self { pool })
    }

    /// Pool handle for unit tests; performs no I/O until a query runs.
    #[cfg(test)]
    pub fn connect_lazy(database_url: &str) -> Result<Self, sqlx::Error> {
        Ok(Self {
            pool: PgPool::connect_lazy(database_url)?,
        })
    }

    // Expense operations

    pub async fn get_expenses(
        &self,
        user_id: Option<i32>,
        status_id: Option<i32>,
        from_date: Option<NaiveDate>,
        to_date: Option<NaiveDate>,
    ) -> Result<Vec<Expense>, sqlx::Error> {
        let expenses = sqlx::query_as::<_, Expense>(
            "SELECT * FROM sp_get_expenses($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(status_id)
        .bind(from_date)
        .bind(to_date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Error getting expenses: {}", e);
            e
        })?;

        Ok(expenses
            .into_iter()
            .map(Expense::with_display_amount)
            .collect())
    }

    pub async fn get_expense_by_id(&self, expense_id: i32) -> Result<Option<Expense>, sqlx::Error> {
        let expense = sqlx::query_as::<_, Expense>("SELECT * FROM sp_get_expense_by_id($1)")
            .bind(expense_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Error getting expense {}: {}", expense_id, e);
                e
            })?;

        Ok(expense.map(Expense::with_display_amount))
    }

    /// Returns the id of the newly created expense.
    pub async fn create_expense(&self, request: &CreateExpenseRequest) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar("SELECT sp_create_expense($1, $2, $3, $4, $5, $6, $7)")
            .bind(request.user_id)
            .bind(request.category_id)
            .bind(to_minor_units(request.amount))
            .bind(&request.currency)
            .bind(request.expense_date)
            .bind(request.description.as_deref())
            .bind(request.receipt_file.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Error creating expense: {}", e);
                e
            })
    }

    pub async fn update_expense(
        &self,
        expense_id: i32,
        request: &UpdateExpenseRequest,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar("SELECT sp_update_expense($1, $2, $3, $4, $5, $6)")
            .bind(expense_id)
            .bind(request.category_id)
            .bind(to_minor_units(request.amount))
            .bind(request.expense_date)
            .bind(request.description.as_deref())
            .bind(request.receipt_file.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Error updating expense {}: {}", expense_id, e);
                e
            })
    }

    pub async fn submit_expense(&self, expense_id: i32) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar("SELECT sp_submit_expense($1)")
            .bind(expense_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Error submitting expense {}: {}", expense_id, e);
                e
            })
    }

    pub async fn approve_expense(
        &self,
        expense_id: i32,
        reviewer_id: i32,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar("SELECT sp_approve_expense($1, $2)")
            .bind(expense_id)
            .bind(reviewer_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Error approving expense {}: {}", expense_id, e);
                e
            })
    }

    pub async fn reject_expense(
        &self,
        expense_id: i32,
        reviewer_id: i32,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar("SELECT sp_reject_expense($1, $2)")
            .bind(expense_id)
            .bind(reviewer_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Error rejecting expense {}: {}", expense_id, e);
                e
            })
    }

    pub async fn delete_expense(&self, expense_id: i32) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar("SELECT sp_delete_expense($1)")
            .bind(expense_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Error deleting expense {}: {}", expense_id, e);
                e
            })
    }

    // User operations

    pub async fn get_users(&self) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM sp_get_users()")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Error getting users: {}", e);
                e
            })
    }

    pub async fn get_user_by_id(&self, user_id: i32) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM sp_get_user_by_id($1)")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Error getting user {}: {}", user_id, e);
                e
            })
    }

    /// Returns the id of the newly created user.
    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar("SELECT sp_create_user($1, $2, $3, $4)")
            .bind(&request.user_name)
            .bind(&request.email)
            .bind(request.role_id)
            .bind(request.manager_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Error creating user: {}", e);
                e
            })
    }

    pub async fn update_user(
        &self,
        user_id: i32,
        request: &UpdateUserRequest,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar("SELECT sp_update_user($1, $2, $3, $4, $5)")
            .bind(user_id)
            .bind(&request.user_name)
            .bind(&request.email)
            .bind(request.role_id)
            .bind(request.manager_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Error updating user {}: {}", user_id, e);
                e
            })
    }

    // Lookup operations

    pub async fn get_expense_categories(&self) -> Result<Vec<ExpenseCategory>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM sp_get_expense_categories()")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Error getting expense categories: {}", e);
                e
            })
    }

    pub async fn get_expense_statuses(&self) -> Result<Vec<ExpenseStatusRow>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM sp_get_expense_statuses()")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Error getting expense statuses: {}", e);
                e
            })
    }

    pub async fn get_roles(&self) -> Result<Vec<Role>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM sp_get_roles()")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Error getting roles: {}", e);
                e
            })
    }
}
