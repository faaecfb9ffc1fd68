use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Converts a major-unit amount (e.g. pounds) to minor units (pence),
/// rounding half-away-from-zero. Saturates on overflow.
pub fn to_minor_units(amount: Decimal) -> i64 {
    (amount * Decimal::new(100, 0))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(i64::MAX)
}

pub fn minor_to_major(amount_minor: i64) -> Decimal {
    Decimal::new(amount_minor, 2)
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub expense_id: i32,
    pub user_id: i32,
    pub user_name: String,
    pub email: String,
    pub category_id: i32,
    pub category_name: String,
    pub status_id: i32,
    pub status_name: String,
    pub amount_minor: i64,
    pub currency: String,
    pub expense_date: NaiveDate,
    pub description: Option<String>,
    pub receipt_file: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<i32>,
    pub reviewer_name: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Major-unit value derived from `amount_minor`, for display only.
    #[sqlx(default)]
    #[serde(default)]
    pub amount: Decimal,
}

impl Expense {
    pub fn with_display_amount(mut self) -> Self {
        self.amount = minor_to_major(self.amount_minor);
        self
    }
}

fn default_currency() -> String {
    "GBP".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    pub user_id: i32,
    pub category_id: i32,
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub expense_date: NaiveDate,
    pub description: Option<String>,
    pub receipt_file: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpenseRequest {
    pub category_id: i32,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
    pub description: Option<String>,
    pub receipt_file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn two_decimal_amounts_convert_losslessly() {
        for raw in ["0.00", "0.01", "12.50", "99.99", "1000.00"] {
            let amount = Decimal::from_str(raw).unwrap();
            let minor = to_minor_units(amount);
            assert_eq!(minor_to_major(minor), amount, "round trip of {raw}");
        }
    }

    #[test]
    fn third_decimal_rounds_half_away_from_zero() {
        assert_eq!(to_minor_units(Decimal::from_str("12.505").unwrap()), 1251);
        assert_eq!(to_minor_units(Decimal::from_str("12.504").unwrap()), 1250);
        assert_eq!(to_minor_units(Decimal::from_str("0.005").unwrap()), 1);
    }

    #[test]
    fn minor_to_major_scales_by_hundred() {
        assert_eq!(minor_to_major(1251).to_string(), "12.51");
        assert_eq!(minor_to_major(0).to_string(), "0.00");
    }

    #[test]
    fn create_request_defaults_currency_to_gbp() {
        let request: CreateExpenseRequest = serde_json::from_str(
            r#"{"userId": 1, "categoryId": 2, "amount": 12.5, "expenseDate": "2025-03-01"}"#,
        )
        .unwrap();
        assert_eq!(request.currency, "GBP");
        assert_eq!(request.description, None);
    }
}
