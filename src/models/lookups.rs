use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Expense lifecycle states as persisted in the statuses lookup table.
/// Shared by the lifecycle endpoints and the chat tool descriptions so
/// the two cannot drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl ExpenseStatus {
    pub const ALL: [ExpenseStatus; 4] = [
        ExpenseStatus::Draft,
        ExpenseStatus::Submitted,
        ExpenseStatus::Approved,
        ExpenseStatus::Rejected,
    ];

    pub fn id(self) -> i32 {
        match self {
            ExpenseStatus::Draft => 1,
            ExpenseStatus::Submitted => 2,
            ExpenseStatus::Approved => 3,
            ExpenseStatus::Rejected => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ExpenseStatus::Draft => "Draft",
            ExpenseStatus::Submitted => "Submitted",
            ExpenseStatus::Approved => "Approved",
            ExpenseStatus::Rejected => "Rejected",
        }
    }

    /// "1=Draft, 2=Submitted, ..." — used in tool parameter descriptions.
    pub fn describe_ids() -> String {
        Self::ALL
            .iter()
            .map(|status| format!("{}={}", status.id(), status.name()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseCategory {
    pub category_id: i32,
    pub category_name: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseStatusRow {
    pub status_id: i32,
    pub status_name: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub role_id: i32,
    pub role_name: String,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ids_and_names_are_stable() {
        let pairs: Vec<(i32, &str)> = ExpenseStatus::ALL
            .iter()
            .map(|status| (status.id(), status.name()))
            .collect();
        assert_eq!(
            pairs,
            [
                (1, "Draft"),
                (2, "Submitted"),
                (3, "Approved"),
                (4, "Rejected"),
            ]
        );
    }

    #[test]
    fn status_description_lists_all_states() {
        assert_eq!(
            ExpenseStatus::describe_ids(),
            "1=Draft, 2=Submitted, 3=Approved, 4=Rejected"
        );
    }
}
