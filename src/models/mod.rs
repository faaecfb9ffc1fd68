pub mod expense;
pub mod lookups;
pub mod user;

pub use expense::{
    minor_to_major, to_minor_units, CreateExpenseRequest, Expense, UpdateExpenseRequest,
};
pub use lookups::{ExpenseCategory, ExpenseStatus, ExpenseStatusRow, Role};
pub use user::{CreateUserRequest, UpdateUserRequest, User};
