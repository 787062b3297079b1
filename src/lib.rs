// Expense Tracker - Core Library
// Storage gateway, form state and controller; the binary adds the terminal UI.

pub mod config;
pub mod controller;
pub mod db;
pub mod entities;
pub mod error;
pub mod form;
pub mod logging;

// Re-export commonly used types
pub use controller::{ControllerState, FormController, TableRow, TABLE_HEADERS};
pub use db::{
    parse_amount, parse_date,
    Amount, Expense, ExpenseStore, NewExpense,
    DATE_FORMAT, DEFAULT_DB_PATH,
};
pub use entities::Category;
pub use error::{ExpenseError, Result};
pub use form::{ExpenseForm, Field};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
