use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExpenseError>;

#[derive(Debug, Error)]
pub enum ExpenseError {
    /// The only fatal error: the binary exits when the store cannot be opened.
    #[error("could not open database {}: {source}", .path.display())]
    StoreUnopenable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("no expense selected")]
    NoSelection,

    #[error("amount '{0}' is not a number")]
    InvalidAmount(String),

    #[error("date '{0}' is not in YYYY-MM-DD form")]
    InvalidDate(String),

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExpenseError {
    /// Errors the user can fix from the form; everything else is reported as a failure.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ExpenseError::NoSelection
                | ExpenseError::InvalidAmount(_)
                | ExpenseError::InvalidDate(_)
                | ExpenseError::UnknownCategory(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_recoverable() {
        assert!(ExpenseError::NoSelection.is_user_error());
        assert!(ExpenseError::InvalidAmount("abc".to_string()).is_user_error());
        assert!(!ExpenseError::Storage(rusqlite::Error::InvalidQuery).is_user_error());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ExpenseError::InvalidAmount("12,5x".to_string()).to_string(),
            "amount '12,5x' is not a number"
        );
        assert_eq!(
            ExpenseError::UnknownCategory("Taxes".to_string()).to_string(),
            "unknown category 'Taxes'"
        );
    }
}
