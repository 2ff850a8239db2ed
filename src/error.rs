use bigdecimal::BigDecimal;
use thiserror::Error;

/// Errors raised by the ledger workflow and the store behind it.
#[derive(Debug, Error)]
pub enum ObrasError {
    /// The uploaded statement is malformed or misses required columns.
    #[error("invalid statement: {0}")]
    Format(String),

    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    #[error("items add up to R$ {items_total}, but the declared total is R$ {declared}")]
    AmountMismatch {
        items_total: BigDecimal,
        declared: BigDecimal,
    },

    /// Backend transport or authorization failure.
    #[error("failed to write to the ledger store: {0}")]
    Write(String),

    #[error("a project named '{0}' already exists")]
    DuplicateProject(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ObrasError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ObrasError::Validation(msg.into())
    }

    pub fn format(msg: impl Into<String>) -> Self {
        ObrasError::Format(msg.into())
    }

    /// True for errors the user fixes by editing the current form.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ObrasError::Validation(_)
                | ObrasError::AmountMismatch { .. }
                | ObrasError::DuplicateProject(_)
                | ObrasError::Format(_)
        )
    }
}

impl From<sqlx::Error> for ObrasError {
    fn from(err: sqlx::Error) -> Self {
        ObrasError::Write(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ObrasError>;
