use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("duplicate key {0}")]
    DuplicateKey(u32),

    #[error("invalid row: {0}")]
    InvalidRow(#[from] RowError),

    #[error("row id {0} not found")]
    NotFound(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt database file: {0}")]
    Corrupt(String),

    #[error("internal consistency violation: {0}")]
    InternalConsistency(String),
}

/// Reasons a row is rejected before it reaches the tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("id {0} is not positive")]
    NonPositiveId(i32),

    #[error("username is {0} bytes long")]
    UsernameTooLong(usize),

    #[error("email is {0} bytes long")]
    EmailTooLong(usize),

    #[error("{0} contains a NUL byte")]
    NulInColumn(&'static str),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Shorthand for raising an `InternalConsistency` error with a formatted message.
macro_rules! consistency {
    ($($arg:tt)*) => {
        $crate::error::DbError::InternalConsistency(format!($($arg)*))
    };
}

pub(crate) use consistency;
