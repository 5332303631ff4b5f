use scan_fmt::scan_fmt;
use thiserror::Error;

use crate::executor::Statement;
use crate::row::Row;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrepareError {
    #[error("Error: Could not parse statement.")]
    SyntaxError,

    #[error("Error: Unrecognized keyword at start of '{0}'.")]
    UnrecognizedStatement(String),
}

/// Turns one line of input into a statement. Field values are not checked
/// here; the row codec rejects bad ids and oversized strings.
pub fn prepare_statement(input: &str) -> Result<Statement, PrepareError> {
    let input = input.trim();

    if input.starts_with("insert") {
        return scan_fmt!(input, "insert {} {} {}", i32, String, String)
            .map(|(id, username, email)| Statement::Insert(Row::new(id, username, email)))
            .map_err(|_| PrepareError::SyntaxError);
    }

    if input == "select" {
        return Ok(Statement::Select);
    }

    if input.starts_with("select ") {
        return scan_fmt!(input, "select {}", i32)
            .map(Statement::SelectById)
            .map_err(|_| PrepareError::SyntaxError);
    }

    Err(PrepareError::UnrecognizedStatement(input.to_string()))
}
