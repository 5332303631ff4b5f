use crate::error::{DbError, Result, RowError};
use crate::row::Row;
use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
    SelectById(i32),
}

/// Runs a statement and returns the lines to print, ending with `Executed.`.
pub fn execute_statement(statement: &Statement, table: &mut Table) -> Result<Vec<String>> {
    match statement {
        Statement::Insert(row) => execute_insert(row, table),
        Statement::Select => execute_select(table),
        Statement::SelectById(id) => execute_select_by_id(*id, table),
    }
}

fn execute_insert(row: &Row, table: &mut Table) -> Result<Vec<String>> {
    table.insert(row)?;
    Ok(vec![executed()])
}

fn execute_select(table: &mut Table) -> Result<Vec<String>> {
    let mut lines = table
        .scan()?
        .map(|row| row.map(|row| row.to_string()))
        .collect::<Result<Vec<_>>>()?;
    lines.push(executed());
    Ok(lines)
}

fn execute_select_by_id(id: i32, table: &mut Table) -> Result<Vec<String>> {
    if id <= 0 {
        return Err(RowError::NonPositiveId(id).into());
    }
    let row = table.find(id as u32)?;
    Ok(vec![row.to_string(), executed()])
}

fn executed() -> String {
    "Executed.".to_string()
}

/// The single line reported to the user when a statement fails.
pub fn describe_error(err: &DbError) -> String {
    match err {
        DbError::DuplicateKey(_) => "Error: Duplicate key.".to_string(),
        DbError::InvalidRow(RowError::NonPositiveId(_)) => "Error: ID must be positive.".to_string(),
        DbError::InvalidRow(
            RowError::UsernameTooLong(_) | RowError::EmailTooLong(_) | RowError::NulInColumn(_),
        ) => {
            "Error: String is too long.".to_string()
        }
        DbError::NotFound(id) => format!("Error: Row id {} not found.", id),
        other => format!("Error: {}.", other),
    }
}
