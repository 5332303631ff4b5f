use log::error;

use crate::constants::*;
use crate::error::DbError;
use crate::executor::{describe_error, execute_statement};
use crate::parser::prepare_statement;
use crate::table::Table;

pub const PROMPT: &str = "database> ";

#[derive(Debug, PartialEq, Eq)]
pub enum ReplAction {
    Exit,
    Output(Vec<String>),
}

#[derive(Debug, PartialEq, Eq)]
enum MetaCommand {
    Exit,
    Btree,
    Constants,
    Unrecognized,
}

impl From<&str> for MetaCommand {
    fn from(s: &str) -> Self {
        match s {
            ".exit" => MetaCommand::Exit,
            ".btree" => MetaCommand::Btree,
            ".constants" => MetaCommand::Constants,
            _ => MetaCommand::Unrecognized,
        }
    }
}

/// Handles one line of input and returns what should be printed for it.
pub fn process_line(line: &str, table: &mut Table) -> ReplAction {
    let line = line.trim();

    if line.starts_with('.') {
        return do_meta_command(line, table);
    }

    let statement = match prepare_statement(line) {
        Ok(statement) => statement,
        Err(e) => return ReplAction::Output(vec![e.to_string()]),
    };

    match execute_statement(&statement, table) {
        Ok(lines) => ReplAction::Output(lines),
        Err(e) => ReplAction::Output(vec![report(&e)]),
    }
}

fn do_meta_command(line: &str, table: &mut Table) -> ReplAction {
    match MetaCommand::from(line) {
        MetaCommand::Exit => ReplAction::Exit,
        MetaCommand::Btree => match table.dump_tree() {
            Ok(tree) => {
                let mut lines = vec!["Tree:".to_string()];
                lines.extend(tree);
                ReplAction::Output(lines)
            }
            Err(e) => ReplAction::Output(vec![report(&e)]),
        },
        MetaCommand::Constants => ReplAction::Output(constants()),
        MetaCommand::Unrecognized => {
            ReplAction::Output(vec![format!("Unrecognized command '{}'.", line)])
        }
    }
}

fn constants() -> Vec<String> {
    vec![
        "Constants:".to_string(),
        format!("ROW_SIZE: {}", ROW_SIZE),
        format!("COMMON_NODE_HEADER_SIZE: {}", COMMON_NODE_HEADER_SIZE),
        format!("LEAF_NODE_HEADER_SIZE: {}", LEAF_NODE_HEADER_SIZE),
        format!("LEAF_NODE_CELL_SIZE: {}", LEAF_NODE_CELL_SIZE),
        format!("LEAF_NODE_SPACE_FOR_CELLS: {}", LEAF_NODE_SPACE_FOR_CELLS),
        format!("LEAF_NODE_MAX_CELLS: {}", LEAF_NODE_MAX_CELLS),
    ]
}

fn report(e: &DbError) -> String {
    if let DbError::InternalConsistency(_) | DbError::Io(_) | DbError::Corrupt(_) = e {
        error!("statement aborted: {}", e);
    }
    describe_error(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn output(action: ReplAction) -> Vec<String> {
        match action {
            ReplAction::Output(lines) => lines,
            ReplAction::Exit => panic!("unexpected exit"),
        }
    }

    #[test]
    fn exit_command() {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path()).unwrap();
        assert_eq!(process_line(".exit", &mut table), ReplAction::Exit);
    }

    #[test]
    fn unrecognized_meta_command() {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path()).unwrap();
        assert_eq!(
            output(process_line(".foo", &mut table)),
            vec!["Unrecognized command '.foo'."]
        );
    }

    #[test]
    fn btree_command_prefixes_tree() {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path()).unwrap();
        for id in [3, 1, 2] {
            process_line(&format!("insert {} user{} person{}@example.com", id, id, id), &mut table);
        }
        assert_eq!(
            output(process_line(".btree", &mut table)),
            vec!["Tree:", "- leaf (size 3)", "  - 1", "  - 2", "  - 3"]
        );
    }

    #[test]
    fn constants_command() {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path()).unwrap();
        assert_eq!(
            output(process_line(".constants", &mut table)),
            vec![
                "Constants:",
                "ROW_SIZE: 291",
                "COMMON_NODE_HEADER_SIZE: 6",
                "LEAF_NODE_HEADER_SIZE: 14",
                "LEAF_NODE_CELL_SIZE: 295",
                "LEAF_NODE_SPACE_FOR_CELLS: 4082",
                "LEAF_NODE_MAX_CELLS: 13",
            ]
        );
    }

    #[test]
    fn statement_errors_are_single_lines() {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path()).unwrap();
        assert_eq!(
            output(process_line("insert 1 a", &mut table)),
            vec!["Error: Could not parse statement."]
        );
        assert_eq!(
            output(process_line("insert -1 a b", &mut table)),
            vec!["Error: ID must be positive."]
        );
        assert_eq!(
            output(process_line("delete 1", &mut table)),
            vec!["Error: Unrecognized keyword at start of 'delete 1'."]
        );
        assert_eq!(
            output(process_line("insert 1 a b", &mut table)),
            vec!["Executed."]
        );
        assert_eq!(
            output(process_line("insert 1 a b", &mut table)),
            vec!["Error: Duplicate key."]
        );
    }
}
