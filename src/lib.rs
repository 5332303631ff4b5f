//! A single-table database stored as a B+tree of 4096-byte pages in one file.
//!
//! Rows are `(id, username, email)` records keyed by their positive id. The
//! engine supports inserting rows, reading them back in key order, point
//! lookups and a structural dump of the tree.

pub mod config;
pub mod constants;
pub mod cursor;
pub mod error;
pub mod executor;
pub mod node;
pub mod pager;
pub mod parser;
pub mod printer;
pub mod repl;
pub mod row;
pub mod table;
pub mod verify;

pub use config::TableConfig;
pub use cursor::{Cursor, Scan};
pub use error::{DbError, Result, RowError};
pub use executor::Statement;
pub use row::Row;
pub use table::Table;
pub use verify::TreeShape;
