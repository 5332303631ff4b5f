use crate::constants::NO_SIBLING;
use crate::error::{consistency, Result};
use crate::node::*;
use crate::row::Row;
use crate::table::Table;

/// A position in the leaf level of the tree.
pub struct Cursor<'a> {
    table: &'a mut Table,
    page_num: u32,
    cell_num: usize,
    end_of_table: bool,
    leaves_visited: u32,
}

impl Table {
    /// Cursor at the smallest key, found by following the left-most child
    /// pointers down from the root.
    pub fn start(&mut self) -> Result<Cursor<'_>> {
        let mut page_num = self.root_page_num();

        for _ in 0..=self.pager.num_pages() {
            let node = self.pager.get_page(page_num)?;
            match node_type(node)? {
                NodeType::Internal => {
                    let child = internal_node_child(node, 0)?;
                    if child == page_num {
                        return Err(consistency!(
                            "internal node {} lists itself as a child",
                            page_num
                        ));
                    }
                    page_num = child;
                }
                NodeType::Leaf => {
                    let end_of_table = leaf_node_num_cells(node) == 0;
                    return Ok(Cursor {
                        table: self,
                        page_num,
                        cell_num: 0,
                        end_of_table,
                        leaves_visited: 1,
                    });
                }
            }
        }

        Err(consistency!("descent to the first leaf never reached a leaf"))
    }

    /// All rows in ascending key order, read lazily leaf by leaf.
    pub fn scan(&mut self) -> Result<Scan<'_>> {
        Ok(Scan {
            cursor: self.start()?,
        })
    }
}

impl Cursor<'_> {
    pub fn end_of_table(&self) -> bool {
        self.end_of_table
    }

    pub fn value(&mut self) -> Result<Row> {
        let node = self.table.pager.get_page(self.page_num)?;
        Row::decode(leaf_node_value(node, self.cell_num))
    }

    /// Moves to the next cell, crossing into the next leaf when this one is
    /// exhausted.
    pub fn advance(&mut self) -> Result<()> {
        let (num_cells, next_page_num) = {
            let node = self.table.pager.get_page(self.page_num)?;
            (leaf_node_num_cells(node), leaf_node_next_leaf(node))
        };

        self.cell_num += 1;
        if self.cell_num < num_cells {
            return Ok(());
        }
        if next_page_num == NO_SIBLING {
            self.end_of_table = true;
            return Ok(());
        }

        // A chained leaf is never page 0, so a sound chain has fewer leaves than
        // the file has pages.
        self.leaves_visited += 1;
        if next_page_num == self.page_num || self.leaves_visited >= self.table.num_pages() {
            return Err(consistency!(
                "leaf chain loops back at page {} after {} leaves",
                next_page_num,
                self.leaves_visited
            ));
        }
        self.page_num = next_page_num;
        self.cell_num = 0;
        Ok(())
    }
}

/// Single pass over the table. Stops after the first error.
pub struct Scan<'a> {
    cursor: Cursor<'a>,
}

impl Iterator for Scan<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.end_of_table {
            return None;
        }

        let row = self.cursor.value().and_then(|row| {
            self.cursor.advance()?;
            Ok(row)
        });
        if row.is_err() {
            self.cursor.end_of_table = true;
        }
        Some(row)
    }
}
