use crate::error::{consistency, Result};
use crate::node::*;
use crate::pager::Pager;
use crate::table::Table;

impl Table {
    /// Structural dump of the tree, one line per node, separator key and leaf key.
    pub fn dump_tree(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        let root_page_num = self.root_page_num();
        print_tree(&mut self.pager, root_page_num, 0, &mut lines)?;
        Ok(lines)
    }
}

fn indent(level: usize) -> String {
    "  ".repeat(level)
}

fn print_tree(
    pager: &mut Pager,
    page_num: u32,
    indentation_level: usize,
    lines: &mut Vec<String>,
) -> Result<()> {
    // Every level of a well-formed tree uses at least one page.
    if indentation_level >= pager.num_pages() as usize {
        return Err(consistency!(
            "tree below page {} is deeper than the file has pages",
            page_num
        ));
    }
    let node = pager.get_page(page_num)?;

    match node_type(node)? {
        NodeType::Leaf => {
            let num_cells = leaf_node_num_cells(node);
            lines.push(format!(
                "{}- leaf (size {})",
                indent(indentation_level),
                num_cells
            ));
            for i in 0..num_cells {
                lines.push(format!(
                    "{}- {}",
                    indent(indentation_level + 1),
                    leaf_node_key(node, i)
                ));
            }
        }
        NodeType::Internal => {
            let entries = InternalEntries::read(node)?;
            if entries.children.contains(&page_num) {
                return Err(consistency!(
                    "internal node {} lists itself as a child",
                    page_num
                ));
            }
            lines.push(format!(
                "{}- internal (size {})",
                indent(indentation_level),
                entries.keys.len()
            ));
            for (i, key) in entries.keys.iter().enumerate() {
                print_tree(pager, entries.children[i], indentation_level + 1, lines)?;
                lines.push(format!("{}- key {}", indent(indentation_level + 1), key));
            }
            if let Some(&right_child) = entries.children.last() {
                print_tree(pager, right_child, indentation_level + 1, lines)?;
            }
        }
    }

    Ok(())
}
