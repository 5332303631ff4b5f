use crate::constants::NO_SIBLING;
use crate::error::{consistency, Result};
use crate::node::*;
use crate::table::Table;

/// Summary of a tree that passed `Table::validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeShape {
    /// Levels including the leaf level; a lone root leaf has height 1.
    pub height: usize,
    pub rows: usize,
    pub leaves: usize,
    pub internal_nodes: usize,
}

struct Walk {
    leaf_depth: Option<usize>,
    leaves: Vec<u32>,
    rows: usize,
    internal_nodes: usize,
}

impl Table {
    /// Walks the whole tree and checks parent pointers, key order, separator
    /// bounds, node capacities, uniform leaf depth and the leaf sibling chain.
    pub fn validate(&mut self) -> Result<TreeShape> {
        let mut walk = Walk {
            leaf_depth: None,
            leaves: Vec::new(),
            rows: 0,
            internal_nodes: 0,
        };

        let root_page_num = self.root_page_num();
        if !is_node_root(self.pager.get_page(root_page_num)?) {
            return Err(consistency!("root page {} is not flagged as root", root_page_num));
        }
        self.check_node(root_page_num, None, None, 1, &mut walk)?;

        for pair in walk.leaves.windows(2) {
            let next = leaf_node_next_leaf(self.pager.get_page(pair[0])?);
            if next != pair[1] {
                return Err(consistency!(
                    "leaf {} links to {} but the next leaf is {}",
                    pair[0],
                    next,
                    pair[1]
                ));
            }
        }
        if let Some(&last) = walk.leaves.last() {
            let next = leaf_node_next_leaf(self.pager.get_page(last)?);
            if next != NO_SIBLING {
                return Err(consistency!("last leaf {} links to {}", last, next));
            }
        }

        Ok(TreeShape {
            height: walk.leaf_depth.unwrap_or(1),
            rows: walk.rows,
            leaves: walk.leaves.len(),
            internal_nodes: walk.internal_nodes,
        })
    }

    /// Keys under `page_num` must lie in `(lower, upper]`.
    fn check_node(
        &mut self,
        page_num: u32,
        lower: Option<u32>,
        upper: Option<u32>,
        depth: usize,
        walk: &mut Walk,
    ) -> Result<()> {
        if depth > self.num_pages() as usize {
            return Err(consistency!("tree deeper than its page count at page {}", page_num));
        }

        let in_bounds =
            |key: u32| lower.map_or(true, |l| key > l) && upper.map_or(true, |u| key <= u);
        let config = *self.config();
        let node = self.pager.get_page(page_num)?;

        if depth > 1 && is_node_root(node) {
            return Err(consistency!("non-root page {} is flagged as root", page_num));
        }

        match node_type(node)? {
            NodeType::Leaf => {
                let num_cells = leaf_node_num_cells(node);
                if num_cells > config.leaf_max_cells() {
                    return Err(consistency!(
                        "leaf {} holds {} cells, capacity is {}",
                        page_num,
                        num_cells,
                        config.leaf_max_cells()
                    ));
                }
                if depth > 1 && num_cells == 0 {
                    return Err(consistency!("non-root leaf {} is empty", page_num));
                }

                let mut previous = None;
                for i in 0..num_cells {
                    let key = leaf_node_key(node, i);
                    if previous.is_some_and(|p| key <= p) || !in_bounds(key) {
                        return Err(consistency!(
                            "key {} out of order in leaf {}",
                            key,
                            page_num
                        ));
                    }
                    previous = Some(key);
                }

                match walk.leaf_depth {
                    None => walk.leaf_depth = Some(depth),
                    Some(d) if d != depth => {
                        return Err(consistency!(
                            "leaf {} at depth {}, other leaves at {}",
                            page_num,
                            depth,
                            d
                        ))
                    }
                    Some(_) => {}
                }
                walk.leaves.push(page_num);
                walk.rows += num_cells;
                Ok(())
            }
            NodeType::Internal => {
                let entries = InternalEntries::read(node)?;
                let num_keys = entries.keys.len();
                if num_keys == 0 || num_keys > config.internal_max_keys() {
                    return Err(consistency!(
                        "internal node {} holds {} keys, capacity is {}",
                        page_num,
                        num_keys,
                        config.internal_max_keys()
                    ));
                }
                if entries.keys.windows(2).any(|w| w[0] >= w[1])
                    || !entries.keys.iter().all(|&k| in_bounds(k))
                {
                    return Err(consistency!("keys out of order in internal node {}", page_num));
                }
                walk.internal_nodes += 1;

                for (i, &child) in entries.children.iter().enumerate() {
                    if child == page_num {
                        return Err(consistency!(
                            "internal node {} lists itself as a child",
                            page_num
                        ));
                    }
                    let parent = node_parent(self.pager.get_page(child)?);
                    if parent != page_num {
                        return Err(consistency!(
                            "page {} names parent {} but is a child of {}",
                            child,
                            parent,
                            page_num
                        ));
                    }

                    let child_lower = if i == 0 { lower } else { Some(entries.keys[i - 1]) };
                    let child_upper = if i == num_keys { upper } else { Some(entries.keys[i]) };
                    self.check_node(child, child_lower, child_upper, depth + 1, walk)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::TableConfig;
    use crate::error::DbError;
    use crate::node::*;
    use crate::row::Row;
    use crate::table::Table;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_table_shape() {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path()).unwrap();
        let shape = table.validate().unwrap();
        assert_eq!(shape.height, 1);
        assert_eq!(shape.rows, 0);
        assert_eq!(shape.leaves, 1);
        assert_eq!(shape.internal_nodes, 0);
    }

    #[test]
    fn counts_levels_and_nodes() {
        let file = NamedTempFile::new().unwrap();
        let mut table =
            Table::open_with_config(file.path(), TableConfig::new(2, 2).unwrap()).unwrap();
        for id in 1..=40 {
            table
                .insert(&Row::new(id, "u", "e"))
                .unwrap();
        }
        let shape = table.validate().unwrap();
        assert_eq!(shape.rows, 40);
        assert!(shape.height >= 4);
        assert!(shape.internal_nodes >= 1);
    }

    #[test]
    fn out_of_order_leaf_keys_are_reported() {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path()).unwrap();
        for id in 1..=3 {
            table.insert(&Row::new(id, "u", "e")).unwrap();
        }
        let root = table.pager.get_page(0).unwrap();
        let value = leaf_node_value(root, 0).to_vec();
        write_leaf_node_cell(root, 0, 9, &value);
        assert!(matches!(
            table.validate(),
            Err(DbError::InternalConsistency(_))
        ));
    }

    #[test]
    fn broken_sibling_chain_is_reported() {
        let file = NamedTempFile::new().unwrap();
        let mut table = Table::open(file.path()).unwrap();
        for id in 1..=14 {
            table.insert(&Row::new(id, "u", "e")).unwrap();
        }
        set_leaf_node_next_leaf(table.pager.get_page(2).unwrap(), 0);
        assert!(matches!(
            table.validate(),
            Err(DbError::InternalConsistency(_))
        ));
    }
}
