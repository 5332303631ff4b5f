use std::path::Path;

use log::{debug, info};

use crate::config::TableConfig;
use crate::constants::*;
use crate::error::{consistency, DbError, Result};
use crate::node::*;
use crate::pager::{Page, Pager};
use crate::row::Row;

/// The single table: a B+tree keyed by row id whose root always lives on page 0.
pub struct Table {
    pub(crate) pager: Pager,
    root_page_num: u32,
    config: TableConfig,
}

impl Table {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, TableConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(path: P, config: TableConfig) -> Result<Self> {
        let mut pager = Pager::open(path)?;

        if pager.num_pages() == 0 {
            // New database file: page 0 becomes an empty root leaf.
            let root_page_num = pager.allocate_page()?;
            let root_node = pager.get_page(root_page_num)?;
            initialize_leaf_node(root_node);
            set_node_root(root_node, true);
        }

        let mut table = Table {
            pager,
            root_page_num: ROOT_PAGE_NUM,
            config,
        };

        // Capacities are not stored in the file, so nodes written under larger
        // ones have to be caught here.
        if config != TableConfig::default() {
            table.validate()?;
        }
        Ok(table)
    }

    /// Writes every cached page back to disk.
    pub fn close(mut self) -> Result<()> {
        self.pager.flush_all()?;
        info!("table closed");
        Ok(())
    }

    pub fn root_page_num(&self) -> u32 {
        self.root_page_num
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn num_pages(&self) -> u32 {
        self.pager.num_pages()
    }

    /// Descends from the root to the leaf that holds, or would hold, `key`.
    /// Returns the leaf's page number and the cell index for `key` in it.
    pub fn find_leaf(&mut self, key: u32) -> Result<(u32, usize)> {
        let mut page_num = self.root_page_num;

        // A well-formed tree is never deeper than it has pages.
        for _ in 0..=self.pager.num_pages() {
            let node = self.pager.get_page(page_num)?;
            match node_type(node)? {
                NodeType::Leaf => return Ok((page_num, leaf_node_find_cell(node, key))),
                NodeType::Internal => {
                    let child_index = internal_node_find_child(node, key);
                    let child = internal_node_child(node, child_index)?;
                    if child == page_num {
                        return Err(consistency!(
                            "internal node {} lists itself as a child",
                            page_num
                        ));
                    }
                    page_num = child;
                }
            }
        }

        Err(consistency!("descent for key {} never reached a leaf", key))
    }

    pub fn find(&mut self, key: u32) -> Result<Row> {
        let (page_num, cell_num) = self.find_leaf(key)?;
        let node = self.pager.get_page(page_num)?;

        if cell_num < leaf_node_num_cells(node) && leaf_node_key(node, cell_num) == key {
            Row::decode(leaf_node_value(node, cell_num))
        } else {
            Err(DbError::NotFound(key))
        }
    }

    pub fn insert(&mut self, row: &Row) -> Result<()> {
        let value = row.encode()?;
        let key = row.key();

        let (page_num, cell_num) = self.find_leaf(key)?;
        let node = self.pager.get_page(page_num)?;
        let num_cells = leaf_node_num_cells(node);

        if cell_num < num_cells && leaf_node_key(node, cell_num) == key {
            return Err(DbError::DuplicateKey(key));
        }

        if num_cells >= self.config.leaf_max_cells() {
            return self.leaf_node_split_and_insert(page_num, cell_num, key, &value);
        }

        // Make room for the new cell.
        node.copy_within(
            leaf_node_cell_offset(cell_num)..leaf_node_cell_offset(num_cells),
            leaf_node_cell_offset(cell_num + 1),
        );
        write_leaf_node_cell(node, cell_num, key, &value);
        set_leaf_node_num_cells(node, num_cells + 1);
        Ok(())
    }

    fn leaf_node_split_and_insert(
        &mut self,
        old_page_num: u32,
        cell_num: usize,
        key: u32,
        value: &[u8],
    ) -> Result<()> {
        let (mut cells, parent_page_num, old_next_leaf) = {
            let old_node = self.pager.get_page(old_page_num)?;
            let cells: Vec<Vec<u8>> = (0..leaf_node_num_cells(old_node))
                .map(|i| leaf_node_cell(old_node, i).to_vec())
                .collect();
            (cells, node_parent(old_node), leaf_node_next_leaf(old_node))
        };

        let mut new_cell = vec![0u8; LEAF_NODE_CELL_SIZE];
        new_cell[LEAF_NODE_KEY_OFFSET..LEAF_NODE_KEY_OFFSET + LEAF_NODE_KEY_SIZE]
            .copy_from_slice(&key.to_le_bytes());
        new_cell[LEAF_NODE_VALUE_OFFSET..].copy_from_slice(value);
        cells.insert(cell_num, new_cell);

        let left_count = leaf_node_left_split_count(cells.len());
        let new_page_num = self.pager.allocate_page()?;

        {
            let new_node = self.pager.get_page(new_page_num)?;
            initialize_leaf_node(new_node);
            set_node_parent(new_node, parent_page_num);
            set_leaf_node_next_leaf(new_node, old_next_leaf);
            for (i, cell) in cells[left_count..].iter().enumerate() {
                leaf_node_cell_mut(new_node, i).copy_from_slice(cell);
            }
            set_leaf_node_num_cells(new_node, cells.len() - left_count);
        }

        let separator = {
            let old_node = self.pager.get_page(old_page_num)?;
            for (i, cell) in cells[..left_count].iter().enumerate() {
                leaf_node_cell_mut(old_node, i).copy_from_slice(cell);
            }
            set_leaf_node_num_cells(old_node, left_count);
            set_leaf_node_next_leaf(old_node, new_page_num);
            leaf_node_key(old_node, left_count - 1)
        };

        debug!(
            "split leaf {} ({} cells) / {} ({} cells) at key {}",
            old_page_num,
            left_count,
            new_page_num,
            cells.len() - left_count,
            separator
        );

        self.insert_into_parent(old_page_num, separator, new_page_num)
    }

    /// Climbs from a freshly split node towards the root, inserting the
    /// separator for each split into the parent. Stops once a parent has room,
    /// or promotes a new root when the split reaches the top.
    fn insert_into_parent(&mut self, left: u32, key: u32, right: u32) -> Result<()> {
        let (mut left, mut key, mut right) = (left, key, right);

        loop {
            let (is_root, parent_page_num) = {
                let node = self.pager.get_page(left)?;
                (is_node_root(node), node_parent(node))
            };

            if is_root != (left == self.root_page_num) {
                return Err(consistency!(
                    "page {} has root flag {} but the root is page {}",
                    left,
                    is_root,
                    self.root_page_num
                ));
            }

            if is_root {
                return self.create_new_root(key, right);
            }

            match self.internal_node_insert(parent_page_num, left, key, right)? {
                None => return Ok(()),
                Some((median, new_right)) => {
                    left = parent_page_num;
                    key = median;
                    right = new_right;
                }
            }
        }
    }

    /// Adds `(key, right)` to `parent` immediately after its child `left`.
    /// When `parent` overflows it is split; the promoted median and the new
    /// right-hand page are returned for the caller to push one level up.
    fn internal_node_insert(
        &mut self,
        parent_page_num: u32,
        left: u32,
        key: u32,
        right: u32,
    ) -> Result<Option<(u32, u32)>> {
        let (mut entries, grandparent) = {
            let parent = self.pager.get_page(parent_page_num)?;
            if node_type(parent)? != NodeType::Internal {
                return Err(consistency!(
                    "parent page {} of page {} is not an internal node",
                    parent_page_num,
                    left
                ));
            }
            (InternalEntries::read(parent)?, node_parent(parent))
        };

        let index = entries.keys.partition_point(|&k| k < key);
        if entries.children.get(index) != Some(&left) {
            return Err(consistency!(
                "page {} names parent {} but is not its child {}",
                left,
                parent_page_num,
                index
            ));
        }
        entries.keys.insert(index, key);
        entries.children.insert(index + 1, right);

        if entries.keys.len() <= self.config.internal_max_keys() {
            entries.write(self.pager.get_page(parent_page_num)?)?;
            set_node_parent(self.pager.get_page(right)?, parent_page_num);
            return Ok(None);
        }

        let (lower, median, upper) = entries.split()?;
        let new_page_num = self.pager.allocate_page()?;

        {
            let new_node = self.pager.get_page(new_page_num)?;
            initialize_internal_node(new_node);
            set_node_parent(new_node, grandparent);
            upper.write(new_node)?;
        }
        lower.write(self.pager.get_page(parent_page_num)?)?;

        // Every child that ended up on the new page has to point at it, not
        // just the one that triggered the split.
        for &child in &upper.children {
            set_node_parent(self.pager.get_page(child)?, new_page_num);
        }
        if lower.children.contains(&right) {
            set_node_parent(self.pager.get_page(right)?, parent_page_num);
        }

        debug!(
            "split internal {} ({} keys) / {} ({} keys), promoting {}",
            parent_page_num,
            lower.keys.len(),
            new_page_num,
            upper.keys.len(),
            median
        );

        Ok(Some((median, new_page_num)))
    }

    /// The root has split into itself and `right_child_page_num`. Its current
    /// contents move to a fresh page and the root page becomes an internal
    /// node over the two halves.
    fn create_new_root(&mut self, key: u32, right_child_page_num: u32) -> Result<()> {
        let root_page_num = self.root_page_num;
        let left_child_page_num = self.pager.allocate_page()?;

        let root_copy: Page = *self.pager.get_page(root_page_num)?;
        {
            let left_child = self.pager.get_page(left_child_page_num)?;
            left_child.copy_from_slice(&root_copy);
            set_node_root(left_child, false);
            set_node_parent(left_child, root_page_num);
        }

        if node_type(&root_copy)? == NodeType::Internal {
            for child in InternalEntries::read(&root_copy)?.children {
                set_node_parent(self.pager.get_page(child)?, left_child_page_num);
            }
        }

        set_node_parent(
            self.pager.get_page(right_child_page_num)?,
            root_page_num,
        );

        {
            let root = self.pager.get_page(root_page_num)?;
            initialize_internal_node(root);
            set_node_root(root, true);
            InternalEntries {
                keys: vec![key],
                children: vec![left_child_page_num, right_child_page_num],
            }
            .write(root)?;
        }

        debug!(
            "new root over pages {} and {} with key {}",
            left_child_page_num, right_child_page_num, key
        );
        Ok(())
    }
}
