//! Byte layout of leaf and internal node pages.
//!
//! Every accessor works on a raw page buffer. Capacity and tree-level
//! invariants are the caller's business; the only checks made here are the
//! ones that would otherwise read garbage (unknown node tag, child index past
//! the right child, an unset right child).

use crate::constants::*;
use crate::error::{consistency, Result};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Internal = 0,
    Leaf = 1,
}

fn read_u32(node: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&node[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn write_u32(node: &mut [u8], offset: usize, value: u32) {
    node[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/* Common header */

pub fn node_type(node: &[u8]) -> Result<NodeType> {
    match node[NODE_TYPE_OFFSET] {
        0 => Ok(NodeType::Internal),
        1 => Ok(NodeType::Leaf),
        tag => Err(consistency!("unknown node type tag {}", tag)),
    }
}

pub fn set_node_type(node: &mut [u8], node_type: NodeType) {
    node[NODE_TYPE_OFFSET] = node_type as u8;
}

pub fn is_node_root(node: &[u8]) -> bool {
    node[IS_ROOT_OFFSET] != 0
}

pub fn set_node_root(node: &mut [u8], is_root: bool) {
    node[IS_ROOT_OFFSET] = is_root as u8;
}

pub fn node_parent(node: &[u8]) -> u32 {
    read_u32(node, PARENT_POINTER_OFFSET)
}

pub fn set_node_parent(node: &mut [u8], parent_page_num: u32) {
    write_u32(node, PARENT_POINTER_OFFSET, parent_page_num);
}

/* Leaf nodes */

pub fn initialize_leaf_node(node: &mut [u8]) {
    set_node_type(node, NodeType::Leaf);
    set_node_root(node, false);
    set_node_parent(node, 0);
    set_leaf_node_num_cells(node, 0);
    set_leaf_node_next_leaf(node, NO_SIBLING);
}

pub fn leaf_node_num_cells(node: &[u8]) -> usize {
    read_u32(node, LEAF_NODE_NUM_CELLS_OFFSET) as usize
}

pub fn set_leaf_node_num_cells(node: &mut [u8], num_cells: usize) {
    write_u32(node, LEAF_NODE_NUM_CELLS_OFFSET, num_cells as u32);
}

pub fn leaf_node_next_leaf(node: &[u8]) -> u32 {
    read_u32(node, LEAF_NODE_NEXT_LEAF_OFFSET)
}

pub fn set_leaf_node_next_leaf(node: &mut [u8], next_leaf: u32) {
    write_u32(node, LEAF_NODE_NEXT_LEAF_OFFSET, next_leaf);
}

pub fn leaf_node_cell_offset(cell_num: usize) -> usize {
    LEAF_NODE_HEADER_SIZE + cell_num * LEAF_NODE_CELL_SIZE
}

pub fn leaf_node_cell(node: &[u8], cell_num: usize) -> &[u8] {
    let offset = leaf_node_cell_offset(cell_num);
    &node[offset..offset + LEAF_NODE_CELL_SIZE]
}

pub fn leaf_node_cell_mut(node: &mut [u8], cell_num: usize) -> &mut [u8] {
    let offset = leaf_node_cell_offset(cell_num);
    &mut node[offset..offset + LEAF_NODE_CELL_SIZE]
}

pub fn leaf_node_key(node: &[u8], cell_num: usize) -> u32 {
    read_u32(node, leaf_node_cell_offset(cell_num) + LEAF_NODE_KEY_OFFSET)
}

pub fn leaf_node_value(node: &[u8], cell_num: usize) -> &[u8] {
    let offset = leaf_node_cell_offset(cell_num) + LEAF_NODE_VALUE_OFFSET;
    &node[offset..offset + LEAF_NODE_VALUE_SIZE]
}

/// Writes a full cell (key followed by the encoded row) into slot `cell_num`.
pub fn write_leaf_node_cell(node: &mut [u8], cell_num: usize, key: u32, value: &[u8]) {
    let cell = leaf_node_cell_mut(node, cell_num);
    cell[LEAF_NODE_KEY_OFFSET..LEAF_NODE_KEY_OFFSET + LEAF_NODE_KEY_SIZE]
        .copy_from_slice(&key.to_le_bytes());
    cell[LEAF_NODE_VALUE_OFFSET..].copy_from_slice(value);
}

/// Index of `key` if present, otherwise the index it would be inserted at.
pub fn leaf_node_find_cell(node: &[u8], key: u32) -> usize {
    let mut min_index = 0;
    let mut one_past_max_index = leaf_node_num_cells(node);

    while min_index != one_past_max_index {
        let index = (min_index + one_past_max_index) / 2;
        let key_at_index = leaf_node_key(node, index);

        if key == key_at_index {
            return index;
        } else if key < key_at_index {
            one_past_max_index = index;
        } else {
            min_index = index + 1;
        }
    }

    min_index
}

/* Internal nodes */

pub fn initialize_internal_node(node: &mut [u8]) {
    set_node_type(node, NodeType::Internal);
    set_node_root(node, false);
    set_node_parent(node, 0);
    set_internal_node_num_keys(node, 0);
    set_internal_node_right_child(node, INVALID_PAGE_NUM);
}

pub fn internal_node_num_keys(node: &[u8]) -> usize {
    read_u32(node, INTERNAL_NODE_NUM_KEYS_OFFSET) as usize
}

pub fn set_internal_node_num_keys(node: &mut [u8], num_keys: usize) {
    write_u32(node, INTERNAL_NODE_NUM_KEYS_OFFSET, num_keys as u32);
}

pub fn internal_node_right_child(node: &[u8]) -> u32 {
    read_u32(node, INTERNAL_NODE_RIGHT_CHILD_OFFSET)
}

pub fn set_internal_node_right_child(node: &mut [u8], page_num: u32) {
    write_u32(node, INTERNAL_NODE_RIGHT_CHILD_OFFSET, page_num);
}

pub fn internal_node_cell_offset(cell_num: usize) -> usize {
    INTERNAL_NODE_HEADER_SIZE + cell_num * INTERNAL_NODE_CELL_SIZE
}

/// Child `child_num`, where `child_num == num_keys` names the right child.
pub fn internal_node_child(node: &[u8], child_num: usize) -> Result<u32> {
    let num_keys = internal_node_num_keys(node);

    let child = if child_num > num_keys {
        return Err(consistency!(
            "tried to access child {} > num_keys {}",
            child_num,
            num_keys
        ));
    } else if child_num == num_keys {
        internal_node_right_child(node)
    } else {
        read_u32(node, internal_node_cell_offset(child_num))
    };

    if child == INVALID_PAGE_NUM {
        return Err(consistency!(
            "child {} of internal node is an invalid page",
            child_num
        ));
    }
    Ok(child)
}

pub fn set_internal_node_child(node: &mut [u8], child_num: usize, page_num: u32) {
    if child_num == internal_node_num_keys(node) {
        set_internal_node_right_child(node, page_num);
    } else {
        write_u32(node, internal_node_cell_offset(child_num), page_num);
    }
}

pub fn internal_node_key(node: &[u8], key_num: usize) -> u32 {
    read_u32(node, internal_node_cell_offset(key_num) + INTERNAL_NODE_KEY_OFFSET)
}

pub fn set_internal_node_key(node: &mut [u8], key_num: usize, key: u32) {
    write_u32(
        node,
        internal_node_cell_offset(key_num) + INTERNAL_NODE_KEY_OFFSET,
        key,
    );
}

/// Index of the child whose subtree may contain `key`: the smallest `i` with
/// `key <= key_i`, or `num_keys` (the right child) if there is none.
pub fn internal_node_find_child(node: &[u8], key: u32) -> usize {
    let mut left = 0;
    let mut right = internal_node_num_keys(node);

    while left != right {
        let mid = (left + right) / 2;
        if key <= internal_node_key(node, mid) {
            right = mid;
        } else {
            left = mid + 1;
        }
    }

    left
}

/// Cells kept by the left leaf when `total` cells are split. The left side
/// takes the extra cell when `total` is odd.
pub fn leaf_node_left_split_count(total: usize) -> usize {
    (total + 1) / 2
}

/// Keys and children of an internal node, lifted out of the page so they can
/// be rearranged during a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalEntries {
    pub keys: Vec<u32>,
    pub children: Vec<u32>,
}

impl InternalEntries {
    pub fn read(node: &[u8]) -> Result<Self> {
        let num_keys = internal_node_num_keys(node);
        let keys = (0..num_keys).map(|i| internal_node_key(node, i)).collect();
        let children = (0..=num_keys)
            .map(|i| internal_node_child(node, i))
            .collect::<Result<Vec<_>>>()?;
        Ok(InternalEntries { keys, children })
    }

    /// Overwrites the node's key count, cells and right child. Header fields
    /// other than the key count are left alone.
    pub fn write(&self, node: &mut [u8]) -> Result<()> {
        if self.children.len() != self.keys.len() + 1 {
            return Err(consistency!(
                "{} keys need {} children, got {}",
                self.keys.len(),
                self.keys.len() + 1,
                self.children.len()
            ));
        }

        set_internal_node_num_keys(node, self.keys.len());
        for (i, &key) in self.keys.iter().enumerate() {
            set_internal_node_child(node, i, self.children[i]);
            set_internal_node_key(node, i, key);
        }
        set_internal_node_right_child(node, self.children[self.keys.len()]);
        Ok(())
    }

    /// Splits around the middle key. Returns the lower half, the median key
    /// to promote, and the upper half. The median is in neither half.
    pub fn split(mut self) -> Result<(InternalEntries, u32, InternalEntries)> {
        if self.children.len() != self.keys.len() + 1 {
            return Err(consistency!(
                "cannot split {} keys with {} children",
                self.keys.len(),
                self.children.len()
            ));
        }

        let mid = self.keys.len() / 2;
        let upper_keys = self.keys.split_off((mid + 1).min(self.keys.len()));
        let median = self
            .keys
            .pop()
            .ok_or_else(|| consistency!("cannot split an internal node without keys"))?;
        let upper_children = self.children.split_off(mid + 1);

        let upper = InternalEntries {
            keys: upper_keys,
            children: upper_children,
        };
        Ok((self, median, upper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;

    fn blank_page() -> [u8; PAGE_SIZE] {
        [0u8; PAGE_SIZE]
    }

    #[test]
    fn common_header_round_trips() {
        let mut page = blank_page();
        initialize_leaf_node(&mut page);
        set_node_root(&mut page, true);
        set_node_parent(&mut page, 77);

        assert_eq!(node_type(&page).unwrap(), NodeType::Leaf);
        assert!(is_node_root(&page));
        assert_eq!(node_parent(&page), 77);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut page = blank_page();
        page[NODE_TYPE_OFFSET] = 9;
        assert!(matches!(
            node_type(&page),
            Err(DbError::InternalConsistency(_))
        ));
    }

    #[test]
    fn leaf_cells_and_binary_search() {
        let mut page = blank_page();
        initialize_leaf_node(&mut page);
        let value = [7u8; LEAF_NODE_VALUE_SIZE];
        for (i, key) in [10, 20, 30].into_iter().enumerate() {
            write_leaf_node_cell(&mut page, i, key, &value);
        }
        set_leaf_node_num_cells(&mut page, 3);

        assert_eq!(leaf_node_key(&page, 1), 20);
        assert_eq!(leaf_node_value(&page, 2), &value[..]);
        assert_eq!(leaf_node_find_cell(&page, 5), 0);
        assert_eq!(leaf_node_find_cell(&page, 20), 1);
        assert_eq!(leaf_node_find_cell(&page, 25), 2);
        assert_eq!(leaf_node_find_cell(&page, 31), 3);
    }

    #[test]
    fn leaf_split_counts_follow_cell_count() {
        assert_eq!(leaf_node_left_split_count(LEAF_NODE_MAX_CELLS + 1), 7);
        assert_eq!(leaf_node_left_split_count(5), 3);
        assert_eq!(leaf_node_left_split_count(3), 2);
    }

    #[test]
    fn fresh_internal_node_has_no_right_child() {
        let mut page = blank_page();
        initialize_internal_node(&mut page);
        assert!(matches!(
            internal_node_child(&page, 0),
            Err(DbError::InternalConsistency(_))
        ));
    }

    #[test]
    fn internal_children_interleave_with_keys() {
        let mut page = blank_page();
        initialize_internal_node(&mut page);
        let entries = InternalEntries {
            keys: vec![5, 9],
            children: vec![1, 2, 3],
        };
        entries.write(&mut page).unwrap();

        assert_eq!(internal_node_num_keys(&page), 2);
        assert_eq!(internal_node_child(&page, 0).unwrap(), 1);
        assert_eq!(internal_node_child(&page, 2).unwrap(), 3);
        assert_eq!(internal_node_right_child(&page), 3);
        assert!(internal_node_child(&page, 3).is_err());
        assert_eq!(InternalEntries::read(&page).unwrap(), entries);
    }

    #[test]
    fn find_child_routes_ties_left() {
        let mut page = blank_page();
        initialize_internal_node(&mut page);
        InternalEntries {
            keys: vec![5, 9],
            children: vec![1, 2, 3],
        }
        .write(&mut page)
        .unwrap();

        assert_eq!(internal_node_find_child(&page, 1), 0);
        assert_eq!(internal_node_find_child(&page, 5), 0);
        assert_eq!(internal_node_find_child(&page, 6), 1);
        assert_eq!(internal_node_find_child(&page, 9), 1);
        assert_eq!(internal_node_find_child(&page, 10), 2);
    }

    #[test]
    fn split_promotes_median() {
        let entries = InternalEntries {
            keys: vec![10, 20, 30, 40],
            children: vec![1, 2, 3, 4, 5],
        };
        let (lower, median, upper) = entries.split().unwrap();

        assert_eq!(median, 30);
        assert_eq!(lower.keys, vec![10, 20]);
        assert_eq!(lower.children, vec![1, 2, 3]);
        assert_eq!(upper.keys, vec![40]);
        assert_eq!(upper.children, vec![4, 5]);
    }

    #[test]
    fn split_of_three_keys_is_even() {
        let entries = InternalEntries {
            keys: vec![10, 20, 30],
            children: vec![1, 2, 3, 4],
        };
        let (lower, median, upper) = entries.split().unwrap();

        assert_eq!(median, 20);
        assert_eq!(lower.keys, vec![10]);
        assert_eq!(lower.children, vec![1, 2]);
        assert_eq!(upper.keys, vec![30]);
        assert_eq!(upper.children, vec![3, 4]);
    }

    #[test]
    fn mismatched_entries_are_rejected() {
        let mut page = blank_page();
        initialize_internal_node(&mut page);
        let entries = InternalEntries {
            keys: vec![5],
            children: vec![1],
        };
        assert!(entries.write(&mut page).is_err());
    }
}
