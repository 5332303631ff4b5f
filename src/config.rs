use crate::constants::{INTERNAL_NODE_MAX_KEYS, LEAF_NODE_MAX_CELLS, MIN_NODE_CAPACITY};
use crate::error::{consistency, Result};

/// Node capacities used by the tree. The page format is the same whatever the
/// capacities; lowering them only makes nodes split earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConfig {
    leaf_max_cells: usize,
    internal_max_keys: usize,
}

impl TableConfig {
    pub fn new(leaf_max_cells: usize, internal_max_keys: usize) -> Result<Self> {
        if !(MIN_NODE_CAPACITY..=LEAF_NODE_MAX_CELLS).contains(&leaf_max_cells) {
            return Err(consistency!(
                "leaf capacity {} outside {}..={}",
                leaf_max_cells,
                MIN_NODE_CAPACITY,
                LEAF_NODE_MAX_CELLS
            ));
        }
        if !(MIN_NODE_CAPACITY..=INTERNAL_NODE_MAX_KEYS).contains(&internal_max_keys) {
            return Err(consistency!(
                "internal capacity {} outside {}..={}",
                internal_max_keys,
                MIN_NODE_CAPACITY,
                INTERNAL_NODE_MAX_KEYS
            ));
        }
        Ok(Self {
            leaf_max_cells,
            internal_max_keys,
        })
    }

    pub fn leaf_max_cells(&self) -> usize {
        self.leaf_max_cells
    }

    pub fn internal_max_keys(&self) -> usize {
        self.internal_max_keys
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            leaf_max_cells: LEAF_NODE_MAX_CELLS,
            internal_max_keys: INTERNAL_NODE_MAX_KEYS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;

    #[test]
    fn default_uses_layout_capacities() {
        let config = TableConfig::default();
        assert_eq!(config.leaf_max_cells(), LEAF_NODE_MAX_CELLS);
        assert_eq!(config.internal_max_keys(), INTERNAL_NODE_MAX_KEYS);
    }

    #[test]
    fn rejects_out_of_range_capacities() {
        assert!(matches!(
            TableConfig::new(1, 3),
            Err(DbError::InternalConsistency(_))
        ));
        assert!(matches!(
            TableConfig::new(LEAF_NODE_MAX_CELLS + 1, 3),
            Err(DbError::InternalConsistency(_))
        ));
        assert!(matches!(
            TableConfig::new(4, INTERNAL_NODE_MAX_KEYS + 1),
            Err(DbError::InternalConsistency(_))
        ));
    }
}
