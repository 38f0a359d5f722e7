//! Block grouping
//!
//! A block is either one unaffiliated item or every visible item of one
//! series. Blocks are a projection recomputed from the sorted visible items
//! on every view; they are never stored.

use super::ItemKey;
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// Stable identity of a block within one view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKey {
    Single(Uuid),
    Series(Uuid),
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKey::Single(id) => write!(f, "single:{}", id),
            BlockKey::Series(id) => write!(f, "series:{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Single { item_id: Uuid },
    /// Members listed in current scope order
    Series { series_id: Uuid, item_ids: Vec<Uuid> },
}

impl Block {
    pub fn key(&self) -> BlockKey {
        match self {
            Block::Single { item_id } => BlockKey::Single(*item_id),
            Block::Series { series_id, .. } => BlockKey::Series(*series_id),
        }
    }

    pub fn item_ids(&self) -> &[Uuid] {
        match self {
            Block::Single { item_id } => std::slice::from_ref(item_id),
            Block::Series { item_ids, .. } => item_ids,
        }
    }

    pub fn is_series(&self) -> bool {
        matches!(self, Block::Series { .. })
    }
}

/// Partition items (already sorted by scope position) into blocks
///
/// A series block takes the place of its first member in scan order and
/// collects every member of that series from `items`, keeping their
/// relative order. Only the given items are considered, so a series split
/// across categories never merges across a category filter.
pub fn group_blocks(items: &[ItemKey]) -> Vec<Block> {
    let mut members: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for item in items {
        if let Some(series_id) = item.series_id {
            members.entry(series_id).or_default().push(item.id);
        }
    }

    let mut emitted: HashSet<Uuid> = HashSet::new();
    let mut blocks = Vec::new();

    for item in items {
        match item.series_id {
            Some(series_id) => {
                if !emitted.insert(series_id) {
                    continue;
                }
                let item_ids = members.remove(&series_id).unwrap_or_default();
                blocks.push(Block::Series { series_id, item_ids });
            }
            None => blocks.push(Block::Single { item_id: item.id }),
        }
    }

    blocks
}

/// Item id to the key of the block containing it
pub fn block_index(blocks: &[Block]) -> HashMap<Uuid, BlockKey> {
    let mut index = HashMap::new();
    for block in blocks {
        let key = block.key();
        for id in block.item_ids() {
            index.insert(*id, key);
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn key(series_id: Option<Uuid>) -> ItemKey {
        ItemKey {
            id: Uuid::new_v4(),
            category_id: Uuid::nil(),
            series_id,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_series_block_sits_at_first_member() {
        let s = Uuid::new_v4();
        let x = key(None);
        let a = key(Some(s));
        let y = key(None);
        let b = key(Some(s));

        let blocks = group_blocks(&[x.clone(), a.clone(), y.clone(), b.clone()]);

        assert_eq!(
            blocks,
            vec![
                Block::Single { item_id: x.id },
                Block::Series { series_id: s, item_ids: vec![a.id, b.id] },
                Block::Single { item_id: y.id },
            ]
        );
    }

    #[test]
    fn test_every_item_in_exactly_one_block() {
        let (s1, s2) = (Uuid::new_v4(), Uuid::new_v4());
        let items = vec![
            key(Some(s2)),
            key(None),
            key(Some(s1)),
            key(Some(s2)),
            key(None),
            key(Some(s1)),
        ];
        let blocks = group_blocks(&items);

        let mut seen: Vec<Uuid> = blocks.iter().flat_map(|b| b.item_ids().to_vec()).collect();
        let mut expected: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        seen.sort();
        expected.sort();
        assert_eq!(seen, expected);
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].key(), BlockKey::Series(s2));
        assert_eq!(blocks[2].key(), BlockKey::Series(s1));
    }

    #[test]
    fn test_empty_input_yields_no_blocks() {
        assert!(group_blocks(&[]).is_empty());
    }

    #[test]
    fn test_block_index_maps_members() {
        let s = Uuid::new_v4();
        let a = key(Some(s));
        let b = key(Some(s));
        let c = key(None);
        let index = block_index(&group_blocks(&[a.clone(), c.clone(), b.clone()]));

        assert_eq!(index[&a.id], BlockKey::Series(s));
        assert_eq!(index[&b.id], BlockKey::Series(s));
        assert_eq!(index[&c.id], BlockKey::Single(c.id));
    }

    #[test]
    fn test_block_key_display() {
        let id = Uuid::nil();
        assert_eq!(
            BlockKey::Series(id).to_string(),
            "series:00000000-0000-0000-0000-000000000000"
        );
    }
}
