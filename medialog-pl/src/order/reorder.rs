//! Reorder resolution for drag gestures
//!
//! A gesture names the dragged id and the id it was dropped onto. Both
//! resolve to blocks of the current view: within one series block only the
//! members trade places, otherwise whole blocks move. The result is always
//! a permutation of the input scope order.

use super::blocks::{block_index, Block, BlockKey};
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

/// Prefix of drag ids that stand for a whole series block
pub const SERIES_HANDLE_PREFIX: &str = "series-handle:";

/// Identifier carried by a drag gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragId {
    Item(Uuid),
    /// Handle of the block of one series
    SeriesHandle(Uuid),
}

impl DragId {
    fn block_key(&self, index: &HashMap<Uuid, BlockKey>, blocks: &[Block]) -> Option<BlockKey> {
        match self {
            DragId::Item(id) => index.get(id).copied(),
            DragId::SeriesHandle(series_id) => {
                let key = BlockKey::Series(*series_id);
                blocks.iter().any(|b| b.key() == key).then_some(key)
            }
        }
    }
}

impl FromStr for DragId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parsed = match s.strip_prefix(SERIES_HANDLE_PREFIX) {
            Some(series) => DragId::SeriesHandle(Uuid::parse_str(series)?),
            None => DragId::Item(Uuid::parse_str(s)?),
        };
        Ok(parsed)
    }
}

impl fmt::Display for DragId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DragId::Item(id) => write!(f, "{}", id),
            DragId::SeriesHandle(id) => write!(f, "{}{}", SERIES_HANDLE_PREFIX, id),
        }
    }
}

/// Outcome of resolving a gesture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reorder {
    /// Nothing to persist
    Unchanged,
    /// New flat order for the scope
    Moved(Vec<Uuid>),
}

/// Remove the element at `from` and insert it at `to`
///
/// Moving forward lands the element right after the one that was at `to`;
/// moving backward lands it right before.
pub fn array_move<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from == to || from >= items.len() || to >= items.len() {
        return;
    }
    let element = items.remove(from);
    items.insert(to, element);
}

/// Compute the scope order that results from dropping `moved` onto `target`
///
/// `blocks` must be the grouping of the same view `scope_order` belongs to.
/// Unknown ids, and a series handle dropped onto one of its own members,
/// leave the order unchanged.
pub fn compute_reorder(
    scope_order: &[Uuid],
    blocks: &[Block],
    moved: &DragId,
    target: &DragId,
) -> Reorder {
    if moved == target {
        return Reorder::Unchanged;
    }

    let index = block_index(blocks);
    let (Some(active_key), Some(over_key)) = (
        moved.block_key(&index, blocks),
        target.block_key(&index, blocks),
    ) else {
        debug!("Drag of {} onto {} does not resolve to visible blocks", moved, target);
        return Reorder::Unchanged;
    };

    let next = if active_key == over_key {
        let (DragId::Item(moved_id), DragId::Item(target_id)) = (moved, target) else {
            return Reorder::Unchanged;
        };
        let Some(block) = blocks.iter().find(|b| b.key() == active_key) else {
            return Reorder::Unchanged;
        };
        match move_within_block(scope_order, block.item_ids(), *moved_id, *target_id) {
            Some(next) => next,
            None => return Reorder::Unchanged,
        }
    } else {
        match move_block(scope_order, blocks, active_key, over_key) {
            Some(next) => next,
            None => return Reorder::Unchanged,
        }
    };

    if next == scope_order {
        Reorder::Unchanged
    } else {
        Reorder::Moved(next)
    }
}

/// Reorder members of one block, keeping the absolute slots the block
/// occupies in the scope order
fn move_within_block(
    scope_order: &[Uuid],
    members: &[Uuid],
    moved_id: Uuid,
    target_id: Uuid,
) -> Option<Vec<Uuid>> {
    let old_index = members.iter().position(|id| *id == moved_id)?;
    let new_index = members.iter().position(|id| *id == target_id)?;

    let mut reordered = members.to_vec();
    array_move(&mut reordered, old_index, new_index);

    let member_set: HashSet<Uuid> = members.iter().copied().collect();
    let in_scope: HashSet<Uuid> = scope_order.iter().copied().collect();

    let slots = scope_order
        .iter()
        .enumerate()
        .filter(|(_, id)| member_set.contains(id))
        .map(|(slot, _)| slot);
    let replacements = reordered.into_iter().filter(|id| in_scope.contains(id));

    let mut next = scope_order.to_vec();
    for (slot, id) in slots.zip(replacements) {
        next[slot] = id;
    }
    Some(next)
}

/// Move a whole block and flatten the block order back into item ids
///
/// Scope ids not covered by any block keep their relative order at the end.
fn move_block(
    scope_order: &[Uuid],
    blocks: &[Block],
    active_key: BlockKey,
    over_key: BlockKey,
) -> Option<Vec<Uuid>> {
    let mut keys: Vec<BlockKey> = blocks.iter().map(Block::key).collect();
    let old_index = keys.iter().position(|k| *k == active_key)?;
    let new_index = keys.iter().position(|k| *k == over_key)?;
    array_move(&mut keys, old_index, new_index);

    let by_key: HashMap<BlockKey, &Block> = blocks.iter().map(|b| (b.key(), b)).collect();
    let in_scope: HashSet<Uuid> = scope_order.iter().copied().collect();
    let mut placed: HashSet<Uuid> = HashSet::with_capacity(scope_order.len());
    let mut next = Vec::with_capacity(scope_order.len());

    for key in &keys {
        let Some(block) = by_key.get(key) else { continue };
        for id in block.item_ids() {
            if in_scope.contains(id) && placed.insert(*id) {
                next.push(*id);
            }
        }
    }

    for id in scope_order {
        if placed.insert(*id) {
            next.push(*id);
        }
    }

    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn sorted(mut v: Vec<Uuid>) -> Vec<Uuid> {
        v.sort();
        v
    }

    #[test]
    fn test_array_move_forward_and_backward() {
        let mut v = vec![1, 2, 3, 4];
        array_move(&mut v, 0, 2);
        assert_eq!(v, vec![2, 3, 1, 4]);

        let mut v = vec![1, 2, 3, 4];
        array_move(&mut v, 3, 1);
        assert_eq!(v, vec![1, 4, 2, 3]);
    }

    #[test]
    fn test_array_move_out_of_range_is_noop() {
        let mut v = vec![1, 2];
        array_move(&mut v, 0, 5);
        assert_eq!(v, vec![1, 2]);
    }

    #[test]
    fn test_drag_id_parse_and_display() {
        let id = Uuid::new_v4();
        let handle: DragId = format!("series-handle:{}", id).parse().unwrap();
        assert_eq!(handle, DragId::SeriesHandle(id));
        assert_eq!(handle.to_string(), format!("series-handle:{}", id));

        let item: DragId = id.to_string().parse().unwrap();
        assert_eq!(item, DragId::Item(id));

        assert!("series-handle:nope".parse::<DragId>().is_err());
    }

    #[test]
    fn test_intra_series_move_keeps_block_slots() {
        // [X, A, B, C, Y] with series {A, B, C}; move C onto A
        let v = ids(5);
        let (x, a, b, c, y) = (v[0], v[1], v[2], v[3], v[4]);
        let s = Uuid::new_v4();
        let blocks = vec![
            Block::Single { item_id: x },
            Block::Series { series_id: s, item_ids: vec![a, b, c] },
            Block::Single { item_id: y },
        ];

        let result = compute_reorder(&v, &blocks, &DragId::Item(c), &DragId::Item(a));
        assert_eq!(result, Reorder::Moved(vec![x, c, a, b, y]));
    }

    #[test]
    fn test_intra_series_move_with_scattered_slots() {
        // Series members not contiguous in the flat order keep their slots
        let v = ids(4);
        let (a, x, b, c) = (v[0], v[1], v[2], v[3]);
        let s = Uuid::new_v4();
        let blocks = vec![
            Block::Series { series_id: s, item_ids: vec![a, b, c] },
            Block::Single { item_id: x },
        ];

        let result = compute_reorder(&v, &blocks, &DragId::Item(a), &DragId::Item(c));
        assert_eq!(result, Reorder::Moved(vec![b, x, c, a]));
    }

    #[test]
    fn test_cross_block_handle_move() {
        // [S1={A,B}, C, S2={D,E}]; drag S2's handle onto C
        let v = ids(5);
        let (a, b, c, d, e) = (v[0], v[1], v[2], v[3], v[4]);
        let (s1, s2) = (Uuid::new_v4(), Uuid::new_v4());
        let blocks = vec![
            Block::Series { series_id: s1, item_ids: vec![a, b] },
            Block::Single { item_id: c },
            Block::Series { series_id: s2, item_ids: vec![d, e] },
        ];

        let result = compute_reorder(&v, &blocks, &DragId::SeriesHandle(s2), &DragId::Item(c));
        assert_eq!(result, Reorder::Moved(vec![a, b, d, e, c]));
    }

    #[test]
    fn test_series_member_dragged_onto_other_block_moves_whole_series() {
        let v = ids(3);
        let (a, b, c) = (v[0], v[1], v[2]);
        let s = Uuid::new_v4();
        let blocks = vec![
            Block::Series { series_id: s, item_ids: vec![a, b] },
            Block::Single { item_id: c },
        ];

        let result = compute_reorder(&v, &blocks, &DragId::Item(b), &DragId::Item(c));
        assert_eq!(result, Reorder::Moved(vec![c, a, b]));
    }

    #[test]
    fn test_move_to_first_and_last_position() {
        let v = ids(4);
        let blocks: Vec<Block> = v.iter().map(|id| Block::Single { item_id: *id }).collect();

        let to_first = compute_reorder(&v, &blocks, &DragId::Item(v[3]), &DragId::Item(v[0]));
        assert_eq!(to_first, Reorder::Moved(vec![v[3], v[0], v[1], v[2]]));

        let to_last = compute_reorder(&v, &blocks, &DragId::Item(v[0]), &DragId::Item(v[3]));
        assert_eq!(to_last, Reorder::Moved(vec![v[1], v[2], v[3], v[0]]));
    }

    #[test]
    fn test_self_drop_is_unchanged() {
        let v = ids(2);
        let blocks: Vec<Block> = v.iter().map(|id| Block::Single { item_id: *id }).collect();
        assert_eq!(
            compute_reorder(&v, &blocks, &DragId::Item(v[0]), &DragId::Item(v[0])),
            Reorder::Unchanged
        );
    }

    #[test]
    fn test_single_item_scope_is_unchanged() {
        let v = ids(1);
        let blocks = vec![Block::Single { item_id: v[0] }];
        let stranger = Uuid::new_v4();
        assert_eq!(
            compute_reorder(&v, &blocks, &DragId::Item(v[0]), &DragId::Item(stranger)),
            Reorder::Unchanged
        );
    }

    #[test]
    fn test_handle_onto_own_member_is_unchanged() {
        let v = ids(2);
        let s = Uuid::new_v4();
        let blocks = vec![Block::Series { series_id: s, item_ids: v.clone() }];
        assert_eq!(
            compute_reorder(&v, &blocks, &DragId::SeriesHandle(s), &DragId::Item(v[1])),
            Reorder::Unchanged
        );
    }

    #[test]
    fn test_unknown_handle_is_unchanged() {
        let v = ids(2);
        let blocks: Vec<Block> = v.iter().map(|id| Block::Single { item_id: *id }).collect();
        assert_eq!(
            compute_reorder(&v, &blocks, &DragId::SeriesHandle(Uuid::new_v4()), &DragId::Item(v[1])),
            Reorder::Unchanged
        );
    }

    #[test]
    fn test_scope_ids_outside_blocks_are_kept() {
        let v = ids(4);
        let (a, b, c, hidden) = (v[0], v[1], v[2], v[3]);
        let blocks = vec![
            Block::Single { item_id: a },
            Block::Single { item_id: b },
            Block::Single { item_id: c },
        ];

        let Reorder::Moved(next) = compute_reorder(&v, &blocks, &DragId::Item(c), &DragId::Item(a))
        else {
            panic!("expected a move");
        };
        assert_eq!(next, vec![c, a, b, hidden]);
    }

    #[test]
    fn test_every_pairwise_gesture_is_a_permutation() {
        let v = ids(7);
        let (s1, s2) = (Uuid::new_v4(), Uuid::new_v4());
        let blocks = vec![
            Block::Series { series_id: s1, item_ids: vec![v[0], v[2]] },
            Block::Single { item_id: v[1] },
            Block::Series { series_id: s2, item_ids: vec![v[3], v[4], v[6]] },
            Block::Single { item_id: v[5] },
        ];

        let mut drags: Vec<DragId> = v.iter().map(|id| DragId::Item(*id)).collect();
        drags.push(DragId::SeriesHandle(s1));
        drags.push(DragId::SeriesHandle(s2));

        for moved in &drags {
            for target in &drags {
                if let Reorder::Moved(next) = compute_reorder(&v, &blocks, moved, target) {
                    assert_eq!(next.len(), v.len(), "{} onto {}", moved, target);
                    assert_eq!(sorted(next), sorted(v.clone()), "{} onto {}", moved, target);
                }
            }
        }
    }
}
