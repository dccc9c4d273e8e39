//! Collapse retrieved fragments to unique uuids.

use crate::types::Identified;
use std::collections::HashMap;

/// Keep one item per uuid; a later duplicate replaces an earlier one.
///
/// Duplicates are the same store row fetched twice, so which copy survives
/// does not matter. Output keeps the position of each uuid's first
/// occurrence; callers must not rely on it before reranking.
pub fn dedup_by_uuid<T: Identified>(items: Vec<T>) -> Vec<T> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(items.len());
    let mut unique: Vec<T> = Vec::with_capacity(items.len());

    for item in items {
        match positions.get(item.uuid()) {
            Some(&pos) => unique[pos] = item,
            None => {
                positions.insert(item.uuid().to_string(), unique.len());
                unique.push(item);
            }
        }
    }

    unique
}
