//! Pure splice arithmetic shared by every reorder front end.

/// Destination index for a row dragged from `from_ix` and dropped onto the
/// row at `target_ix`. Dropping onto a row below lands after it, onto a row
/// above lands before it, so the dragged row always ends up at `target_ix`.
pub fn drop_on_row_index(from_ix: usize, target_ix: usize, item_count: usize) -> usize {
    let gap_index = if target_ix < from_ix {
        target_ix
    } else if target_ix > from_ix {
        target_ix.saturating_add(1)
    } else {
        from_ix
    };

    index_from_gap(from_ix, gap_index, item_count)
}

/// Destination index for a 1-based typed position, or `None` when the
/// position is outside `[1, item_count]`.
pub fn index_for_position(position: usize, item_count: usize) -> Option<usize> {
    if position == 0 || position > item_count {
        return None;
    }
    Some(position - 1)
}

fn index_from_gap(from_ix: usize, gap_index: usize, item_count: usize) -> usize {
    let mut to_ix = gap_index;
    if to_ix > from_ix {
        to_ix = to_ix.saturating_sub(1);
    }
    to_ix.min(item_count.saturating_sub(1))
}

/// Remove the element at `from` and reinsert it at `to`. Returns false (and
/// leaves `items` untouched) for out-of-range indices.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    let len = items.len();
    if from >= len || to >= len {
        return false;
    }
    if from != to {
        let item = items.remove(from);
        items.insert(to, item);
    }
    true
}

/// Copy of `items` with the element at `from` moved to `to`
pub fn moved<T: Clone>(items: &[T], from: usize, to: usize) -> Option<Vec<T>> {
    let mut out = items.to_vec();
    move_item(&mut out, from, to).then_some(out)
}

/// Write a reordered subsequence back into `full` while keeping every element
/// that is not part of the subsequence in its slot.
///
/// `visible` is the new order of the elements of `full` for which `is_visible`
/// holds; hidden elements (for example rows pending undo) keep their absolute
/// positions.
pub fn merge_visible_order<T: Clone + PartialEq>(
    full: &[T],
    visible: &[T],
    is_visible: impl Fn(&T) -> bool,
) -> Vec<T> {
    let mut next_visible = visible.iter();
    full.iter()
        .map(|item| {
            if is_visible(item) {
                next_visible.next().cloned().unwrap_or_else(|| item.clone())
            } else {
                item.clone()
            }
        })
        .collect()
}
