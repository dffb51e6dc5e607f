use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use inbox_types::Message;

/// One step of a list update. Indices refer to the list as it stands after
/// every previous op has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOp<T> {
    Remove { index: usize },
    Insert { index: usize, item: T },
    /// Take the item at `from` out, then put it back at `to`.
    Move { from: usize, to: usize },
    Update { index: usize, item: T },
}

impl<T> ListOp<T> {
    /// Convert the carried items, keeping positions.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> ListOp<U> {
        match self {
            Self::Remove { index } => ListOp::Remove { index },
            Self::Insert { index, item } => ListOp::Insert { index, item: f(item) },
            Self::Move { from, to } => ListOp::Move { from, to },
            Self::Update { index, item } => ListOp::Update { index, item: f(item) },
        }
    }
}

/// Apply `ops` in order. Panics on an out-of-range index, which means the
/// ops were computed against a different list.
pub fn apply_ops<T>(list: &mut Vec<T>, ops: impl IntoIterator<Item = ListOp<T>>) {
    for op in ops {
        match op {
            ListOp::Remove { index } => {
                list.remove(index);
            }
            ListOp::Insert { index, item } => list.insert(index, item),
            ListOp::Move { from, to } => {
                let item = list.remove(from);
                list.insert(to, item);
            }
            ListOp::Update { index, item } => list[index] = item,
        }
    }
}

/// Reconcile two message lists using `(user_name, content, timestamp)` identity.
pub fn diff(old: &[Message], new: &[Message]) -> Vec<ListOp<Message>> {
    diff_by(old, new, Message::key)
}

/// Compute ops turning `old` into `new`, matching items by `key` and
/// comparing matched items with `==`.
pub fn diff_by<T, K, F>(old: &[T], new: &[T], key: F) -> Vec<ListOp<T>>
where
    T: Clone + PartialEq,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    diff_with(old, new, key, |a, b| a == b)
}

/// Compute ops turning `old` into `new`.
///
/// Items are matched by `key`. The longest common subsequence of keys stays
/// in place; leftover old and new items sharing a key become moves, the rest
/// removals and insertions. Matched items for which `same` is false get an
/// update.
pub fn diff_with<T, K, F, E>(old: &[T], new: &[T], key: F, same: E) -> Vec<ListOp<T>>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
    E: Fn(&T, &T) -> bool,
{
    let old_keys: Vec<K> = old.iter().map(&key).collect();
    let new_keys: Vec<K> = new.iter().map(&key).collect();

    // source[j] = old index that becomes new[j], if any
    let mut source: Vec<Option<usize>> = vec![None; new.len()];
    let mut kept = vec![false; old.len()];
    let mut anchored = vec![false; new.len()];
    for (i, j) in common_subsequence(&old_keys, &new_keys) {
        source[j] = Some(i);
        kept[i] = true;
        anchored[j] = true;
    }

    // Leftovers with a matching key become moves, first come first served
    let mut leftovers: HashMap<&K, VecDeque<usize>> = HashMap::new();
    for (i, k) in old_keys.iter().enumerate() {
        if !kept[i] {
            leftovers.entry(k).or_default().push_back(i);
        }
    }
    for (j, k) in new_keys.iter().enumerate() {
        if source[j].is_none() {
            if let Some(i) = leftovers.get_mut(k).and_then(VecDeque::pop_front) {
                source[j] = Some(i);
                kept[i] = true;
            }
        }
    }

    let mut ops = Vec::new();

    // Removals back to front so earlier indices stay valid
    for i in (0..old.len()).rev() {
        if !kept[i] {
            ops.push(ListOp::Remove { index: i });
        }
    }

    let mut slots: Vec<Slot> = (0..old.len())
        .filter(|&i| kept[i])
        .map(Slot::Old)
        .collect();

    // Place every non-anchored new item right after its predecessor. Anchored
    // items already appear in the right relative order.
    for j in 0..new.len() {
        if anchored[j] {
            continue;
        }
        let to = if j == 0 {
            0
        } else {
            let before = slot_for(&source, j - 1);
            position(&slots, before) + 1
        };

        match source[j] {
            Some(i) => {
                let from = position(&slots, Slot::Old(i));
                let slot = slots.remove(from);
                // `to` was measured with the item still present
                let to = if from < to { to - 1 } else { to };
                slots.insert(to, slot);
                if from != to {
                    ops.push(ListOp::Move { from, to });
                }
            }
            None => {
                slots.insert(to, Slot::New(j));
                ops.push(ListOp::Insert {
                    index: to,
                    item: new[j].clone(),
                });
            }
        }
    }

    for (j, item) in new.iter().enumerate() {
        if let Some(i) = source[j] {
            if !same(&old[i], item) {
                ops.push(ListOp::Update {
                    index: j,
                    item: item.clone(),
                });
            }
        }
    }

    ops
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Old(usize),
    New(usize),
}

fn slot_for(source: &[Option<usize>], j: usize) -> Slot {
    match source[j] {
        Some(i) => Slot::Old(i),
        None => Slot::New(j),
    }
}

fn position(slots: &[Slot], slot: Slot) -> usize {
    slots
        .iter()
        .position(|s| *s == slot)
        .unwrap_or_else(|| unreachable!("{:?} missing from working list", slot))
}

/// Myers' greedy LCS. Returns matched `(old, new)` index pairs in ascending order.
fn common_subsequence<K: Eq>(a: &[K], b: &[K]) -> Vec<(usize, usize)> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = (n + m) as usize;
    if max == 0 {
        return Vec::new();
    }

    let offset = max as isize + 1;
    let mut v = vec![0isize; 2 * max + 3];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'search: for d in 0..=max as isize {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    // Walk the recorded frontiers backwards, collecting diagonal moves
    let mut pairs = Vec::new();
    let (mut x, mut y) = (n, m);
    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let prev_k = if k == -d || (k != d && v[(k - 1 + offset) as usize] < v[(k + 1 + offset) as usize]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[(prev_k + offset) as usize];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            x -= 1;
            y -= 1;
            pairs.push((x as usize, y as usize));
        }
        if d > 0 {
            x = prev_x;
            y = prev_y;
        }
    }
    pairs.reverse();
    pairs
}
