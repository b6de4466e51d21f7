use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};

/// Ordered lists with constant time access at both ends.
#[derive(Default)]
pub struct Lists {
    keys: RwLock<HashMap<String, VecDeque<Bytes>>>,
}

impl Lists {
    /// Pushes each value onto the front in argument order, so the last one ends up first.
    /// Returns the new length.
    pub fn push_front(&self, key: &str, values: Vec<Bytes>) -> usize {
        let mut state = self.keys.write();
        let list = state.entry(key.to_string()).or_default();
        for value in values {
            list.push_front(value);
        }
        list.len()
    }

    pub fn push_back(&self, key: &str, values: Vec<Bytes>) -> usize {
        let mut state = self.keys.write();
        let list = state.entry(key.to_string()).or_default();
        list.extend(values);
        list.len()
    }

    pub fn pop_front(&self, key: &str) -> Option<Bytes> {
        self.pop_with(key, VecDeque::pop_front)
    }

    pub fn pop_back(&self, key: &str) -> Option<Bytes> {
        self.pop_with(key, VecDeque::pop_back)
    }

    fn pop_with(
        &self,
        key: &str,
        pop: fn(&mut VecDeque<Bytes>) -> Option<Bytes>,
    ) -> Option<Bytes> {
        let mut state = self.keys.write();
        let list = state.get_mut(key)?;
        let value = pop(list);
        if list.is_empty() {
            state.remove(key);
        }
        value
    }

    pub fn len(&self, key: &str) -> usize {
        self.keys.read().get(key).map_or(0, VecDeque::len)
    }

    /// The element at a 0-based `index`; negative indices count from the end.
    pub fn index(&self, key: &str, index: i64) -> Option<Bytes> {
        let state = self.keys.read();
        let list = state.get(key)?;
        let index = resolve(index, list.len())?;
        list.get(index).cloned()
    }

    /// Elements in the half-open range `[start, stop)`. Negative indices count from the end and
    /// both bounds are clamped to the list.
    pub fn range(&self, key: &str, start: i64, stop: i64) -> Vec<Bytes> {
        let state = self.keys.read();
        let Some(list) = state.get(key) else {
            return vec![];
        };

        let len = list.len();
        let start = clamp(start, len);
        let stop = clamp(stop, len);
        if start >= stop {
            return vec![];
        }

        list.range(start..stop).cloned().collect()
    }

    /// Replaces the element at `index`. An index at or beyond the end appends the value at the
    /// tail instead, creating the list if needed. Negative indices count from the end, and one
    /// that reaches before the head pushes the value at the front.
    pub fn set(&self, key: &str, index: i64, value: Bytes) {
        let mut state = self.keys.write();
        let list = state.entry(key.to_string()).or_default();

        match resolve(index, list.len()) {
            Some(i) if i < list.len() => list[i] = value,
            _ if index < 0 => list.push_front(value),
            _ => list.push_back(value),
        }
    }

    /// Deletes the whole list, returning how many elements it held.
    pub fn remove(&self, key: &str) -> usize {
        self.keys.write().remove(key).map_or(0, |list| list.len())
    }

    pub(crate) fn clear(&self) {
        self.keys.write().clear();
    }
}

/// Resolves a possibly negative index against `len`, `None` when it points before the start.
fn resolve(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        usize::try_from(index).ok()
    } else {
        let back = usize::try_from(index.unsigned_abs()).ok()?;
        len.checked_sub(back)
    }
}

fn clamp(index: i64, len: usize) -> usize {
    resolve(index, len).unwrap_or(0).min(len)
}
