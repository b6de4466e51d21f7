use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Unordered collections of unique members.
#[derive(Default)]
pub struct Sets {
    keys: RwLock<HashMap<String, HashSet<String>>>,
}

impl Sets {
    /// Adds members to the set at `key`, returning how many were not already present.
    pub fn add(&self, key: &str, members: Vec<String>) -> usize {
        let mut state = self.keys.write();
        let set = state.entry(key.to_string()).or_default();
        members
            .into_iter()
            .filter(|member| set.insert(member.clone()))
            .count()
    }

    pub fn card(&self, key: &str) -> usize {
        self.keys.read().get(key).map_or(0, HashSet::len)
    }

    pub fn is_member(&self, key: &str, member: &str) -> bool {
        self.keys
            .read()
            .get(key)
            .is_some_and(|set| set.contains(member))
    }

    pub fn members(&self, key: &str) -> Vec<String> {
        self.keys
            .read()
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Members of `first` that are not in `second`.
    pub fn diff(&self, first: &str, second: &str) -> Vec<String> {
        self.combine(first, second, |a, b| a.difference(b).cloned().collect())
    }

    pub fn inter(&self, first: &str, second: &str) -> Vec<String> {
        self.combine(first, second, |a, b| a.intersection(b).cloned().collect())
    }

    pub fn union(&self, first: &str, second: &str) -> Vec<String> {
        self.combine(first, second, |a, b| a.union(b).cloned().collect())
    }

    fn combine<F>(&self, first: &str, second: &str, op: F) -> Vec<String>
    where
        F: FnOnce(&HashSet<String>, &HashSet<String>) -> Vec<String>,
    {
        let empty = HashSet::new();
        let state = self.keys.read();
        let a = state.get(first).unwrap_or(&empty);
        let b = state.get(second).unwrap_or(&empty);
        op(a, b)
    }

    /// Removes members, dropping the set once empty. Returns how many members were removed.
    pub fn remove(&self, key: &str, members: &[String]) -> usize {
        let mut state = self.keys.write();
        let Some(set) = state.get_mut(key) else {
            return 0;
        };

        let removed = members
            .iter()
            .filter(|member| set.remove(member.as_str()))
            .count();

        if set.is_empty() {
            state.remove(key);
        }

        removed
    }

    pub(crate) fn clear(&self) {
        self.keys.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sorted(mut items: Vec<String>) -> Vec<String> {
        items.sort();
        items
    }

    fn fixture() -> Sets {
        let sets = Sets::default();
        sets.add("s1", members(&["a", "b", "c"]));
        sets.add("s2", members(&["b", "c", "d"]));
        sets
    }

    #[test]
    fn add_counts_new_members() {
        let sets = Sets::default();

        assert_eq!(sets.add("s", members(&["a", "b", "a"])), 2);
        assert_eq!(sets.add("s", members(&["b", "c"])), 1);
        assert_eq!(sets.card("s"), 3);
    }

    #[test]
    fn algebra() {
        let sets = fixture();

        assert_eq!(sorted(sets.inter("s1", "s2")), members(&["b", "c"]));
        assert_eq!(sets.diff("s1", "s2"), members(&["a"]));
        assert_eq!(sorted(sets.union("s1", "s2")), members(&["a", "b", "c", "d"]));
    }

    #[test]
    fn algebra_with_missing_set() {
        let sets = fixture();

        assert_eq!(sorted(sets.diff("s1", "missing")), members(&["a", "b", "c"]));
        assert!(sets.inter("s1", "missing").is_empty());
        assert_eq!(sorted(sets.union("missing", "s2")), members(&["b", "c", "d"]));
    }

    #[test]
    fn membership() {
        let sets = fixture();

        assert!(sets.is_member("s1", "a"));
        assert!(!sets.is_member("s1", "d"));
        assert!(!sets.is_member("missing", "a"));
        assert_eq!(sorted(sets.members("s2")), members(&["b", "c", "d"]));
        assert!(sets.members("missing").is_empty());
    }

    #[test]
    fn remove_drops_empty_sets() {
        let sets = fixture();

        assert_eq!(sets.remove("s1", &members(&["a", "z"])), 1);
        assert_eq!(sets.remove("s1", &members(&["b", "c"])), 2);
        assert_eq!(sets.card("s1"), 0);
        assert!(sets.keys.read().get("s1").is_none());
    }
}
