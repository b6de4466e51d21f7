use bytes::{Bytes, BytesMut};
use parking_lot::RwLock;
use std::collections::HashMap;

use super::StoreError;

/// Plain string values. Integers live here too, as their decimal text.
#[derive(Default)]
pub struct Strings {
    keys: RwLock<HashMap<String, Bytes>>,
}

impl Strings {
    pub fn set(&self, key: String, value: Bytes) {
        self.keys.write().insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.keys.read().get(key).cloned()
    }

    /// Removes the given keys and returns how many of them existed.
    pub fn remove(&self, keys: &[String]) -> usize {
        let mut state = self.keys.write();
        keys.iter()
            .filter(|key| state.remove(key.as_str()).is_some())
            .count()
    }

    pub fn exists(&self, key: &str) -> bool {
        self.keys.read().contains_key(key)
    }

    /// Adds `delta` to the integer stored at `key`, treating a missing key as zero, and returns
    /// the new value. The stored value is left untouched on error.
    pub fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let mut state = self.keys.write();

        let current = match state.get(key) {
            Some(value) => std::str::from_utf8(value)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or(StoreError::NotInteger)?,
            None => 0,
        };

        let value = current.checked_add(delta).ok_or(StoreError::Overflow)?;
        state.insert(key.to_string(), Bytes::from(value.to_string()));

        Ok(value)
    }

    /// Appends to the value at `key`, creating it when missing. Returns the new length.
    pub fn append(&self, key: &str, suffix: &[u8]) -> usize {
        let mut state = self.keys.write();

        let value = match state.get(key) {
            Some(existing) => {
                let mut buf = BytesMut::with_capacity(existing.len() + suffix.len());
                buf.extend_from_slice(existing);
                buf.extend_from_slice(suffix);
                buf.freeze()
            }
            None => Bytes::copy_from_slice(suffix),
        };

        let len = value.len();
        state.insert(key.to_string(), value);
        len
    }

    pub fn set_many(&self, pairs: Vec<(String, Bytes)>) {
        let mut state = self.keys.write();
        for (key, value) in pairs {
            state.insert(key, value);
        }
    }

    pub fn get_many(&self, keys: &[String]) -> Vec<Option<Bytes>> {
        let state = self.keys.read();
        keys.iter().map(|key| state.get(key).cloned()).collect()
    }

    pub(crate) fn clear(&self) {
        self.keys.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let strings = Strings::default();

        strings.set("key1".to_string(), Bytes::from("value1"));

        assert_eq!(strings.get("key1"), Some(Bytes::from("value1")));
        assert_eq!(strings.get("missing"), None);
    }

    #[test]
    fn remove_counts_existing_keys() {
        let strings = Strings::default();
        strings.set("a".to_string(), Bytes::from("1"));
        strings.set("b".to_string(), Bytes::from("2"));

        let removed = strings.remove(&["a".to_string(), "c".to_string()]);

        assert_eq!(removed, 1);
        assert!(!strings.exists("a"));
        assert!(strings.exists("b"));
    }

    #[test]
    fn incr_by_missing_key_starts_at_zero() {
        let strings = Strings::default();

        assert_eq!(strings.incr_by("counter", 5), Ok(5));
        assert_eq!(strings.incr_by("counter", -7), Ok(-2));
        assert_eq!(strings.get("counter"), Some(Bytes::from("-2")));
    }

    #[test]
    fn incr_by_non_integer() {
        let strings = Strings::default();
        strings.set("key1".to_string(), Bytes::from("value"));

        assert_eq!(strings.incr_by("key1", 1), Err(StoreError::NotInteger));
        assert_eq!(strings.get("key1"), Some(Bytes::from("value")));
    }

    #[test]
    fn incr_by_out_of_range_value() {
        let strings = Strings::default();
        strings.set("key1".to_string(), Bytes::from("999223372036854775808"));

        assert_eq!(strings.incr_by("key1", 1), Err(StoreError::NotInteger));
    }

    #[test]
    fn incr_by_overflow() {
        let strings = Strings::default();
        strings.set("key1".to_string(), Bytes::from(i64::MAX.to_string()));

        assert_eq!(strings.incr_by("key1", 1), Err(StoreError::Overflow));
        assert_eq!(
            strings.get("key1"),
            Some(Bytes::from(i64::MAX.to_string()))
        );
    }

    #[test]
    fn append_creates_and_extends() {
        let strings = Strings::default();

        assert_eq!(strings.append("key1", b"Hello"), 5);
        assert_eq!(strings.append("key1", b", World"), 12);
        assert_eq!(strings.get("key1"), Some(Bytes::from("Hello, World")));
    }

    #[test]
    fn set_many_and_get_many() {
        let strings = Strings::default();

        strings.set_many(vec![
            ("a".to_string(), Bytes::from("1")),
            ("b".to_string(), Bytes::from("2")),
        ]);

        assert_eq!(
            strings.get_many(&["a".to_string(), "x".to_string(), "b".to_string()]),
            vec![Some(Bytes::from("1")), None, Some(Bytes::from("2"))]
        );
    }
}
