use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

type Fields = HashMap<String, Bytes>;

/// Per-key field/value maps.
#[derive(Default)]
pub struct Hashes {
    keys: RwLock<HashMap<String, Fields>>,
}

impl Hashes {
    /// Sets `field` in the hash at `key`. Returns `true` if the field did not exist before.
    pub fn set(&self, key: &str, field: String, value: Bytes) -> bool {
        self.keys
            .write()
            .entry(key.to_string())
            .or_default()
            .insert(field, value)
            .is_none()
    }

    pub fn set_many(&self, key: &str, pairs: Vec<(String, Bytes)>) {
        let mut state = self.keys.write();
        let fields = state.entry(key.to_string()).or_default();
        for (field, value) in pairs {
            fields.insert(field, value);
        }
    }

    pub fn get(&self, key: &str, field: &str) -> Option<Bytes> {
        self.keys
            .read()
            .get(key)
            .and_then(|fields| fields.get(field).cloned())
    }

    pub fn get_many(&self, key: &str, fields: &[String]) -> Vec<Option<Bytes>> {
        let state = self.keys.read();
        let hash = state.get(key);
        fields
            .iter()
            .map(|field| hash.and_then(|h| h.get(field).cloned()))
            .collect()
    }

    /// Removes the given fields, dropping the hash once it is empty. Returns how many fields
    /// were removed.
    pub fn remove(&self, key: &str, fields: &[String]) -> usize {
        let mut state = self.keys.write();
        let Some(hash) = state.get_mut(key) else {
            return 0;
        };

        let removed = fields
            .iter()
            .filter(|field| hash.remove(field.as_str()).is_some())
            .count();

        if hash.is_empty() {
            state.remove(key);
        }

        removed
    }

    pub fn exists(&self, key: &str, field: &str) -> bool {
        self.keys
            .read()
            .get(key)
            .is_some_and(|fields| fields.contains_key(field))
    }

    pub fn get_all(&self, key: &str) -> Vec<(String, Bytes)> {
        self.keys
            .read()
            .get(key)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(field, value)| (field.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn keys(&self, key: &str) -> Vec<String> {
        self.keys
            .read()
            .get(key)
            .map(|fields| fields.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn values(&self, key: &str) -> Vec<Bytes> {
        self.keys
            .read()
            .get(key)
            .map(|fields| fields.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, key: &str) -> usize {
        self.keys.read().get(key).map_or(0, HashMap::len)
    }

    pub(crate) fn clear(&self) {
        self.keys.write().clear();
    }
}
