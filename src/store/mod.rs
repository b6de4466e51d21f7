mod hashes;
mod lists;
mod sets;
mod sorted_sets;
mod strings;

pub use hashes::Hashes;
pub use lists::Lists;
pub use sets::Sets;
pub use sorted_sets::SortedSets;
pub use strings::Strings;

use std::ops::Deref;
use std::sync::{Arc, OnceLock};
use thiserror::Error as ThisError;

/// Errors the keyspace engines report back to command handlers.
#[derive(Debug, ThisError, PartialEq)]
pub enum StoreError {
    #[error("value is not an integer or out of range")]
    NotInteger,
    #[error("increment or decrement would overflow")]
    Overflow,
    #[error("resulting score is not a number (NaN)")]
    NanScore,
}

/// The keyspace: one independent engine per data type.
///
/// Every engine guards its whole map with a single read-write lock, so commands against
/// different engines never contend with each other and no command ever holds two engine locks.
/// Engines are created on the first write against their type; until then reads observe an empty
/// engine. The store is cheap to clone and every clone points at the same data.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<Engines>,
}

impl Store {
    pub fn new() -> Store {
        Store::default()
    }
}

impl Deref for Store {
    type Target = Engines;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Default)]
pub struct Engines {
    strings: OnceLock<Strings>,
    hashes: OnceLock<Hashes>,
    lists: OnceLock<Lists>,
    sets: OnceLock<Sets>,
    sorted_sets: OnceLock<SortedSets>,
}

impl Engines {
    /// The string engine, if anything was ever written to it.
    pub fn strings(&self) -> Option<&Strings> {
        self.strings.get()
    }

    /// The string engine, created on first use.
    pub fn strings_mut(&self) -> &Strings {
        self.strings.get_or_init(Strings::default)
    }

    pub fn hashes(&self) -> Option<&Hashes> {
        self.hashes.get()
    }

    pub fn hashes_mut(&self) -> &Hashes {
        self.hashes.get_or_init(Hashes::default)
    }

    pub fn lists(&self) -> Option<&Lists> {
        self.lists.get()
    }

    pub fn lists_mut(&self) -> &Lists {
        self.lists.get_or_init(Lists::default)
    }

    pub fn sets(&self) -> Option<&Sets> {
        self.sets.get()
    }

    pub fn sets_mut(&self) -> &Sets {
        self.sets.get_or_init(Sets::default)
    }

    pub fn sorted_sets(&self) -> Option<&SortedSets> {
        self.sorted_sets.get()
    }

    pub fn sorted_sets_mut(&self) -> &SortedSets {
        self.sorted_sets.get_or_init(SortedSets::default)
    }

    /// Removes every key from every engine. Engines are cleared one after the other, each under
    /// its own lock.
    pub fn flush_all(&self) {
        if let Some(engine) = self.strings() {
            engine.clear();
        }
        if let Some(engine) = self.hashes() {
            engine.clear();
        }
        if let Some(engine) = self.lists() {
            engine.clear();
        }
        if let Some(engine) = self.sets() {
            engine.clear();
        }
        if let Some(engine) = self.sorted_sets() {
            engine.clear();
        }
    }
}
