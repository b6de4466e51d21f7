use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use super::StoreError;

/// A score with a total order, so it can key a `BTreeMap`. `-0.0` is folded into `0.0`.
#[derive(Clone, Copy, Debug)]
struct Score(f64);

impl Score {
    fn new(score: f64) -> Self {
        Score(score + 0.0)
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Position of a member: its score, then the order in which it was first inserted.
type Rank = (Score, u64);

/// Members unique by name, ordered by ascending score with ties broken by insertion order.
#[derive(Debug, Default)]
pub(crate) struct SortedSet {
    members: HashMap<String, Rank>,
    ordered: BTreeMap<Rank, String>,
    inserted: u64,
}

impl SortedSet {
    /// Inserts `member` or moves it to `score`. Returns `true` if the member is new.
    ///
    /// A member that is only rescored keeps its original insertion order for tie breaking.
    pub fn insert(&mut self, member: String, score: f64) -> bool {
        let score = Score::new(score);

        match self.members.get_mut(&member) {
            Some(rank) => {
                if let Some(name) = self.ordered.remove(&*rank) {
                    rank.0 = score;
                    self.ordered.insert(*rank, name);
                }
                false
            }
            None => {
                let rank = (score, self.inserted);
                self.inserted += 1;
                self.ordered.insert(rank, member.clone());
                self.members.insert(member, rank);
                true
            }
        }
    }

    pub fn remove(&mut self, member: &str) -> bool {
        match self.members.remove(member) {
            Some(rank) => {
                self.ordered.remove(&rank);
                true
            }
            None => false,
        }
    }

    pub fn score(&self, member: &str) -> Option<f64> {
        self.members.get(member).map(|(score, _)| score.0)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// 0-based position of `member` in score order.
    pub fn rank(&self, member: &str) -> Option<usize> {
        let rank = self.members.get(member)?;
        Some(self.ordered.range(..*rank).count())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.ordered
            .iter()
            .map(|((score, _), member)| (member.as_str(), score.0))
    }

    /// Members whose score lies in `[min, max]`, in order.
    pub fn by_score(&self, min: f64, max: f64) -> impl Iterator<Item = (&str, f64)> + '_ {
        let (min, max) = (Score::new(min), Score::new(max));
        let bounds = if min <= max {
            Some((min, 0)..=(max, u64::MAX))
        } else {
            None
        };

        bounds
            .into_iter()
            .flat_map(|bounds| self.ordered.range(bounds))
            .map(|((score, _), member)| (member.as_str(), score.0))
    }
}

/// Per-key sorted sets.
#[derive(Default)]
pub struct SortedSets {
    keys: RwLock<HashMap<String, SortedSet>>,
}

impl SortedSets {
    /// Adds or rescores members, returning how many were newly added.
    pub fn add(&self, key: &str, entries: Vec<(f64, String)>) -> usize {
        let mut state = self.keys.write();
        let zset = state.entry(key.to_string()).or_default();
        entries
            .into_iter()
            .filter(|(score, member)| zset.insert(member.clone(), *score))
            .count()
    }

    pub fn card(&self, key: &str) -> usize {
        self.keys.read().get(key).map_or(0, SortedSet::len)
    }

    /// Number of members with a score in `[min, max]`.
    pub fn count(&self, key: &str, min: f64, max: f64) -> usize {
        self.keys
            .read()
            .get(key)
            .map_or(0, |zset| zset.by_score(min, max).count())
    }

    /// Adds `delta` to the score of `member`, creating it with a score of `delta` when missing.
    pub fn incr_by(&self, key: &str, delta: f64, member: &str) -> Result<f64, StoreError> {
        let mut state = self.keys.write();
        let zset = state.entry(key.to_string()).or_default();

        let score = zset.score(member).unwrap_or(0.0) + delta;
        if score.is_nan() {
            if zset.is_empty() {
                state.remove(key);
            }
            return Err(StoreError::NanScore);
        }

        zset.insert(member.to_string(), score);
        Ok(score)
    }

    /// Members between the ranks `start` and `stop`, both inclusive. Negative ranks count from
    /// the end, `-1` being the member with the highest score.
    pub fn range(&self, key: &str, start: i64, stop: i64) -> Vec<(String, f64)> {
        let state = self.keys.read();
        let Some(zset) = state.get(key) else {
            return vec![];
        };

        let len = zset.len() as i64;
        let start = if start < 0 { (len + start).max(0) } else { start };
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
        if start > stop || start >= len {
            return vec![];
        }

        zset.iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .map(|(member, score)| (member.to_string(), score))
            .collect()
    }

    pub fn range_by_score(&self, key: &str, min: f64, max: f64) -> Vec<(String, f64)> {
        self.keys
            .read()
            .get(key)
            .map(|zset| {
                zset.by_score(min, max)
                    .map(|(member, score)| (member.to_string(), score))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 1-based rank of `member` in ascending score order.
    pub fn rank(&self, key: &str, member: &str) -> Option<usize> {
        self.keys
            .read()
            .get(key)
            .and_then(|zset| zset.rank(member))
            .map(|rank| rank + 1)
    }

    /// Removes members, dropping the sorted set once empty. Returns how many were removed.
    pub fn remove(&self, key: &str, members: &[String]) -> usize {
        let mut state = self.keys.write();
        let Some(zset) = state.get_mut(key) else {
            return 0;
        };

        let removed = members.iter().filter(|member| zset.remove(member.as_str())).count();

        if zset.is_empty() {
            state.remove(key);
        }

        removed
    }

    pub(crate) fn clear(&self) {
        self.keys.write().clear();
    }
}
