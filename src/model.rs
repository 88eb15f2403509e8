use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// A resolved `KEY=VALUE` assignment from a `.env` file or input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    pub source: Option<PathBuf>,
    /// Line on which the assignment starts.
    pub line: u32,
}

/// Ordered mapping from key to value, one entry per key.
///
/// Assigning a key again replaces its value and moves it to the position of
/// the latest assignment, the same way a sourced shell script only ever
/// reflects the most recent binding.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentMap {
    /// Replaced entries leave a `None` slot until the next compaction.
    slots: Vec<Option<Entry>>,
    index: HashMap<String, usize>,
}

impl EnvironmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the value it replaced.
    pub fn insert(&mut self, entry: Entry) -> Option<String> {
        let previous = self
            .index
            .remove(&entry.key)
            .and_then(|idx| self.slots[idx].take())
            .map(|old| old.value);

        self.index.insert(entry.key.clone(), self.slots.len());
        self.slots.push(Some(entry));

        if previous.is_some() && self.slots.len() > 2 * self.index.len() {
            self.compact();
        }
        previous
    }

    fn compact(&mut self) {
        self.slots.retain(Option::is_some);
        for (idx, slot) in self.slots.iter().enumerate() {
            if let Some(entry) = slot
                && let Some(position) = self.index.get_mut(&entry.key)
            {
                *position = idx;
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entry(key).map(|entry| entry.value.as_str())
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.index
            .get(key)
            .and_then(|idx| self.slots[*idx].as_ref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterate `(key, value)` pairs in map order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries()
            .map(|entry| (entry.key.as_str(), entry.value.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries().map(|entry| entry.key.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.slots.iter().flatten()
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.slots.into_iter().flatten().collect()
    }

    /// Merge `other` into `self`; entries from `other` win.
    pub fn extend_from(&mut self, other: EnvironmentMap) {
        for entry in other {
            self.insert(entry);
        }
    }
}

impl PartialEq for EnvironmentMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.entries().eq(other.entries())
    }
}

impl Eq for EnvironmentMap {}

impl FromIterator<Entry> for EnvironmentMap {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        let mut map = Self::new();
        for entry in iter {
            map.insert(entry);
        }
        map
    }
}

impl IntoIterator for EnvironmentMap {
    type Item = Entry;
    type IntoIter = std::iter::Flatten<std::vec::IntoIter<Option<Entry>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.into_iter().flatten()
    }
}

impl From<EnvironmentMap> for BTreeMap<String, String> {
    fn from(map: EnvironmentMap) -> Self {
        map.into_iter()
            .map(|entry| (entry.key, entry.value))
            .collect()
    }
}

/// Summary of the load operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped_existing: usize,
    pub files_read: usize,
}

/// Key validation applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMode {
    /// Accept any non-empty key exactly as written before `=`.
    #[default]
    Verbatim,
    /// Require a shell identifier (`[A-Za-z_][A-Za-z0-9_]*`).
    Shell,
}
