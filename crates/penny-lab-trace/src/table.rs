use penny_lab_abstract::{FlowKey, FlowRecord};
use std::collections::HashMap;

/// Flow records keyed by flow, iterated in order of first sighting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowTable {
    entries: Vec<(FlowKey, FlowRecord)>,
    index: HashMap<FlowKey, usize>,
}

impl FlowTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a flow starting at `timestamp`. A flow that is already open
    /// keeps its first start; returns whether a new flow was created.
    pub fn open(&mut self, key: FlowKey, timestamp: &str) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }
        self.insert_new(key, FlowRecord::new(timestamp));
        true
    }

    pub fn get(&self, key: &FlowKey) -> Option<&FlowRecord> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &FlowKey) -> Option<&mut FlowRecord> {
        self.index.get(key).map(|&i| &mut self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FlowKey, &FlowRecord)> {
        self.entries.iter().map(|(k, r)| (k, r))
    }

    pub fn keys(&self) -> impl Iterator<Item = &FlowKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Add a record observed elsewhere, replaying first-write-wins:
    /// an existing flow keeps its start and its already-seen acks.
    pub fn absorb(&mut self, key: FlowKey, record: FlowRecord) {
        match self.get_mut(&key) {
            Some(existing) => existing.absorb(&record),
            None => self.insert_new(key, record),
        }
    }

    /// Fold a table built from another trace into this one. Flows only
    /// present in `other` are appended after this table's flows.
    pub fn merge(&mut self, other: FlowTable) {
        for (key, record) in other.entries {
            self.absorb(key, record);
        }
    }

    fn insert_new(&mut self, key: FlowKey, record: FlowRecord) {
        self.index.insert(key, self.entries.len());
        self.entries.push((key, record));
    }
}
