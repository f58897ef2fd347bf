//! Aggregation store: one accumulated object per key

use super::merge::{MergeEngine, MergeError};
use super::record::Record;
use super::value::Object;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// First record for the key; stored as-is
    Inserted,
    Merged { field_errors: Vec<MergeError> },
}

/// Owns every accumulator. Entries leave only through `take`.
#[derive(Debug, Default)]
pub struct AggregationStore {
    entries: HashMap<String, Object>,
    engine: MergeEngine,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::with_engine(MergeEngine::new())
    }

    pub fn with_engine(engine: MergeEngine) -> Self {
        Self {
            entries: HashMap::new(),
            engine,
        }
    }

    pub fn ingest(&mut self, record: Record) -> IngestOutcome {
        let Record { key, payload } = record;

        match self.entries.get_mut(&key) {
            Some(accumulator) => {
                let field_errors = self.engine.merge(accumulator, payload);
                for err in &field_errors {
                    log::warn!("⚠️  Key '{}': {}", key, err);
                }
                IngestOutcome::Merged { field_errors }
            }
            None => {
                self.entries.insert(key, payload);
                IngestOutcome::Inserted
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Object> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Object)> {
        self.entries.iter()
    }

    /// Entries in ascending byte-wise key order
    pub fn sorted_entries(&self) -> Vec<(&String, &Object)> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Hand out every entry and leave the store empty
    pub fn take(&mut self) -> HashMap<String, Object> {
        std::mem::take(&mut self.entries)
    }
}
