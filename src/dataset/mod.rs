// src/dataset/mod.rs

pub mod entry;

pub use entry::{PeriodPoint, QueryEntry, Series};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// The weekly data file: query name → entry, in file order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryDataset {
    entries: IndexMap<String, DatasetEntry>,
}

/// A value in the weekly data file.
///
/// Anything that does not decode as a [`QueryEntry`] (no `periods` array,
/// not an object) is carried through as-is and never matched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatasetEntry {
    Query(QueryEntry),
    Untracked(Value),
}

impl DatasetEntry {
    pub fn as_query(&self) -> Option<&QueryEntry> {
        match self {
            DatasetEntry::Query(e) => Some(e),
            DatasetEntry::Untracked(_) => None,
        }
    }
}

/// What a period removal did to the dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatasetRemoval {
    /// Queries that contained the period.
    pub affected: Vec<String>,
    /// Queries deleted because the removal left them without periods.
    pub dropped: Vec<String>,
}

impl QueryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, query: &str) -> Option<&QueryEntry> {
        self.entries.get(query).and_then(DatasetEntry::as_query)
    }

    pub fn insert(&mut self, query: impl Into<String>, entry: QueryEntry) {
        self.entries.insert(query.into(), DatasetEntry::Query(entry));
    }

    /// Queries with a `periods` array, in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &QueryEntry)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_query().map(|e| (k, e)))
    }

    /// Names of entries kept verbatim because they have no usable `periods`.
    pub fn untracked(&self) -> impl Iterator<Item = &String> {
        self.entries
            .iter()
            .filter(|(_, v)| v.as_query().is_none())
            .map(|(k, _)| k)
    }

    /// Number of queries that still hold `period`.
    pub fn count_with(&self, period: &str) -> usize {
        self.iter().filter(|(_, e)| e.contains(period)).count()
    }

    /// Remove `period` from every entry that has it.
    ///
    /// With `drop_emptied`, entries that lose their last period are deleted.
    /// Entries that were already empty are left alone.
    pub fn remove_period(&mut self, period: &str, drop_emptied: bool) -> DatasetRemoval {
        let mut out = DatasetRemoval::default();

        for (query, entry) in self.entries.iter_mut() {
            let DatasetEntry::Query(entry) = entry else {
                continue;
            };
            if entry.remove_period(period).is_some() {
                debug!(query = %query, period = %period, "removed period");
                out.affected.push(query.clone());
                if drop_emptied && entry.is_empty() {
                    out.dropped.push(query.clone());
                }
            }
        }

        for query in &out.dropped {
            self.entries.shift_remove(query);
            debug!(query = %query, "dropped empty query");
        }

        out
    }
}
