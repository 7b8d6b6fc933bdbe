// src/history/mod.rs

pub mod selector;

pub use selector::UploadSelector;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// One entry of `upload_history.json`, appended by the server per uploaded sheet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub timestamp: String,
    pub filename: String,
    pub records_added: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queries_processed: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UploadRecord {
    pub fn new(filename: impl Into<String>, timestamp: impl Into<String>, records_added: i64) -> Self {
        Self {
            timestamp: timestamp.into(),
            filename: filename.into(),
            records_added,
            queries_processed: None,
            extra: Map::new(),
        }
    }

    /// Parsed upload time. Naive timestamps are taken as UTC.
    pub fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|n| n.and_utc())
    }

    /// Oldest first; unparseable timestamps sort after every parseable one,
    /// by raw text.
    pub fn cmp_age(&self, other: &Self) -> Ordering {
        match (self.uploaded_at(), other.uploaded_at()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.timestamp.cmp(&other.timestamp)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.timestamp.cmp(&other.timestamp),
        }
    }
}

/// The upload log, in file order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadHistory {
    records: Vec<UploadRecord>,
}

impl From<Vec<UploadRecord>> for UploadHistory {
    fn from(records: Vec<UploadRecord>) -> Self {
        Self { records }
    }
}

impl UploadHistory {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[UploadRecord] {
        &self.records
    }

    /// Records tied to `period` under `selector`, oldest first.
    pub fn candidates(&self, period: &str, selector: UploadSelector) -> Vec<UploadRecord> {
        let mut out: Vec<UploadRecord> = self
            .records
            .iter()
            .filter(|r| selector.matches(&r.filename, period))
            .cloned()
            .collect();
        out.sort_by(UploadRecord::cmp_age);
        out
    }

    /// Drop every record sharing `timestamp`; returns how many went.
    pub fn remove_by_timestamp(&mut self, timestamp: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.timestamp != timestamp);
        before - self.records.len()
    }

    /// Drop every record whose filename mentions `period`; returns them.
    pub fn remove_mentioning(&mut self, period: &str) -> Vec<UploadRecord> {
        let (gone, kept): (Vec<_>, Vec<_>) = self
            .records
            .drain(..)
            .partition(|r| r.filename.contains(period));
        self.records = kept;
        gone
    }
}
