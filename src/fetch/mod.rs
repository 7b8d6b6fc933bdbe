// src/fetch/mod.rs

use anyhow::Result;
use serde::Deserialize;

use crate::dataset::QueryDataset;
use crate::history::{UploadHistory, UploadRecord};

pub mod http;
pub mod local;

pub use http::HttpSource;
pub use local::FileSource;

/// Where the current dataset and upload log come from.
///
/// Both loads happen before anything is mutated, so a failing source leaves
/// no trace.
pub trait Source {
    fn load_dataset(&self) -> Result<QueryDataset>;
    fn load_history(&self) -> Result<UploadHistory>;
    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// `{ "history": [...] }` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryBody {
    Wrapped { history: Vec<UploadRecord> },
    Bare(Vec<UploadRecord>),
}

impl From<HistoryBody> for UploadHistory {
    fn from(body: HistoryBody) -> Self {
        match body {
            HistoryBody::Wrapped { history } => history.into(),
            HistoryBody::Bare(history) => history.into(),
        }
    }
}

/// Accepts `{ "data": {...}, ... }` as served by `/api/data`, or the bare
/// mapping as stored on disk. Same rule as the server's own loader: an
/// object-valued `data` key means the wrapper.
fn parse_dataset(text: &str) -> Result<QueryDataset> {
    let mut value: serde_json::Value = serde_json::from_str(text)?;
    if let Some(data) = value.get_mut("data").filter(|d| d.is_object()) {
        return Ok(serde_json::from_value(data.take())?);
    }
    Ok(serde_json::from_value(value)?)
}

fn parse_history(text: &str) -> Result<UploadHistory> {
    Ok(serde_json::from_str::<HistoryBody>(text)?.into())
}
