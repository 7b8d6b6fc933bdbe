use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

use super::{parse_dataset, parse_history, Source};
use crate::dataset::QueryDataset;
use crate::error::PruneError;
use crate::history::UploadHistory;

/// Reads `weekly_data.json` and `upload_history.json` straight from disk.
pub struct FileSource {
    pub data_path: PathBuf,
    pub history_path: PathBuf,
}

impl FileSource {
    pub fn new(data_path: impl Into<PathBuf>, history_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            history_path: history_path.into(),
        }
    }
}

fn read_with<T>(path: &Path, parse: impl FnOnce(&str) -> Result<T>) -> Result<T> {
    fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))
        .and_then(|text| parse(&text).with_context(|| format!("parsing {}", path.display())))
        .map_err(|source| {
            PruneError::Load {
                path: path.to_path_buf(),
                source,
            }
            .into()
        })
}

impl Source for FileSource {
    fn load_dataset(&self) -> Result<QueryDataset> {
        let data = read_with(&self.data_path, parse_dataset)?;
        info!(path = %self.data_path.display(), queries = data.len(), "loaded dataset");
        Ok(data)
    }

    fn load_history(&self) -> Result<UploadHistory> {
        let history = read_with(&self.history_path, parse_history)?;
        info!(path = %self.history_path.display(), uploads = history.len(), "loaded history");
        Ok(history)
    }

    fn describe(&self) -> String {
        format!(
            "{} + {}",
            self.data_path.display(),
            self.history_path.display()
        )
    }
}
