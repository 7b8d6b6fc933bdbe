use anyhow::{Context, Result};
use reqwest::blocking::Client;
use tracing::info;
use url::Url;

use super::{parse_dataset, parse_history, Source};
use crate::dataset::QueryDataset;
use crate::error::PruneError;
use crate::history::UploadHistory;

/// Reads the dataset and upload log from the tracking server's JSON API.
pub struct HttpSource {
    client: Client,
    base: Url,
}

impl HttpSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| PruneError::InvalidConfig(format!("base url {:?}: {}", base_url, e)))?;
        // endpoints are joined relative to the base, so keep its last segment
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("joining {} onto {}", path, self.base))
    }

    /// GET `path` and return the body, mapping any failure to `PruneError::Fetch`.
    fn get_text(&self, path: &str) -> Result<(Url, String)> {
        let url = self.endpoint(path)?;
        let fetched = self
            .client
            .get(url.clone())
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text());
        match fetched {
            Ok(body) => Ok((url, body)),
            Err(e) => Err(PruneError::Fetch {
                url: url.to_string(),
                source: e.into(),
            }
            .into()),
        }
    }
}

impl Source for HttpSource {
    fn load_dataset(&self) -> Result<QueryDataset> {
        let (url, body) = self.get_text("api/data")?;
        let data = parse_dataset(&body).map_err(|source| PruneError::Fetch {
            url: url.to_string(),
            source,
        })?;
        info!(url = %url, queries = data.len(), "fetched dataset");
        Ok(data)
    }

    fn load_history(&self) -> Result<UploadHistory> {
        let (url, body) = self.get_text("api/history")?;
        let history = parse_history(&body).map_err(|source| PruneError::Fetch {
            url: url.to_string(),
            source,
        })?;
        info!(url = %url, uploads = history.len(), "fetched history");
        Ok(history)
    }

    fn describe(&self) -> String {
        self.base.to_string()
    }
}
