// src/config.rs

use anyhow::{Context, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use url::Url;

use crate::error::PruneError;
use crate::fetch::{FileSource, HttpSource, Source};
use crate::history::UploadSelector;
use crate::store::Targets;
use crate::supervisor::CommandSupervisor;

/// `YYYY-MM-DD~YYYY-MM-DD`, the label the server gives each weekly sheet.
static PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})~(\d{4}-\d{2}-\d{2})$").expect("period regex should compile")
});

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_DATA_PATH: &str = "data/weekly_data.json";
const DEFAULT_HISTORY_PATH: &str = "data/upload_history.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Period label to remove, e.g. `2025-04-07~2025-04-13`.
    pub period: String,
    pub selector: UploadSelector,
    pub source: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub restart: Option<RestartConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Http {
        base_url: String,
    },
    File {
        data_path: PathBuf,
        history_path: PathBuf,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
    /// Rename existing files to `*.backup` before writing.
    #[serde(default)]
    pub backup: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            history_path: default_history_path(),
            backup: false,
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_PATH)
}

fn default_history_path() -> PathBuf {
    PathBuf::from(DEFAULT_HISTORY_PATH)
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestartConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Substring of the running server's command line.
    pub match_pattern: String,
    /// Ask on stdin before restarting.
    #[serde(default = "default_true")]
    pub prompt: bool,
}

impl Config {
    /// Read a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| PruneError::InvalidConfig(e.to_string()).into())
    }

    /// A week uploaded twice: drop the older upload, fetch from the local
    /// server, offer to restart it afterwards.
    pub fn duplicate_preset() -> Self {
        Self {
            period: "2025-04-07~2025-04-13".to_string(),
            selector: UploadSelector::OldestDuplicate,
            source: SourceConfig::Http {
                base_url: DEFAULT_BASE_URL.to_string(),
            },
            output: OutputConfig::default(),
            restart: Some(RestartConfig {
                program: "node".to_string(),
                args: vec!["server.js".to_string()],
                working_dir: None,
                match_pattern: "node server.js".to_string(),
                prompt: true,
            }),
        }
    }

    /// Purge one week entirely from the files on disk, keeping `.backup` copies.
    pub fn purge_preset() -> Self {
        Self {
            period: "2025-02-09~2025-02-16".to_string(),
            selector: UploadSelector::AllMatching,
            source: SourceConfig::File {
                data_path: default_data_path(),
                history_path: default_history_path(),
            },
            output: OutputConfig {
                backup: true,
                ..OutputConfig::default()
            },
            restart: None,
        }
    }

    /// Apply `WEEKPRUNE_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`:
    /// - `WEEKPRUNE_PERIOD`, `WEEKPRUNE_SELECTOR`
    /// - `WEEKPRUNE_BASE_URL` (http source only)
    /// - `WEEKPRUNE_DATA_PATH`, `WEEKPRUNE_HISTORY_PATH` (file source and output)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(p) = lookup("WEEKPRUNE_PERIOD") {
            self.period = p;
        }
        if let Some(s) = lookup("WEEKPRUNE_SELECTOR") {
            self.selector = UploadSelector::from_str(&s).ok_or_else(|| {
                PruneError::InvalidConfig(format!("WEEKPRUNE_SELECTOR {:?} is not a selector", s))
            })?;
        }
        if let Some(url) = lookup("WEEKPRUNE_BASE_URL") {
            if let SourceConfig::Http { base_url } = &mut self.source {
                *base_url = url;
            }
        }
        if let Some(p) = lookup("WEEKPRUNE_DATA_PATH") {
            if let SourceConfig::File { data_path, .. } = &mut self.source {
                *data_path = PathBuf::from(&p);
            }
            self.output.data_path = PathBuf::from(p);
        }
        if let Some(p) = lookup("WEEKPRUNE_HISTORY_PATH") {
            if let SourceConfig::File { history_path, .. } = &mut self.source {
                *history_path = PathBuf::from(&p);
            }
            self.output.history_path = PathBuf::from(p);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> anyhow::Error { PruneError::InvalidConfig(msg).into() };

        let caps = PERIOD_RE
            .captures(&self.period)
            .ok_or_else(|| invalid(format!("period {:?} is not YYYY-MM-DD~YYYY-MM-DD", self.period)))?;
        let start = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d")
            .map_err(|e| invalid(format!("period start {:?}: {}", &caps[1], e)))?;
        let end = NaiveDate::parse_from_str(&caps[2], "%Y-%m-%d")
            .map_err(|e| invalid(format!("period end {:?}: {}", &caps[2], e)))?;
        if start > end {
            return Err(invalid(format!("period {:?} ends before it starts", self.period)));
        }

        if let SourceConfig::Http { base_url } = &self.source {
            Url::parse(base_url).map_err(|e| invalid(format!("base_url {:?}: {}", base_url, e)))?;
        }

        if let Some(r) = &self.restart {
            if r.program.trim().is_empty() {
                return Err(invalid("restart.program is empty".to_string()));
            }
            if r.match_pattern.trim().is_empty() {
                return Err(invalid("restart.match_pattern is empty".to_string()));
            }
        }
        Ok(())
    }

    pub fn build_source(&self) -> Result<Box<dyn Source>> {
        let source: Box<dyn Source> = match &self.source {
            SourceConfig::Http { base_url } => Box::new(HttpSource::new(base_url)?),
            SourceConfig::File {
                data_path,
                history_path,
            } => Box::new(FileSource::new(data_path, history_path)),
        };
        Ok(source)
    }

    pub fn targets(&self) -> Targets {
        Targets {
            data_path: self.output.data_path.clone(),
            history_path: self.output.history_path.clone(),
        }
    }

    pub fn supervisor(&self) -> Option<CommandSupervisor> {
        self.restart.as_ref().map(|r| CommandSupervisor {
            program: r.program.clone(),
            args: r.args.clone(),
            working_dir: r.working_dir.clone(),
            match_pattern: r.match_pattern.clone(),
        })
    }
}
