use serde::{Deserialize, Serialize};

/// Which upload records tied to a period get dropped from the history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadSelector {
    /// Uploads named exactly `<period>.xlsx`; needs two or more, drops only
    /// the oldest and keeps the rest.
    #[serde(alias = "duplicate")]
    OldestDuplicate,
    /// Every upload whose filename mentions the period. Query entries left
    /// without periods are deleted too.
    #[serde(alias = "purge")]
    AllMatching,
}

impl UploadSelector {
    pub fn as_str(&self) -> &str {
        match self {
            UploadSelector::OldestDuplicate => "oldest-duplicate",
            UploadSelector::AllMatching => "all-matching",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "oldest-duplicate" | "duplicate" => Some(UploadSelector::OldestDuplicate),
            "all-matching" | "purge" => Some(UploadSelector::AllMatching),
            _ => None,
        }
    }

    /// Does this filename belong to `period` under this policy?
    pub fn matches(&self, filename: &str, period: &str) -> bool {
        match self {
            UploadSelector::OldestDuplicate => {
                filename.strip_suffix(".xlsx") == Some(period)
            }
            UploadSelector::AllMatching => filename.contains(period),
        }
    }

    pub fn min_candidates(&self) -> usize {
        match self {
            UploadSelector::OldestDuplicate => 2,
            UploadSelector::AllMatching => 0,
        }
    }

    pub fn drops_emptied_queries(&self) -> bool {
        matches!(self, UploadSelector::AllMatching)
    }
}
