// src/prune.rs

use crate::dataset::QueryDataset;
use crate::history::{UploadHistory, UploadRecord, UploadSelector};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Pruned,
    /// The duplicate guard found fewer uploads than it needs; nothing changed.
    NothingToRemove,
}

/// Everything an operator needs to see after a run.
#[derive(Clone, Debug, PartialEq)]
pub struct PruneReport {
    pub period: String,
    pub selector: UploadSelector,
    pub outcome: Outcome,
    pub candidates: Vec<UploadRecord>,
    pub removed_uploads: Vec<UploadRecord>,
    pub affected_queries: Vec<String>,
    pub dropped_queries: Vec<String>,
    pub remaining_queries: usize,
    pub remaining_history: usize,
}

impl PruneReport {
    /// True if either structure was modified.
    pub fn changed(&self) -> bool {
        !self.removed_uploads.is_empty()
            || !self.affected_queries.is_empty()
            || !self.dropped_queries.is_empty()
    }

    pub fn print_summary(&self) {
        println!();
        println!("=== {} ({}) ===", self.period, self.selector.as_str());
        if self.outcome == Outcome::NothingToRemove {
            println!(
                "Nothing to remove: {} matching upload(s), need {}",
                self.candidates.len(),
                self.selector.min_candidates()
            );
            return;
        }
        println!("Queries affected:  {}", self.affected_queries.len());
        println!("Queries dropped:   {}", self.dropped_queries.len());
        println!("Uploads removed:   {}", self.removed_uploads.len());
        for u in &self.removed_uploads {
            println!("  {}  {}  ({} records)", u.timestamp, u.filename, u.records_added);
        }
        println!("Queries remaining: {}", self.remaining_queries);
        println!("History remaining: {}", self.remaining_history);
    }
}

/// Remove `period` from the dataset and its uploads from the history.
///
/// With [`UploadSelector::OldestDuplicate`] the run only proceeds when at
/// least two `<period>.xlsx` uploads exist; the oldest is removed. With
/// [`UploadSelector::AllMatching`] every upload mentioning the period goes,
/// and queries left without periods are deleted.
pub fn remove_period(
    dataset: &mut QueryDataset,
    history: &mut UploadHistory,
    period: &str,
    selector: UploadSelector,
) -> PruneReport {
    let candidates = history.candidates(period, selector);
    info!(
        period = %period,
        selector = selector.as_str(),
        candidates = candidates.len(),
        "matched uploads"
    );
    for (i, c) in candidates.iter().enumerate() {
        info!("  {}. {} - {} records ({})", i + 1, c.timestamp, c.records_added, c.filename);
    }

    let mut report = PruneReport {
        period: period.to_string(),
        selector,
        outcome: Outcome::Pruned,
        candidates,
        removed_uploads: Vec::new(),
        affected_queries: Vec::new(),
        dropped_queries: Vec::new(),
        remaining_queries: dataset.len(),
        remaining_history: history.len(),
    };

    if report.candidates.len() < selector.min_candidates() {
        info!(period = %period, "no duplicates; nothing to remove");
        report.outcome = Outcome::NothingToRemove;
        return report;
    }

    report.removed_uploads = match selector {
        UploadSelector::OldestDuplicate => {
            // candidates are sorted oldest first
            let oldest = report.candidates[0].clone();
            info!(timestamp = %oldest.timestamp, "removing oldest upload");
            history.remove_by_timestamp(&oldest.timestamp);
            vec![oldest]
        }
        UploadSelector::AllMatching => history.remove_mentioning(period),
    };

    let removal = dataset.remove_period(period, selector.drops_emptied_queries());
    report.affected_queries = removal.affected;
    report.dropped_queries = removal.dropped;
    report.remaining_queries = dataset.len();
    report.remaining_history = history.len();

    info!(
        period = %period,
        queries = report.affected_queries.len(),
        dropped = report.dropped_queries.len(),
        uploads = report.removed_uploads.len(),
        "period removed"
    );
    report
}
