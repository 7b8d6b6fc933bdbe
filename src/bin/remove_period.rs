//! Purge one week from the weekly data files on disk.
//!
//! - Reads `data/weekly_data.json` and `data/upload_history.json`
//! - Drops every upload whose filename mentions the period
//! - Drops the period from every query, and queries left with no periods
//! - Renames the old files to `*.backup` first; refuses if a backup exists
//!
//! Override with `WEEKPRUNE_PERIOD`, `WEEKPRUNE_DATA_PATH`, `WEEKPRUNE_HISTORY_PATH`.

use anyhow::Result;
use weekprune::{init_logging, run_cli, Config};

fn main() -> Result<()> {
    init_logging();
    run_cli(Config::purge_preset())
}
