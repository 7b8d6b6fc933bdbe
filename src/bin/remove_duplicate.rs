//! Remove the older of two uploads of the same weekly sheet.
//!
//! - Fetches `/api/data` and `/api/history` from the tracking server
//! - Needs at least two `<period>.xlsx` uploads, otherwise does nothing
//! - Drops the oldest upload and the period's data points
//! - Writes `data/weekly_data.json` and `data/upload_history.json`
//! - Offers to restart `node server.js`
//!
//! Override the week with `WEEKPRUNE_PERIOD`, the server with `WEEKPRUNE_BASE_URL`.

use anyhow::Result;
use weekprune::{init_logging, run_cli, Config};

fn main() -> Result<()> {
    init_logging();
    run_cli(Config::duplicate_preset())
}
