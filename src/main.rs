use anyhow::Result;
use std::{env, path::PathBuf};
use tracing::info;
use weekprune::{init_logging, run_cli, Config};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    init_logging();

    // ─── 2) locate config: argv[1], $WEEKPRUNE_CONFIG, ./weekprune.yaml ──
    let path = env::args()
        .nth(1)
        .or_else(|| env::var("WEEKPRUNE_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("weekprune.yaml"));
    info!(config = %path.display(), "startup");

    // ─── 3) load and run ─────────────────────────────────────────────
    let config = Config::load(&path)?;
    run_cli(config)
}
