pub mod config;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod history;
pub mod prompt;
pub mod prune;
pub mod run;
pub mod store;
pub mod supervisor;

pub use config::Config;
pub use error::PruneError;
pub use prune::{remove_period, Outcome, PruneReport};

use supervisor::Supervisor;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the fmt subscriber; `RUST_LOG` overrides the default `info`.
pub fn init_logging() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();
}

/// Shared body of the binaries: env overrides, run against stdin/stdout,
/// print the summary.
pub fn run_cli(mut config: Config) -> anyhow::Result<()> {
    config.apply_env()?;
    let source = config.build_source()?;
    let sup = config.supervisor();

    let stdin = std::io::stdin();
    let report = run::run(
        &config,
        &*source,
        sup.as_ref().map(|s| s as &dyn Supervisor),
        stdin.lock(),
        std::io::stdout(),
    )?;
    report.print_summary();
    Ok(())
}
