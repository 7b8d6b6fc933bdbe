// src/run.rs

use anyhow::Result;
use std::io::{BufRead, Write};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::PruneError;
use crate::fetch::Source;
use crate::prompt::confirm;
use crate::prune::{remove_period, PruneReport};
use crate::store::persist;
use crate::supervisor::Supervisor;

/// Load → prune → persist → optionally restart.
///
/// Any failure before persisting leaves the files as they were. The restart
/// happens only after both files are written; a failed stop is logged and
/// the start is still attempted.
pub fn run<R: BufRead, W: Write>(
    config: &Config,
    source: &dyn Source,
    supervisor: Option<&dyn Supervisor>,
    input: R,
    mut output: W,
) -> Result<PruneReport> {
    config.validate()?;
    info!(source = %source.describe(), period = %config.period, "loading");

    let mut dataset = source.load_dataset()?;
    let mut history = source.load_history()?;
    info!(queries = dataset.len(), uploads = history.len(), "loaded");
    let untracked: Vec<&String> = dataset.untracked().collect();
    if !untracked.is_empty() {
        info!(entries = ?untracked, "entries without periods left as-is");
    }

    let report = remove_period(&mut dataset, &mut history, &config.period, config.selector);
    if !report.changed() {
        info!(period = %config.period, "nothing to remove; files left untouched");
        return Ok(report);
    }

    persist(&config.targets(), &dataset, &history, config.output.backup)?;

    let (Some(sup), Some(restart)) = (supervisor, config.restart.as_ref()) else {
        return Ok(report);
    };

    let go = if restart.prompt {
        writeln!(output, "\nThe server must be restarted to pick up the changes.")?;
        confirm(input, &mut output, "Restart the server now?")?
    } else {
        true
    };
    if !go {
        info!("restart skipped");
        return Ok(report);
    }

    info!("restarting server");
    if let Err(e) = sup.stop() {
        warn!("stopping server failed: {:#}", e);
    }
    sup.start()
        .map_err(|e| PruneError::Restart(format!("{:#}", e)))?;
    info!("server restarted");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputConfig, RestartConfig, SourceConfig};
    use crate::dataset::QueryDataset;
    use crate::history::{UploadHistory, UploadSelector};
    use crate::prune::Outcome;
    use crate::store::backup_path;
    use anyhow::bail;
    use serde_json::json;
    use std::cell::RefCell;
    use std::fs;
    use std::io::Cursor;
    use std::path::Path;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<&'static str>>,
        fail_stop: bool,
    }

    impl Supervisor for Recorder {
        fn stop(&self) -> Result<usize> {
            self.calls.borrow_mut().push("stop");
            if self.fail_stop {
                bail!("no permission");
            }
            Ok(0)
        }
        fn start(&self) -> Result<()> {
            self.calls.borrow_mut().push("start");
            Ok(())
        }
    }

    struct Failing;

    impl Source for Failing {
        fn load_dataset(&self) -> Result<QueryDataset> {
            Err(PruneError::Fetch {
                url: "http://localhost:3000/api/data".to_string(),
                source: anyhow::anyhow!("connection refused"),
            }
            .into())
        }
        fn load_history(&self) -> Result<UploadHistory> {
            unreachable!("dataset load fails first")
        }
        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    fn write(path: &Path, v: serde_json::Value) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string_pretty(&v).unwrap()).unwrap();
    }

    fn duplicate_config(dir: &Path, prompt: bool) -> Config {
        let data = dir.join("data/weekly_data.json");
        let hist = dir.join("data/upload_history.json");
        Config {
            period: "2025-04-07~2025-04-13".to_string(),
            selector: UploadSelector::OldestDuplicate,
            source: SourceConfig::File {
                data_path: data.clone(),
                history_path: hist.clone(),
            },
            output: OutputConfig {
                data_path: data,
                history_path: hist,
                backup: false,
            },
            restart: Some(RestartConfig {
                program: "node".to_string(),
                args: vec!["server.js".to_string()],
                working_dir: None,
                match_pattern: "node server.js".to_string(),
                prompt,
            }),
        }
    }

    fn seed_duplicate(dir: &Path) {
        write(
            &dir.join("data/weekly_data.json"),
            json!({"q1": {"periods": ["2025-04-07~2025-04-13", "2025-04-14~2025-04-20"], "areaSc": [10, 20]}}),
        );
        write(
            &dir.join("data/upload_history.json"),
            json!([
                {"filename": "2025-04-07~2025-04-13.xlsx", "timestamp": "2025-04-06T00:00:00", "recordsAdded": 5},
                {"filename": "2025-04-07~2025-04-13.xlsx", "timestamp": "2025-04-08T00:00:00", "recordsAdded": 7}
            ]),
        );
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_duplicate_run_confirms_and_restarts() {
        let tmp = tempdir().unwrap();
        seed_duplicate(tmp.path());
        let cfg = duplicate_config(tmp.path(), true);
        let src = cfg.build_source().unwrap();
        let sup = Recorder::default();
        let mut out = Vec::new();

        let report = run(&cfg, &*src, Some(&sup), Cursor::new("y\n"), &mut out).unwrap();

        assert_eq!(report.affected_queries, vec!["q1"]);
        assert_eq!(*sup.calls.borrow(), vec!["stop", "start"]);
        assert!(String::from_utf8(out).unwrap().contains("(y/n)"));
        assert_eq!(
            read_json(&cfg.output.data_path),
            json!({"q1": {"periods": ["2025-04-14~2025-04-20"], "areaSc": [20]}})
        );
        let hist = read_json(&cfg.output.history_path);
        assert_eq!(hist.as_array().unwrap().len(), 1);
        assert_eq!(hist[0]["timestamp"], json!("2025-04-08T00:00:00"));
    }

    #[test]
    fn test_declined_prompt_skips_restart() {
        let tmp = tempdir().unwrap();
        seed_duplicate(tmp.path());
        let cfg = duplicate_config(tmp.path(), true);
        let src = cfg.build_source().unwrap();
        let sup = Recorder::default();

        run(&cfg, &*src, Some(&sup), Cursor::new("maybe\n"), Vec::new()).unwrap();

        assert!(sup.calls.borrow().is_empty());
    }

    #[test]
    fn test_failed_stop_still_starts() {
        let tmp = tempdir().unwrap();
        seed_duplicate(tmp.path());
        let cfg = duplicate_config(tmp.path(), false);
        let src = cfg.build_source().unwrap();
        let sup = Recorder {
            fail_stop: true,
            ..Recorder::default()
        };

        run(&cfg, &*src, Some(&sup), Cursor::new(""), Vec::new()).unwrap();

        assert_eq!(*sup.calls.borrow(), vec!["stop", "start"]);
    }

    #[test]
    fn test_nothing_to_remove_writes_nothing() {
        let tmp = tempdir().unwrap();
        seed_duplicate(tmp.path());
        let cfg = duplicate_config(tmp.path(), false);
        let src = cfg.build_source().unwrap();
        run(&cfg, &*src, None, Cursor::new(""), Vec::new()).unwrap();
        let data_after_first = fs::read(&cfg.output.data_path).unwrap();

        // one upload left, so the second run must not touch anything
        let sup = Recorder::default();
        let report = run(&cfg, &*src, Some(&sup), Cursor::new("y\n"), Vec::new()).unwrap();

        assert_eq!(report.outcome, Outcome::NothingToRemove);
        assert_eq!(fs::read(&cfg.output.data_path).unwrap(), data_after_first);
        assert!(sup.calls.borrow().is_empty());
    }

    #[test]
    fn test_fetch_failure_aborts_before_writing() {
        let tmp = tempdir().unwrap();
        let cfg = duplicate_config(tmp.path(), false);
        let sup = Recorder::default();

        let err = run(&cfg, &Failing, Some(&sup), Cursor::new(""), Vec::new()).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PruneError>(),
            Some(PruneError::Fetch { .. })
        ));
        assert!(!cfg.output.data_path.exists());
        assert!(sup.calls.borrow().is_empty());
    }

    #[test]
    fn test_purge_with_backup_collision_keeps_primaries() {
        let tmp = tempdir().unwrap();
        let mut cfg = Config::purge_preset();
        cfg.apply_overrides(|k| match k {
            "WEEKPRUNE_DATA_PATH" => Some(tmp.path().join("weekly_data.json").display().to_string()),
            "WEEKPRUNE_HISTORY_PATH" => Some(tmp.path().join("upload_history.json").display().to_string()),
            _ => None,
        })
        .unwrap();
        write(
            &cfg.output.data_path,
            json!({"q1": {"periods": ["2025-02-09~2025-02-16"], "areaSc": [1]}}),
        );
        write(
            &cfg.output.history_path,
            json!([{"filename": "2025-02-09~2025-02-16.xlsx", "timestamp": "2025-02-17T00:00:00Z", "recordsAdded": 1}]),
        );
        fs::write(backup_path(&cfg.output.data_path), "old").unwrap();
        let data_before = fs::read(&cfg.output.data_path).unwrap();
        let hist_before = fs::read(&cfg.output.history_path).unwrap();

        let src = cfg.build_source().unwrap();
        let err = run(&cfg, &*src, None, Cursor::new(""), Vec::new()).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PruneError>(),
            Some(PruneError::BackupCollision { .. })
        ));
        assert_eq!(fs::read(&cfg.output.data_path).unwrap(), data_before);
        assert_eq!(fs::read(&cfg.output.history_path).unwrap(), hist_before);
    }

    fn purge_config(dir: &Path) -> Config {
        let mut cfg = Config::purge_preset();
        cfg.source = SourceConfig::File {
            data_path: dir.join("weekly_data.json"),
            history_path: dir.join("upload_history.json"),
        };
        cfg.output.data_path = dir.join("weekly_data.json");
        cfg.output.history_path = dir.join("upload_history.json");
        cfg
    }

    #[test]
    fn test_repeated_purge_is_a_noop() {
        let tmp = tempdir().unwrap();
        let cfg = purge_config(tmp.path());
        write(
            &cfg.output.data_path,
            json!({
                "q2": {"periods": ["2025-02-02~2025-02-08", "2025-02-09~2025-02-16"], "areaSc": [2, 3]},
                "meta": {"note": "kept"}
            }),
        );
        write(
            &cfg.output.history_path,
            json!([{"filename": "2025-02-09~2025-02-16.xlsx", "timestamp": "2025-02-17T00:00:00Z", "recordsAdded": 1}]),
        );
        let src = cfg.build_source().unwrap();

        let first = run(&cfg, &*src, None, Cursor::new(""), Vec::new()).unwrap();
        assert!(first.changed());
        let data_after = fs::read(&cfg.output.data_path).unwrap();
        let backup_after = fs::read(backup_path(&cfg.output.data_path)).unwrap();

        // backups are already in place; a rewrite would collide
        let second = run(&cfg, &*src, None, Cursor::new(""), Vec::new()).unwrap();

        assert!(!second.changed());
        assert_eq!(fs::read(&cfg.output.data_path).unwrap(), data_after);
        assert_eq!(fs::read(backup_path(&cfg.output.data_path)).unwrap(), backup_after);
        assert_eq!(read_json(&cfg.output.data_path)["meta"], json!({"note": "kept"}));
    }

    #[test]
    fn test_unchanged_purge_skips_restart() {
        let tmp = tempdir().unwrap();
        let mut cfg = purge_config(tmp.path());
        cfg.restart = duplicate_config(tmp.path(), false).restart;
        write(
            &cfg.output.data_path,
            json!({"q2": {"periods": ["2025-02-02~2025-02-08"], "areaSc": [2]}}),
        );
        write(&cfg.output.history_path, json!([]));
        let src = cfg.build_source().unwrap();
        let sup = Recorder::default();

        let report = run(&cfg, &*src, Some(&sup), Cursor::new(""), Vec::new()).unwrap();

        assert_eq!(report.outcome, Outcome::Pruned);
        assert!(!report.changed());
        assert!(sup.calls.borrow().is_empty());
        assert!(!backup_path(&cfg.output.data_path).exists());
    }

    #[test]
    fn test_purge_run_drops_query_and_backs_up() {
        let tmp = tempdir().unwrap();
        let data = tmp.path().join("weekly_data.json");
        let hist = tmp.path().join("upload_history.json");
        let mut cfg = Config::purge_preset();
        cfg.source = SourceConfig::File {
            data_path: data.clone(),
            history_path: hist.clone(),
        };
        cfg.output.data_path = data.clone();
        cfg.output.history_path = hist.clone();
        write(
            &data,
            json!({
                "q1": {"periods": ["2025-02-09~2025-02-16"], "areaSc": [1]},
                "q2": {"periods": ["2025-02-02~2025-02-08"], "areaSc": [2]}
            }),
        );
        write(
            &hist,
            json!([{"filename": "2025-02-09~2025-02-16.xlsx", "timestamp": "2025-02-17T00:00:00Z", "recordsAdded": 1}]),
        );

        let src = cfg.build_source().unwrap();
        let report = run(&cfg, &*src, None, Cursor::new(""), Vec::new()).unwrap();

        assert_eq!(report.dropped_queries, vec!["q1"]);
        assert_eq!(
            read_json(&data),
            json!({"q2": {"periods": ["2025-02-02~2025-02-08"], "areaSc": [2]}})
        );
        assert_eq!(read_json(&hist), json!([]));
        assert!(read_json(&backup_path(&data)).get("q1").is_some());
        assert!(backup_path(&hist).exists());
    }
}
