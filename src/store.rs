// src/store.rs

use anyhow::Result;
use serde::Serialize;
use std::{
    ffi::OsString,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::info;

use crate::dataset::QueryDataset;
use crate::error::PruneError;
use crate::history::UploadHistory;

/// Where the dataset and history get written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Targets {
    pub data_path: PathBuf,
    pub history_path: PathBuf,
}

/// `weekly_data.json` → `weekly_data.json.backup`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(".backup");
    PathBuf::from(s)
}

/// Write `value` as pretty JSON (two-space indent, UTF-8 kept literal).
///
/// - Creates the parent directory when missing
/// - Writes to a hidden tmp file next to `path`, then renames over it
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let persist_err = |source: io::Error| PruneError::Persist {
        path: path.to_path_buf(),
        source,
    };

    // 1) Make sure the directory exists
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(persist_err)?;

    // 2) Serialize into a tmp file beside the target
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out.json".to_string());
    let tmp_path = dir.join(format!(".{}.tmp", file_name));

    // 3) Swap it in; never leave the tmp file behind
    let written = write_tmp(&tmp_path, value).and_then(|_| fs::rename(&tmp_path, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(persist_err(e).into());
    }
    Ok(())
}

fn write_tmp<T: Serialize + ?Sized>(tmp_path: &Path, value: &T) -> io::Result<()> {
    let mut tmp = fs::File::create(tmp_path)?;
    serde_json::to_writer_pretty(&mut tmp, value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    tmp.write_all(b"\n")?;
    tmp.sync_all()
}

/// Move each existing file aside to `<name>.backup`.
///
/// Every backup slot is checked before anything is renamed, so a collision
/// leaves all originals in place. Missing originals are skipped.
pub fn backup_all(paths: &[&Path]) -> Result<Vec<PathBuf>> {
    for path in paths {
        let dest = backup_path(path);
        if dest.exists() {
            return Err(PruneError::BackupCollision { path: dest }.into());
        }
    }

    let mut made = Vec::with_capacity(paths.len());
    for path in paths {
        if !path.exists() {
            continue;
        }
        let dest = backup_path(path);
        fs::rename(path, &dest).map_err(|source| PruneError::Persist {
            path: dest.clone(),
            source,
        })?;
        info!(from = %path.display(), to = %dest.display(), "backed up");
        made.push(dest);
    }
    Ok(made)
}

/// Write the dataset and history to `targets`, archiving the old files first
/// when `backup` is set.
pub fn persist(
    targets: &Targets,
    dataset: &QueryDataset,
    history: &UploadHistory,
    backup: bool,
) -> Result<()> {
    if backup {
        backup_all(&[targets.data_path.as_path(), targets.history_path.as_path()])?;
    }
    write_json(&targets.data_path, dataset)?;
    info!(path = %targets.data_path.display(), queries = dataset.len(), "wrote dataset");
    write_json(&targets.history_path, history)?;
    info!(path = %targets.history_path.display(), uploads = history.len(), "wrote history");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn targets(dir: &Path) -> Targets {
        Targets {
            data_path: dir.join("data").join("weekly_data.json"),
            history_path: dir.join("data").join("upload_history.json"),
        }
    }

    #[test]
    fn test_write_json_creates_dir_and_keeps_unicode() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("out.json");

        write_json(&path, &json!({"쿼리": [1, 2]})).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n  \"쿼리\": [\n    1,\n    2\n  ]\n}\n");
        // no tmp file left behind
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refusing to serialize"))
        }
    }

    #[test]
    fn test_failed_write_removes_tmp_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("data").join("weekly_data.json");

        let err = write_json(&path, &Unserializable).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PruneError>(),
            Some(PruneError::Persist { .. })
        ));
        assert!(!path.exists());
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 0);
    }

    #[test]
    fn test_persist_without_backup_overwrites() {
        let tmp = tempdir().unwrap();
        let t = targets(tmp.path());
        write_json(&t.data_path, &json!({"old": true})).unwrap();

        let ds = QueryDataset::new();
        let h = UploadHistory::default();
        persist(&t, &ds, &h, false).unwrap();

        assert_eq!(fs::read_to_string(&t.data_path).unwrap(), "{}\n");
        assert_eq!(fs::read_to_string(&t.history_path).unwrap(), "[]\n");
        assert!(!backup_path(&t.data_path).exists());
    }

    #[test]
    fn test_persist_with_backup_archives_originals() {
        let tmp = tempdir().unwrap();
        let t = targets(tmp.path());
        write_json(&t.data_path, &json!({"old": true})).unwrap();
        write_json(&t.history_path, &json!([])).unwrap();
        let before = fs::read(&t.data_path).unwrap();

        persist(&t, &QueryDataset::new(), &UploadHistory::default(), true).unwrap();

        assert_eq!(fs::read(backup_path(&t.data_path)).unwrap(), before);
        assert!(backup_path(&t.history_path).exists());
        assert_eq!(fs::read_to_string(&t.data_path).unwrap(), "{}\n");
    }

    #[test]
    fn test_backup_collision_leaves_primaries_untouched() {
        let tmp = tempdir().unwrap();
        let t = targets(tmp.path());
        write_json(&t.data_path, &json!({"old": true})).unwrap();
        write_json(&t.history_path, &json!([{"x": 1}])).unwrap();
        // only the second file's slot is taken
        fs::write(backup_path(&t.history_path), b"earlier backup").unwrap();
        let data_before = fs::read(&t.data_path).unwrap();
        let hist_before = fs::read(&t.history_path).unwrap();

        let err = persist(&t, &QueryDataset::new(), &UploadHistory::default(), true).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PruneError>(),
            Some(PruneError::BackupCollision { .. })
        ));
        assert_eq!(fs::read(&t.data_path).unwrap(), data_before);
        assert_eq!(fs::read(&t.history_path).unwrap(), hist_before);
        assert!(!backup_path(&t.data_path).exists());
    }
}
