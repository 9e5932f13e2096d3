use std::{
    fs, io,
    path::{Path, PathBuf},
};

use blockchat_ops_common::{files, logger};
use chrono::Utc;
use ethers::types::H256;
use serde::{Deserialize, Serialize};

use crate::error::ChainError;

/// On-disk marker that a task is in flight. Presence/absence is the
/// protocol surface; the content is a resume-token detail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskLock {
    pub task: String,
    pub created_at_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub submitted_tx: Option<H256>,
}

impl TaskLock {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            created_at_ms: Utc::now().timestamp_millis(),
            submitted_tx: None,
        }
    }
}

/// One lock file per task name under the lock root.
#[derive(Debug, Clone)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the lock, if any. An unreadable lock file still counts as
    /// evidence of an unfinished run rather than being discarded.
    pub fn load(&self) -> Result<Option<TaskLock>, ChainError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ChainError::LockIo {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        match serde_json::from_str(&text) {
            Ok(lock) => Ok(Some(lock)),
            Err(_) => {
                logger::warn(format!(
                    "lock file {} is unreadable; treating it as an unfinished run",
                    self.path.display()
                ));
                Ok(Some(TaskLock {
                    task: String::new(),
                    created_at_ms: 0,
                    submitted_tx: None,
                }))
            }
        }
    }

    pub fn create(&self, lock: &TaskLock) -> Result<(), ChainError> {
        let text = serde_json::to_string_pretty(lock).expect("lock serializes to JSON");
        files::write_atomic(&self.path, text.as_bytes()).map_err(|source| ChainError::LockIo {
            path: self.path.clone(),
            source,
        })
    }

    /// Record the submitted transaction hash as the resume token. The
    /// task name is re-stamped so a rewrite of an unreadable lock stays
    /// attributable.
    pub fn record_submission(&self, task: &str, tx_hash: H256) -> Result<(), ChainError> {
        let mut lock = self.load()?.unwrap_or_else(|| TaskLock::new(task));
        if lock.task.is_empty() {
            lock.task = task.to_string();
        }
        lock.submitted_tx = Some(tx_hash);
        self.create(&lock)
    }

    pub fn remove(&self) -> Result<(), ChainError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                logger::warn(format!(
                    "lock file {} was already gone",
                    self.path.display()
                ));
                Ok(())
            }
            Err(source) => Err(ChainError::LockIo {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_load_remove() {
        let dir = tempfile::tempdir().unwrap();
        let lock_file = LockFile::new(dir.path().join("BlockChat:update.lock"));
        assert!(lock_file.load().unwrap().is_none());

        let lock = TaskLock::new("BlockChat:update");
        lock_file.create(&lock).unwrap();
        assert_eq!(lock_file.load().unwrap().unwrap(), lock);

        lock_file.remove().unwrap();
        assert!(!lock_file.exists());
        // removing an absent lock is tolerated
        lock_file.remove().unwrap();
    }

    #[test]
    fn records_resume_token() {
        let dir = tempfile::tempdir().unwrap();
        let lock_file = LockFile::new(dir.path().join("task.lock"));
        lock_file.create(&TaskLock::new("task")).unwrap();

        let tx = H256::repeat_byte(0xaa);
        lock_file.record_submission("task", tx).unwrap();

        let lock = lock_file.load().unwrap().unwrap();
        assert_eq!(lock.task, "task");
        assert_eq!(lock.submitted_tx, Some(tx));
    }

    #[test]
    fn rewritten_garbage_lock_keeps_task_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.lock");
        fs::write(&path, "not json at all").unwrap();

        let lock_file = LockFile::new(path);
        let tx = H256::repeat_byte(0x10);
        lock_file
            .record_submission("BlockChat:update", tx)
            .unwrap();

        let lock = lock_file.load().unwrap().unwrap();
        assert_eq!(lock.task, "BlockChat:update");
        assert_eq!(lock.submitted_tx, Some(tx));
    }

    #[test]
    fn garbage_lock_still_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.lock");
        fs::write(&path, "not json at all").unwrap();

        let lock_file = LockFile::new(path);
        // still reported as present, so load() will refuse to proceed
        assert!(lock_file.load().unwrap().is_some());
    }
}
