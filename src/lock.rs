//! Cross-process lock around an update cycle.
//!
//! Two updaters pointed at the same scratch directory would clear and clone
//! into it concurrently. [`ScratchLock`] serializes them with an OS file lock
//! keyed on the absolute scratch path, so it holds across processes as well
//! as across `Updater` instances in one process.
//!
//! # Lock File Location
//!
//! `{temp_dir}/git-autoupdate-locks/{key}.lock`, where `key` is the first 16
//! hex characters of the SHA-256 of the normalized absolute scratch path. Lock
//! files are left in place after release; deleting one while another process
//! waits on it would let a third process lock a fresh file.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::LOCKS_DIR_NAME;
use crate::utils::fs::{fs_error, normalize_path};

/// An exclusive lock on a scratch directory, released on drop.
#[derive(Debug)]
pub struct ScratchLock {
    /// The file handle - lock is released when this is dropped
    _file: File,
    lock_path: PathBuf,
}

impl Drop for ScratchLock {
    fn drop(&mut self) {
        debug!(lock = %self.lock_path.display(), "Scratch lock released");
    }
}

impl ScratchLock {
    /// Acquires the lock for `scratch_dir`, waiting as long as another holder
    /// keeps it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::core::UpdateError::FileSystemError`] if the lock
    /// directory or file cannot be created or locked.
    pub async fn acquire(scratch_dir: &Path) -> Result<Self> {
        Self::acquire_in(&std::env::temp_dir().join(LOCKS_DIR_NAME), scratch_dir).await
    }

    /// Acquires the lock for `scratch_dir` with lock files under `locks_dir`.
    pub async fn acquire_in(locks_dir: &Path, scratch_dir: &Path) -> Result<Self> {
        let lock_path = locks_dir.join(format!("{}.lock", lock_key(scratch_dir)?));
        debug!(
            lock = %lock_path.display(),
            scratch = %scratch_dir.display(),
            "Waiting for scratch lock"
        );

        tokio::fs::create_dir_all(locks_dir)
            .await
            .map_err(|e| fs_error("create lock directory", locks_dir, e))?;

        // Opening and locking both block; keep them off the runtime threads
        let path = lock_path.clone();
        let file = tokio::task::spawn_blocking(move || -> Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(false)
                .open(&path)
                .map_err(|e| fs_error("open lock file", &path, e))?;
            file.lock_exclusive().map_err(|e| fs_error("lock", &path, e))?;
            Ok(file)
        })
        .await
        .context("spawn_blocking panicked")??;

        debug!(lock = %lock_path.display(), "Scratch lock acquired");
        Ok(Self {
            _file: file,
            lock_path,
        })
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

/// Lock file stem for `scratch_dir`.
fn lock_key(scratch_dir: &Path) -> Result<String> {
    let absolute = std::path::absolute(scratch_dir)
        .map_err(|e| fs_error("resolve scratch path", scratch_dir, e))?;
    let digest = Sha256::digest(normalize_path(&absolute).to_string_lossy().as_bytes());
    Ok(hex::encode(digest)[..16].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;
    use tokio::sync::Barrier;

    #[test]
    fn test_lock_key_is_stable_and_normalized() {
        let a = lock_key(Path::new("/srv/app/temp-update")).unwrap();
        let b = lock_key(Path::new("/srv/app/./sub/../temp-update")).unwrap();
        let c = lock_key(Path::new("/srv/other/temp-update")).unwrap();

        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_lock_file_is_created_and_kept() {
        let temp = TempDir::new().unwrap();
        let locks = temp.path().join("locks");

        let lock = ScratchLock::acquire_in(&locks, &temp.path().join("scratch")).await.unwrap();
        let path = lock.path().to_path_buf();
        assert!(path.exists());

        drop(lock);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_lock_is_exclusive() {
        let temp = TempDir::new().unwrap();
        let locks = Arc::new(temp.path().join("locks"));
        let scratch = Arc::new(temp.path().join("scratch"));
        let barrier = Arc::new(Barrier::new(2));

        let (locks1, scratch1, barrier1) = (locks.clone(), scratch.clone(), barrier.clone());
        let holder = tokio::spawn(async move {
            let _lock = ScratchLock::acquire_in(&locks1, &scratch1).await.unwrap();
            barrier1.wait().await;
            tokio::time::sleep(Duration::from_millis(150)).await;
        });

        barrier.wait().await;
        let start = Instant::now();
        let _lock = ScratchLock::acquire_in(&locks, &scratch).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(100));

        holder.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_scratch_dirs_do_not_block() {
        let temp = TempDir::new().unwrap();
        let locks = temp.path().join("locks");

        let _a = ScratchLock::acquire_in(&locks, &temp.path().join("a")).await.unwrap();
        let b = tokio::time::timeout(
            Duration::from_secs(5),
            ScratchLock::acquire_in(&locks, &temp.path().join("b")),
        )
        .await;
        assert!(b.is_ok());
    }
}
