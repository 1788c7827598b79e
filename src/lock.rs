//! Cross-process, per-project locks.
//!
//! A lock is an exclusively created file under `<base>/.locks/`. Acquisition
//! polls with a bounded timeout; release happens in `Drop`, so the guard is
//! released on every exit path. A marker left behind by a crashed process is
//! reclaimed once its mtime is older than the stale threshold, so a project
//! can never become permanently unlockable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

use crate::errors::{RegistryError, Result};
use crate::registry::dir_slug;

/// Subdirectory of the base directory holding lock files.
pub const LOCKS_DIR: &str = ".locks";

/// How long `acquire` waits before giving up with `LockTimeout`.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Age after which a lock file is considered abandoned. Guards are held only
/// for the duration of one structural operation, so a marker this old can
/// only belong to a crashed holder.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Owner information recorded inside a lock file, for diagnostics.
#[derive(Debug, Serialize, Deserialize)]
struct LockOwner {
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// Hands out per-project-name lock guards.
#[derive(Debug, Clone)]
pub struct LockManager {
    locks_dir: PathBuf,
    acquire_timeout: Duration,
    stale_after: Duration,
}

impl LockManager {
    /// Lock manager for the given base directory, with default timeouts.
    pub fn new(base_dir: &Path) -> Self {
        Self::with_timeouts(base_dir, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_STALE_AFTER)
    }

    /// Lock manager with explicit acquire timeout and stale threshold.
    pub fn with_timeouts(base_dir: &Path, acquire_timeout: Duration, stale_after: Duration) -> Self {
        Self {
            locks_dir: base_dir.join(LOCKS_DIR),
            acquire_timeout,
            stale_after,
        }
    }

    /// Acquire the lock for `name`, blocking up to the acquire timeout.
    ///
    /// On timeout the caller gets `LockTimeout` and no state has been
    /// mutated.
    pub fn acquire(&self, name: &str) -> Result<LockGuard> {
        fs::create_dir_all(&self.locks_dir)
            .map_err(|err| RegistryError::io("create locks directory", &self.locks_dir, err))?;

        let path = self.locks_dir.join(format!("{}.lock", dir_slug(name)));
        let deadline = Instant::now() + self.acquire_timeout;

        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let owner = LockOwner {
                        pid: std::process::id(),
                        acquired_at: Utc::now(),
                    };
                    let payload = match serde_json::to_vec(&owner) {
                        Ok(payload) => payload,
                        Err(err) => {
                            let _ = fs::remove_file(&path);
                            return Err(RegistryError::Encode {
                                path: path.clone(),
                                detail: err.to_string(),
                            });
                        }
                    };
                    if let Err(err) = file.write_all(&payload).and_then(|()| file.sync_all()) {
                        let _ = fs::remove_file(&path);
                        return Err(RegistryError::io("write lock file", &path, err));
                    }
                    debug!(project = name, "acquired lock");
                    return Ok(LockGuard {
                        path,
                        name: name.to_string(),
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    if self.is_stale(&path) {
                        warn!(project = name, path = %path.display(), "reclaiming stale lock");
                        // Another waiter may reclaim it first; that's fine
                        match fs::remove_file(&path) {
                            Ok(()) => continue,
                            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                            Err(err) => {
                                return Err(RegistryError::io("remove stale lock", &path, err))
                            }
                        }
                    }
                    if Instant::now() >= deadline {
                        return Err(RegistryError::LockTimeout(name.to_string()));
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(err) => return Err(RegistryError::io("create lock file", &path, err)),
            }
        }
    }

    fn is_stale(&self, path: &Path) -> bool {
        // If the file vanished, the next create_new attempt settles it
        let Ok(meta) = fs::metadata(path) else {
            return false;
        };
        let Ok(modified) = meta.modified() else {
            return false;
        };
        SystemTime::now()
            .duration_since(modified)
            .map(|age| age >= self.stale_after)
            .unwrap_or(false)
    }
}

/// Exclusive hold on one project name. Dropping it releases the lock.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    name: String,
}

impl LockGuard {
    /// Name this guard locks.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(project = %self.name, error = %err, "failed to remove lock file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn quick_manager(base: &Path) -> LockManager {
        LockManager::with_timeouts(base, Duration::from_millis(100), DEFAULT_STALE_AFTER)
    }

    #[test]
    fn test_acquire_and_release() {
        let dir = tempdir().unwrap();
        let manager = quick_manager(dir.path());

        let guard = manager.acquire("alpha").unwrap();
        let lock_path = dir.path().join(LOCKS_DIR).join(format!("{}.lock", dir_slug("alpha")));
        assert!(lock_path.exists());

        drop(guard);
        assert!(!lock_path.exists());
    }

    #[test]
    fn test_second_acquire_times_out_while_held() {
        let dir = tempdir().unwrap();
        let manager = quick_manager(dir.path());

        let _guard = manager.acquire("alpha").unwrap();
        let err = manager.acquire("alpha").unwrap_err();
        assert!(matches!(err, RegistryError::LockTimeout(name) if name == "alpha"));
    }

    #[test]
    fn test_different_names_do_not_contend() {
        let dir = tempdir().unwrap();
        let manager = quick_manager(dir.path());

        let _a = manager.acquire("alpha").unwrap();
        let _b = manager.acquire("beta").unwrap();
    }

    #[test]
    fn test_release_then_reacquire() {
        let dir = tempdir().unwrap();
        let manager = quick_manager(dir.path());

        drop(manager.acquire("alpha").unwrap());
        let _again = manager.acquire("alpha").unwrap();
    }

    #[test]
    fn test_stale_lock_is_reclaimed() {
        let dir = tempdir().unwrap();

        // Held by a "crashed" holder: leak the guard so the file stays behind
        let crashed = LockManager::with_timeouts(
            dir.path(),
            Duration::from_millis(100),
            Duration::from_secs(30),
        );
        std::mem::forget(crashed.acquire("alpha").unwrap());

        // With a zero stale threshold the leftover marker is immediately stale
        let manager =
            LockManager::with_timeouts(dir.path(), Duration::from_millis(100), Duration::ZERO);
        let _guard = manager.acquire("alpha").unwrap();
    }

    #[test]
    fn test_exclusion_across_threads() {
        let dir = tempdir().unwrap();
        let counter = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let base = dir.path().to_path_buf();
                let counter = counter.clone();
                scope.spawn(move || {
                    let manager = LockManager::with_timeouts(
                        &base,
                        Duration::from_secs(5),
                        DEFAULT_STALE_AFTER,
                    );
                    let _guard = manager.acquire("shared").unwrap();
                    // While the guard is held, nobody else may be inside
                    let inside = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    assert_eq!(inside, 0);
                    std::thread::sleep(Duration::from_millis(10));
                    counter.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
                });
            }
        });
    }
}
