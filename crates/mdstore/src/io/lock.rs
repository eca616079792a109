//! Cross-process directory locking
//!
//! A directory's critical section is guarded by `<dir>/.lock`. Two strategies
//! implement [`ExclusiveLock`]:
//!
//! - [`FlockLock`]: exclusive advisory lock on the marker's descriptor. The
//!   kernel drops it when the holder exits, so waiting is unbounded unless a
//!   `kernel_timeout` is configured.
//! - [`MarkerFileLock`]: create-exclusive marker file with a bounded retry
//!   loop. A marker older than `stale_after` is assumed abandoned and removed.
//!
//! [`PlatformLock`] picks the strategy at build time and [`with_lock`] uses it,
//! so callers never see which one is active.
//!
//! Only read-modify-write sequences need the lock. Plain reads are safe
//! without it because every write goes through [`atomic_write`].
//!
//! The lock is re-entrant per thread: while a thread holds `dir`, a nested
//! acquire of `dir` on that same thread returns a no-op guard instead of
//! waiting on itself. Other threads of the process still wait.
//!
//! [`atomic_write`]: crate::io::atomic::atomic_write

use crate::config::LockConfig;
use crate::io::atomic::ensure_dir;
use crate::io::error::StoreError;
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// File name of the lock marker inside a locked directory.
pub const LOCK_FILE_NAME: &str = ".lock";

/// Path of the lock marker for `dir`.
pub fn lock_path(dir: &Path) -> PathBuf {
    dir.join(LOCK_FILE_NAME)
}

/// Lock strategy selected for this build target.
#[cfg(unix)]
pub type PlatformLock = FlockLock;

/// Lock strategy selected for this build target.
#[cfg(not(unix))]
pub type PlatformLock = MarkerFileLock;

/// Directories locked by this process, keyed by canonical path, with the
/// thread that holds each.
static HELD_DIRS: OnceLock<Mutex<HashMap<PathBuf, ThreadId>>> = OnceLock::new();

fn held_dirs() -> MutexGuard<'static, HashMap<PathBuf, ThreadId>> {
    HELD_DIRS
        .get_or_init(Mutex::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Canonical form of `dir`, used as the re-entrancy key. `dir` must exist.
fn dir_key(dir: &Path) -> Result<PathBuf, StoreError> {
    fs::canonicalize(dir).map_err(|e| StoreError::io(dir, e))
}

/// A guard for `dir` if the current thread already holds it.
fn reenter(key: &Path, path: &Path) -> Option<LockGuard> {
    let holder = held_dirs().get(key).copied()?;
    if holder != thread::current().id() {
        return None;
    }
    debug!(path = %path.display(), "lock re-entered by holding thread");
    Some(LockGuard {
        path: path.to_path_buf(),
        key: key.to_path_buf(),
        held: Held::Nested,
    })
}

fn register(key: &Path) {
    held_dirs().insert(key.to_path_buf(), thread::current().id());
}

/// Guard for a held directory lock; the lock is released on drop
#[must_use = "the directory lock is released as soon as the guard is dropped"]
pub struct LockGuard {
    path: PathBuf,
    key: PathBuf,
    held: Held,
}

enum Held {
    Kernel(File),
    Marker,
    /// Re-entered by the holding thread; the outer guard releases.
    Nested,
}

impl LockGuard {
    /// Path of the lock marker backing this guard.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when this guard re-entered a lock its thread already held.
    pub fn is_nested(&self) -> bool {
        matches!(self.held, Held::Nested)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.is_nested() {
            return;
        }
        // Unregister before unlocking so a new holder's entry is never removed.
        held_dirs().remove(&self.key);
        match &self.held {
            Held::Nested => {}
            Held::Kernel(file) => {
                let _ = FileExt::unlock(file);
            }
            Held::Marker => match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove lock marker {}: {e}", self.path.display()),
            },
        }
        debug!(path = %self.path.display(), "lock released");
    }
}

/// Mutual exclusion over a directory, shared by unrelated processes
pub trait ExclusiveLock {
    /// Block until `dir` is locked by this caller.
    ///
    /// Creates `dir` first, so a missing directory never causes a lock failure.
    /// If the current thread already holds `dir`, returns a nested guard
    /// immediately.
    fn acquire(&self, dir: &Path) -> Result<LockGuard, StoreError>;

    /// Run `work` while holding the lock on `dir`.
    ///
    /// Returns the work's own result. The lock is released before returning,
    /// whether `work` succeeds, fails, or panics.
    ///
    /// # Errors
    ///
    /// Lock acquisition failures (`LockTimeout`, `Io`) are converted into `E`
    /// and `work` is not run.
    ///
    /// # Deadlocks
    ///
    /// `work` may itself lock `dir` again (for example through `append_yaml`
    /// on a document in `dir`) on the same thread. It must not wait on another
    /// thread that locks `dir`: that thread blocks until `work` returns.
    fn with_lock<T, E, F>(&self, dir: &Path, work: F) -> Result<T, E>
    where
        Self: Sized,
        E: From<StoreError>,
        F: FnOnce() -> Result<T, E>,
    {
        let _guard = self.acquire(dir)?;
        work()
    }
}

/// Kernel-assisted advisory lock (`flock(LOCK_EX)` on Unix)
#[derive(Debug, Clone)]
pub struct FlockLock {
    timeout: Option<Duration>,
    retry_interval: Duration,
}

impl FlockLock {
    pub fn new(config: &LockConfig) -> Self {
        Self {
            timeout: config.kernel_timeout(),
            retry_interval: config.retry_interval(),
        }
    }

    /// Poll a non-blocking lock request until `timeout` elapses.
    fn lock_with_deadline(
        &self,
        file: &File,
        path: &Path,
        timeout: Duration,
    ) -> Result<(), StoreError> {
        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(()),
                Err(e) if is_contended(&e) => {}
                Err(e) => return Err(StoreError::io(path, e)),
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(StoreError::LockTimeout {
                    path: path.to_path_buf(),
                    waited,
                });
            }
            thread::sleep(self.retry_interval.min(timeout - waited));
        }
    }
}

impl Default for FlockLock {
    fn default() -> Self {
        Self::new(&LockConfig::default())
    }
}

impl ExclusiveLock for FlockLock {
    fn acquire(&self, dir: &Path) -> Result<LockGuard, StoreError> {
        ensure_dir(dir)?;
        let path = lock_path(dir);
        let key = dir_key(dir)?;
        if let Some(guard) = reenter(&key, &path) {
            return Ok(guard);
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;

        match self.timeout {
            Some(timeout) => self.lock_with_deadline(&file, &path, timeout)?,
            None => file
                .lock_exclusive()
                .map_err(|e| StoreError::io(&path, e))?,
        }

        register(&key);
        debug!(path = %path.display(), "kernel lock acquired");
        Ok(LockGuard {
            path,
            key,
            held: Held::Kernel(file),
        })
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Create-exclusive marker file lock with stale-marker recovery
#[derive(Debug, Clone)]
pub struct MarkerFileLock {
    retry_interval: Duration,
    stale_after: Duration,
    timeout: Duration,
}

impl MarkerFileLock {
    pub fn new(config: &LockConfig) -> Self {
        Self {
            retry_interval: config.retry_interval(),
            stale_after: config.stale_after(),
            timeout: config.timeout(),
        }
    }

    /// Remove the marker if its last modification is older than `stale_after`.
    ///
    /// Returns `true` when a stale marker was removed (or vanished meanwhile),
    /// meaning the caller should retry immediately.
    fn reclaim_if_stale(&self, path: &Path) -> bool {
        let modified = match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            // Holder released between our create attempt and the stat.
            Err(e) if e.kind() == ErrorKind::NotFound => return true,
            Err(_) => return false,
        };
        // Clock skew can put mtime in the future; treat that as fresh.
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age <= self.stale_after {
            return false;
        }

        warn!(
            path = %path.display(),
            age_ms = age.as_millis() as u64,
            "reclaiming stale lock marker"
        );
        match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(_) => false,
        }
    }
}

impl Default for MarkerFileLock {
    fn default() -> Self {
        Self::new(&LockConfig::default())
    }
}

impl ExclusiveLock for MarkerFileLock {
    fn acquire(&self, dir: &Path) -> Result<LockGuard, StoreError> {
        ensure_dir(dir)?;
        let path = lock_path(dir);
        let key = dir_key(dir)?;
        if let Some(guard) = reenter(&key, &path) {
            return Ok(guard);
        }
        let started = Instant::now();

        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(_) => {
                    register(&key);
                    debug!(path = %path.display(), "lock marker created");
                    return Ok(LockGuard {
                        path,
                        key,
                        held: Held::Marker,
                    });
                }
                Err(e) if is_marker_contended(&e) => {}
                Err(e) => return Err(StoreError::io(&path, e)),
            }

            if self.reclaim_if_stale(&path) {
                continue;
            }

            let waited = started.elapsed();
            if waited >= self.timeout {
                return Err(StoreError::LockTimeout { path, waited });
            }
            thread::sleep(self.retry_interval);
        }
    }
}

fn is_marker_contended(err: &std::io::Error) -> bool {
    // Windows reports a marker that is being deleted as access denied.
    err.kind() == ErrorKind::AlreadyExists
        || (cfg!(windows) && err.kind() == ErrorKind::PermissionDenied)
}

/// Run `work` under the platform lock for `dir`, configured from the environment.
///
/// See [`ExclusiveLock::with_lock`] for the contract, including which nested
/// uses of the same directory are safe.
pub fn with_lock<T, E, F>(dir: &Path, work: F) -> Result<T, E>
where
    E: From<StoreError>,
    F: FnOnce() -> Result<T, E>,
{
    with_lock_config(dir, &LockConfig::from_env(), work)
}

/// Run `work` under the platform lock for `dir` with explicit timing.
pub fn with_lock_config<T, E, F>(dir: &Path, config: &LockConfig, work: F) -> Result<T, E>
where
    E: From<StoreError>,
    F: FnOnce() -> Result<T, E>,
{
    PlatformLock::new(config).with_lock(dir, work)
}
