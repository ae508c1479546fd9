//! Registry state persisted between invocations as a JSON snapshot.

use anyhow::{Context, Result};
use fs2::FileExt;
use notary_registry::{RegistryPolicy, RegistryService, RegistrySnapshot};
use notary_time::Clock;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::debug;

/// Advisory lock on `<state>.lock`, released on drop.
///
/// Writers hold it exclusively from loading the state file until the new
/// snapshot has replaced it; readers hold it shared.
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
    file: File,
}

impl StateLock {
    /// Block until no other process holds the lock.
    pub fn exclusive(state_path: &Path) -> Result<Self> {
        let dir = state_dir(state_path);
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create state directory {}", dir.display()))?;

        let lock = Self::open(state_path)?;
        FileExt::lock_exclusive(&lock.file)
            .with_context(|| format!("failed to lock {}", lock.path.display()))?;
        debug!(path = %lock.path.display(), "holding exclusive state lock");
        Ok(lock)
    }

    /// Block while a writer holds the lock. Returns `None` when there is no
    /// state file to read yet.
    pub fn shared(state_path: &Path) -> Result<Option<Self>> {
        if !state_path.exists() {
            return Ok(None);
        }

        let lock = Self::open(state_path)?;
        FileExt::lock_shared(&lock.file)
            .with_context(|| format!("failed to lock {}", lock.path.display()))?;
        debug!(path = %lock.path.display(), "holding shared state lock");
        Ok(Some(lock))
    }

    fn open(state_path: &Path) -> Result<Self> {
        let path = lock_path(state_path);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("failed to open lock file {}", path.display()))?;
        Ok(Self { path, file })
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        // The lock file stays: removing it would let a waiter lock an
        // unlinked inode while a newcomer locks a fresh file.
        let _ = FileExt::unlock(&self.file);
    }
}

/// `state.json` -> `state.json.lock`
pub fn lock_path(state_path: &Path) -> PathBuf {
    let mut name = state_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

fn state_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Open the registry stored at `path`, or an empty one if the file does not
/// exist yet.
pub fn load_registry(
    path: &Path,
    clock: Arc<dyn Clock>,
    policy: RegistryPolicy,
) -> Result<RegistryService> {
    if !path.exists() {
        debug!(path = %path.display(), "no state file, starting empty registry");
        return Ok(RegistryService::new(clock, policy));
    }

    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read state file {}", path.display()))?;
    let snapshot = RegistrySnapshot::from_json(&json)
        .with_context(|| format!("failed to parse state file {}", path.display()))?;
    RegistryService::restore(snapshot, clock, policy)
        .with_context(|| format!("state file {} is inconsistent", path.display()))
}

/// Write the committed registry state to `path`.
///
/// The snapshot goes to a temporary file in the same directory which is then
/// renamed over `path`, so readers see either the old or the new state.
pub fn save_registry(path: &Path, registry: &RegistryService) -> Result<()> {
    let json = registry
        .snapshot()
        .to_json()
        .context("failed to encode registry snapshot")?;

    let dir = state_dir(path);
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create state directory {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(json.as_bytes())
        .context("failed to write registry snapshot")?;
    tmp.as_file()
        .sync_all()
        .context("failed to flush registry snapshot")?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to replace state file {}", path.display()))?;

    debug!(path = %path.display(), bytes = json.len(), "state file written");
    Ok(())
}
