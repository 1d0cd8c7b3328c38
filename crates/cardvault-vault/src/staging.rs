// SPDX-FileCopyrightText: 2026 Cardvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session-unique staging files for providers that read ciphertext from disk.
//!
//! Every artifact is created with a fresh UUID name, mode 0600, and is
//! registered in a [`StagingRegistry`] until erased. Erasure overwrites the
//! file with zeros, syncs it, and unlinks it. The registry lets a signal
//! handler purge whatever is live when the process is asked to stop.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cardvault_config::model::StagingConfig;
use cardvault_core::VaultError;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Paths of staged artifacts that have not been erased yet.
///
/// Cloning shares the underlying set.
#[derive(Debug, Clone, Default)]
pub struct StagingRegistry {
    live: Arc<Mutex<HashSet<PathBuf>>>,
}

impl StagingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        // The set stays consistent even if a holder panicked.
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, path: PathBuf) {
        self.lock().insert(path);
    }

    fn remove(&self, path: &Path) {
        self.lock().remove(path);
    }

    fn contains(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    /// Snapshot of live artifact paths.
    pub fn live(&self) -> Vec<PathBuf> {
        self.lock().iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Erase every live artifact. Used on SIGINT/SIGTERM.
    ///
    /// Keeps going after a failure so one bad file does not leave the rest on
    /// disk; the first failure is returned.
    pub fn purge_all(&self) -> Result<usize, VaultError> {
        let paths = self.live();
        let mut purged = 0;
        let mut first_err = None;
        for path in paths {
            match scrub(&path) {
                Ok(()) => {
                    self.remove(&path);
                    purged += 1;
                }
                Err(source) => {
                    error!(path = %path.display(), error = %source, "failed to erase staged artifact");
                    if first_err.is_none() {
                        first_err = Some(VaultError::CleanupFailed { path, source });
                    }
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(purged),
        }
    }
}

/// Where staged artifacts live and what they are called.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
    prefix: String,
    registry: StagingRegistry,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            registry: StagingRegistry::new(),
        }
    }

    pub fn from_config(config: &StagingConfig) -> Self {
        Self::new(&config.dir, config.prefix.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn registry(&self) -> &StagingRegistry {
        &self.registry
    }

    /// Create the staging directory if missing, readable only by its owner.
    /// An existing directory is left as it is.
    pub fn ensure_dir(&self) -> Result<(), VaultError> {
        create_private_dir(&self.dir).map_err(|e| {
            VaultError::Internal(format!(
                "cannot create staging directory {}: {e}",
                self.dir.display()
            ))
        })
    }

    /// Write `contents` to a new session-unique file.
    ///
    /// The artifact is registered before any byte is written, and a partial
    /// write is erased by the artifact's drop.
    pub fn stage(&self, contents: &[u8]) -> Result<StagedArtifact, VaultError> {
        let path = self
            .dir
            .join(format!("{}{}", self.prefix, Uuid::new_v4().simple()));

        let mut file = create_private(&path).map_err(|e| {
            VaultError::Internal(format!("cannot create staging file {}: {e}", path.display()))
        })?;
        self.registry.insert(path.clone());
        let artifact = StagedArtifact {
            path,
            registry: self.registry.clone(),
            erased: false,
        };

        file.write_all(contents)
            .and_then(|()| file.sync_all())
            .map_err(|e| {
                VaultError::Internal(format!(
                    "cannot write staging file {}: {e}",
                    artifact.path.display()
                ))
            })?;

        debug!(path = %artifact.path.display(), "ciphertext staged");
        Ok(artifact)
    }

    /// Erase leftovers from a previous unclean exit.
    ///
    /// Only regular files carrying this area's prefix are touched, and files
    /// owned by live sessions in this process are skipped. A missing staging
    /// directory is not an error.
    pub fn purge_stale(&self) -> Result<usize, VaultError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(VaultError::Internal(format!(
                    "cannot read staging directory {}: {e}",
                    self.dir.display()
                )));
            }
        };

        let mut purged = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let is_ours = name.to_str().is_some_and(|n| n.starts_with(&self.prefix));
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            let path = entry.path();
            if !is_ours || !is_file || self.registry.contains(&path) {
                continue;
            }
            scrub(&path).map_err(|source| VaultError::CleanupFailed {
                path: path.clone(),
                source,
            })?;
            warn!(path = %path.display(), "erased stale staging artifact");
            purged += 1;
        }
        Ok(purged)
    }
}

/// A staged ciphertext file. Erased exactly once, explicitly or on drop.
#[derive(Debug)]
pub struct StagedArtifact {
    path: PathBuf,
    registry: StagingRegistry,
    erased: bool,
}

impl StagedArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite, sync, and remove the file.
    ///
    /// On failure the path stays registered so a later purge can retry.
    pub fn erase(mut self) -> Result<(), VaultError> {
        self.erased = true;
        self.erase_in_place()
            .map_err(|source| VaultError::CleanupFailed {
                path: self.path.clone(),
                source,
            })
    }

    fn erase_in_place(&self) -> io::Result<()> {
        scrub(&self.path)?;
        self.registry.remove(&self.path);
        debug!(path = %self.path.display(), "staged artifact erased");
        Ok(())
    }
}

impl Drop for StagedArtifact {
    fn drop(&mut self) {
        if self.erased {
            return;
        }
        if let Err(e) = self.erase_in_place() {
            // No caller to report to and the artifact may still be on disk.
            error!(
                path = %self.path.display(),
                error = %e,
                "failed to erase staged artifact on drop, aborting"
            );
            std::process::abort();
        }
    }
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

#[cfg(unix)]
fn create_private(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// Zero-fill, fsync, and unlink. A file that is already gone counts as erased.
fn scrub(path: &Path) -> io::Result<()> {
    let mut file = match OpenOptions::new().write(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let zeros = [0u8; 4096];
    let mut remaining = file.metadata()?.len();
    while remaining > 0 {
        let chunk = remaining.min(zeros.len() as u64) as usize;
        file.write_all(&zeros[..chunk])?;
        remaining -= chunk as u64;
    }
    file.sync_all()?;
    drop(file);

    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
