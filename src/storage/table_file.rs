//! Table file
//!
//! Atomic whole-file replacement for a single table.
//!
//! ## Write protocol
//! 1. Write bytes to `<table>.tmp.<millis>.<suffix>` in the same directory
//! 2. Durable mode: fsync the temp file
//! 3. Rename the temp file over `<table>`
//! 4. Durable mode: fsync the directory (best effort)
//!
//! Any failure before the rename removes the temp file. Readers only ever see
//! the previous complete file or the new complete file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use tracing::warn;

use crate::config::SyncMode;
use crate::validation::TEMP_MARKER;

/// Handle on the single file backing one table
#[derive(Debug, Clone)]
pub struct TableFile {
    path: PathBuf,
}

impl TableFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the whole file. A missing file is `Ok(None)`.
    pub fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Replace the file contents atomically
    pub fn write_atomic(&self, bytes: &[u8], mode: SyncMode) -> io::Result<()> {
        self.stage(bytes, mode)?.commit()
    }

    /// Steps 1-2 of the protocol: bytes are on disk under a temp name but the
    /// table file is untouched until `commit`.
    pub fn stage(&self, bytes: &[u8], mode: SyncMode) -> io::Result<StagedWrite> {
        let temp_path = self.temp_path();

        let staged = StagedWrite {
            temp_path,
            target: self.path.clone(),
            mode,
            committed: false,
        };

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staged.temp_path)?;
        file.write_all(bytes)?;
        file.flush()?;

        if mode.is_durable() {
            file.sync_all()?;
        }

        Ok(staged)
    }

    /// Remove the file. Returns whether it existed.
    pub fn remove(&self) -> io::Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// `<table>.tmp.<millis>.<8 hex chars>`
    fn temp_path(&self) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let suffix: u32 = rand::thread_rng().gen();

        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!("{}{}.{:08x}", TEMP_MARKER, millis, suffix));
        self.path.with_file_name(name)
    }
}

/// A written but not yet published table snapshot.
///
/// Dropping it without calling `commit` deletes the temp file and leaves the
/// table file as it was.
#[derive(Debug)]
pub struct StagedWrite {
    temp_path: PathBuf,
    target: PathBuf,
    mode: SyncMode,
    committed: bool,
}

impl StagedWrite {
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Steps 3-4: publish via rename
    pub fn commit(mut self) -> io::Result<()> {
        fs::rename(&self.temp_path, &self.target)?;
        self.committed = true;

        if self.mode.is_durable() {
            if let Some(dir) = self.target.parent() {
                if let Err(e) = sync_dir(dir) {
                    warn!(dir = %dir.display(), error = %e, "directory fsync failed");
                }
            }
        }

        Ok(())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

// Directories cannot be opened for fsync here.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// True when `file_name` is a temp file produced by `TableFile::stage`
pub fn is_temp_file_name(file_name: &str) -> bool {
    file_name.contains(TEMP_MARKER)
}
