//! Locked, atomic access to the target .htaccess file
//!
//! A save is a single read-modify-write cycle under an exclusive advisory
//! lock: read the current bytes, let the caller compose the full
//! replacement text in memory, then write it to a temp file in the same
//! directory and rename it over the original. The original is never
//! truncated or partially written — if anything fails, it is untouched.
//!
//! An optional timestamped backup of the pre-edit content is written
//! before the rename; a corrupted rewrite file takes the whole site down,
//! so the copy is kept even though the rename itself is atomic.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Error, Result};

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file.
    pub fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| Error::io(&self.path, e))
    }

    /// Run one exclusive read-modify-write cycle.
    ///
    /// `compose` receives the file's current text and returns the full
    /// replacement text; it runs while the lock is held, so no other
    /// locked writer can interleave. `backup_dir`, when set, receives a
    /// timestamped copy of the pre-edit content.
    pub fn update<F>(&self, backup_dir: Option<&Path>, compose: F) -> Result<()>
    where
        F: FnOnce(&str) -> Result<String>,
    {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| Error::io(&self.path, e))?;

        lock_exclusive(&file).map_err(|e| Error::io(&self.path, e))?;

        let mut current = String::new();
        file.read_to_string(&mut current)
            .map_err(|e| Error::io(&self.path, e))?;

        let replacement = compose(&current)?;

        if let Some(dir) = backup_dir {
            self.write_backup(dir, &current)?;
        }

        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(parent).map_err(|e| Error::io(parent, e))?;
        temp.write_all(replacement.as_bytes())
            .map_err(|e| Error::io(&self.path, e))?;
        temp.flush().map_err(|e| Error::io(&self.path, e))?;

        // Keep the replaced file's permissions; the temp file is created
        // with a restrictive mode.
        if let Ok(metadata) = fs::metadata(&self.path) {
            let _ = fs::set_permissions(temp.path(), metadata.permissions());
        }

        temp.persist(&self.path)
            .map_err(|e| Error::io(&self.path, e.error))?;

        info!(path = %self.path.display(), bytes = replacement.len(), "file replaced atomically");

        // The lock on the old inode releases when `file` drops.
        drop(file);
        Ok(())
    }

    fn write_backup(&self, dir: &Path, content: &str) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let name = format!("{}.{stamp}.bak", file_name_of(&self.path));
        let backup_path = dir.join(name);

        fs::write(&backup_path, content).map_err(|e| Error::io(&backup_path, e))?;
        debug!(backup = %backup_path.display(), "pre-edit backup written");
        Ok(())
    }

    /// Most recent backup of this file in `dir`, by timestamped name.
    pub fn latest_backup(&self, dir: &Path) -> Result<Option<PathBuf>> {
        let prefix = format!("{}.", file_name_of(&self.path));
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(dir, e)),
        };

        let mut backups: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".bak"))
            })
            .collect();

        backups.sort();
        Ok(backups.pop())
    }

    /// Restore the most recent backup over the target file.
    pub fn restore_latest_backup(&self, dir: &Path) -> Result<PathBuf> {
        let backup = self.latest_backup(dir)?.ok_or_else(|| {
            Error::io(
                dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no backups found"),
            )
        })?;

        let content = fs::read_to_string(&backup).map_err(|e| Error::io(&backup, e))?;
        self.update(None, move |_| Ok(content))?;
        Ok(backup)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "htaccess".to_string())
}

#[cfg(unix)]
fn lock_exclusive(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn lock_exclusive(_file: &File) -> std::io::Result<()> {
    // No advisory locking off unix; the atomic rename still guarantees
    // readers never observe a partial file.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture(dir: &TempDir, content: &str) -> FileStore {
        let path = dir.path().join(".htaccess");
        fs::write(&path, content).unwrap();
        FileStore::new(path)
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("absent"));
        assert!(matches!(store.read(), Err(Error::Io { .. })));
    }

    #[test]
    fn test_update_replaces_content() {
        let dir = TempDir::new().unwrap();
        let store = fixture(&dir, "before\n");

        store.update(None, |current| {
            assert_eq!(current, "before\n");
            Ok("after\n".to_string())
        })
        .unwrap();

        assert_eq!(store.read().unwrap(), "after\n");
    }

    #[test]
    fn test_update_failure_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let store = fixture(&dir, "original\n");

        let result = store.update(None, |_| Err(Error::BlockNotFound));
        assert!(result.is_err());
        assert_eq!(store.read().unwrap(), "original\n");
    }

    #[test]
    fn test_update_writes_backup_of_old_content() {
        let dir = TempDir::new().unwrap();
        let store = fixture(&dir, "old content\n");
        let backups = dir.path().join("backups");

        store
            .update(Some(&backups), |_| Ok("new content\n".to_string()))
            .unwrap();

        let backup = store.latest_backup(&backups).unwrap().unwrap();
        assert_eq!(fs::read_to_string(backup).unwrap(), "old content\n");
    }

    #[test]
    fn test_restore_latest_backup() {
        let dir = TempDir::new().unwrap();
        let store = fixture(&dir, "v1\n");
        let backups = dir.path().join("backups");

        store.update(Some(&backups), |_| Ok("v2\n".to_string())).unwrap();
        store.restore_latest_backup(&backups).unwrap();

        assert_eq!(store.read().unwrap(), "v1\n");
    }

    #[test]
    fn test_latest_backup_none_without_dir() {
        let dir = TempDir::new().unwrap();
        let store = fixture(&dir, "x\n");
        assert!(store
            .latest_backup(&dir.path().join("nope"))
            .unwrap()
            .is_none());
    }
}
