//! JSON file-backed client storage
//!
//! The whole key space is one JSON object on disk. Every `set_many` /
//! `remove_many` rewrites the file through a sibling temp file and a rename,
//! so readers see either the old or the new map, never a partial write.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use spoticizr_common::auth::{ClientStorage, StorageError};
use tracing::{debug, warn};

type Entries = BTreeMap<String, String>;

/// [`ClientStorage`] persisted to a single JSON file
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file at `path`
    ///
    /// A missing file is an empty store. The file is only created on the
    /// first write.
    ///
    /// # Errors
    /// Returns [`StorageError::Io`] if the file exists but cannot be read and
    /// [`StorageError::Serialization`] if it is not a JSON string map.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Entries::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                StorageError::Serialization(format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Entries::new(),
            Err(e) => return Err(StorageError::Io(format!("{}: {e}", path.display()))),
        };

        debug!(path = %path.display(), keys = entries.len(), "Opened client storage");
        Ok(Self { path, entries: Mutex::new(entries) })
    }

    /// Location of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `update` to a copy of the map, persist it, then publish it
    ///
    /// The in-memory map only changes once the file write succeeded.
    fn commit(&self, update: impl FnOnce(&mut Entries)) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        update(&mut next);
        if next == *entries {
            return Ok(());
        }

        write_atomically(&self.path, &next)?;
        *entries = next;
        Ok(())
    }
}

impl ClientStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        self.commit(|map| {
            for (key, value) in entries {
                map.insert((*key).to_string(), value.clone());
            }
        })
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.commit(|map| {
            for key in keys {
                map.remove(*key);
            }
        })
    }
}

fn write_atomically(path: &Path, entries: &Entries) -> Result<(), StorageError> {
    let io_err = |e: std::io::Error| StorageError::Io(format!("{}: {e}", path.display()));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = serde_json::to_vec_pretty(entries)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let result = (|| {
        let mut file = open_private(&tmp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = result {
        if let Err(cleanup) = fs::remove_file(&tmp_path) {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %cleanup, "Failed to remove temporary storage file");
            }
        }
        return Err(io_err(e));
    }
    Ok(())
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new().write(true).create(true).truncate(true).mode(0o600).open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new().write(true).create(true).truncate(true).open(path)
}
