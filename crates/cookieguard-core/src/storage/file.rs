use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::ConsentStorage;
use crate::error::StorageError;

/// One JSON file per key inside a directory.
///
/// Writes go to a temp file that is renamed over the target, so a reader
/// never sees a half-written record.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default location: `<data dir>/cookieguard`.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir()
            .or_else(dirs::home_dir)
            .map(|base| base.join("cookieguard"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Bytes outside `[A-Za-z0-9._-]` are written as
    /// `%XX`, so distinct keys never share a file.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut file = String::with_capacity(key.len() + 5);
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
                file.push(char::from(byte));
            } else {
                let _ = write!(file, "%{byte:02X}");
            }
        }
        file.push_str(".json");
        self.dir.join(file)
    }
}

impl ConsentStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Read {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let write_err = |e: std::io::Error| StorageError::Write {
            key: key.to_string(),
            message: e.to_string(),
        };

        std::fs::create_dir_all(&self.dir).map_err(write_err)?;

        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, value).map_err(write_err)?;
        std::fs::rename(&temp_path, &path).map_err(write_err)?;

        debug!(path = %path.display(), "wrote consent record");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Remove {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }
}
