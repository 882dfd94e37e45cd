//! Persistence backends for the consent record.
//!
//! A backend stores opaque strings under a key, the way browser
//! `localStorage` does. The consent store owns the key and the format.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::StorageError;

/// Key/value persistence used by the consent store.
pub trait ConsentStorage: Send + Sync {
    /// Stored value, or `None` if nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value under `key` in a single write.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
