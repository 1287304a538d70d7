//! Non-volatile storage backends
//!
//! A backend stores opaque byte blobs under a namespace name. The settings
//! layer owns the encoding; backends only move bytes.

pub mod sd_card;

extern crate alloc;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use thiserror_no_std::Error;

pub use sd_card::SdCardBackend;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage is unavailable")]
    Unavailable,
    #[error("failed to open {what}")]
    OpenFailed { what: &'static str },
    #[error("failed to read namespace")]
    ReadFailed,
    #[error("failed to write namespace")]
    WriteFailed,
    #[error("namespace is larger than {limit} bytes")]
    TooLarge { limit: usize },
    #[error("failed to encode settings")]
    Encode,
}

/// A key-value namespace store.
///
/// Implementations open and close the underlying medium inside each call;
/// no handle is held between calls.
pub trait StorageBackend {
    /// Read the whole namespace. `Ok(None)` means it was never written.
    fn read(&mut self, namespace: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the whole namespace. Must not return `Ok` before the data is
    /// durable.
    fn write(&mut self, namespace: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

impl<T: StorageBackend + ?Sized> StorageBackend for &mut T {
    fn read(&mut self, namespace: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).read(namespace)
    }

    fn write(&mut self, namespace: &str, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).write(namespace, bytes)
    }
}

/// RAM-backed store. Survives as long as the value does, which makes it the
/// stand-in for flash in tests and on hosts without a card.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    namespaces: BTreeMap<String, Vec<u8>>,
    available: bool,
    writes: usize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            namespaces: BTreeMap::new(),
            available: true,
            writes: 0,
        }
    }

    /// Seed a namespace directly, bypassing the write counter.
    pub fn insert(&mut self, namespace: &str, bytes: &[u8]) {
        self.namespaces.insert(namespace.to_string(), bytes.to_vec());
    }

    /// Simulate the medium disappearing (or coming back).
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn get(&self, namespace: &str) -> Option<&[u8]> {
        self.namespaces.get(namespace).map(Vec::as_slice)
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&mut self, namespace: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if !self.available {
            return Err(StoreError::Unavailable);
        }
        Ok(self.namespaces.get(namespace).cloned())
    }

    fn write(&mut self, namespace: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if !self.available {
            return Err(StoreError::Unavailable);
        }
        self.namespaces.insert(namespace.to_string(), bytes.to_vec());
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_namespace_reads_as_none() {
        let mut backend = MemoryBackend::new();
        assert_eq!(backend.read("missing"), Ok(None));
    }

    #[test]
    fn write_replaces_previous_contents() {
        let mut backend = MemoryBackend::new();
        backend.write("ns", &[1, 2, 3]).unwrap();
        backend.write("ns", &[4]).unwrap();
        assert_eq!(backend.read("ns"), Ok(Some(vec![4])));
        assert_eq!(backend.writes(), 2);
    }

    #[test]
    fn unavailable_backend_errors() {
        let mut backend = MemoryBackend::new();
        backend.set_available(false);
        assert_eq!(backend.read("ns"), Err(StoreError::Unavailable));
        assert_eq!(backend.write("ns", &[1]), Err(StoreError::Unavailable));
    }
}
