//! Trained-state persistence.
//!
//! A checkpoint is a bincode blob holding the node table, the iteration budget,
//! the iteration counter and the convergence tolerance. Where the bytes live is
//! behind [`CheckpointStore`]; remote mirroring is the caller's concern.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cfr::CfrNode;
use crate::error::{OfcError, OfcResult};

/// Bumped whenever the blob layout changes.
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub iterations: usize,
    pub current_iteration: usize,
    pub stop_threshold: f64,
    pub nodes: HashMap<String, CfrNode>,
}

impl Checkpoint {
    pub fn to_bytes(&self) -> OfcResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| OfcError::CheckpointDecode(e.to_string()))
    }

    /// Decodes a blob. `Ok(None)` for an empty blob or one written by another
    /// format version; `Err` when the bytes cannot be decoded at all.
    pub fn from_bytes(bytes: &[u8]) -> OfcResult<Option<Checkpoint>> {
        if bytes.is_empty() {
            log::warn!("checkpoint blob is empty, starting fresh");
            return Ok(None);
        }
        let checkpoint: Checkpoint =
            bincode::deserialize(bytes).map_err(|e| OfcError::CheckpointDecode(e.to_string()))?;
        if checkpoint.version != CHECKPOINT_VERSION {
            log::warn!(
                "checkpoint version {} does not match {}, starting fresh",
                checkpoint.version,
                CHECKPOINT_VERSION
            );
            return Ok(None);
        }
        Ok(Some(checkpoint))
    }
}

/// Byte-blob read/write capability.
pub trait CheckpointStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn read(&self) -> io::Result<Option<Vec<u8>>>;
    fn write(&self, bytes: &[u8]) -> io::Result<()>;
}

/// A checkpoint file on local disk.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for FileStore {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Writes to a sibling temp file then renames, so a reader never sees a
    /// half-written blob.
    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)
    }
}

/// Keeps the blob in memory. Used by tests and by callers that mirror the
/// bytes elsewhere themselves.
#[derive(Default)]
pub struct MemoryStore {
    blob: RefCell<Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        MemoryStore {
            blob: RefCell::new(Some(bytes)),
        }
    }

    pub fn bytes(&self) -> Option<Vec<u8>> {
        self.blob.borrow().clone()
    }
}

impl CheckpointStore for MemoryStore {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.blob.borrow().clone())
    }

    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        *self.blob.borrow_mut() = Some(bytes.to_vec());
        Ok(())
    }
}

/// Saves nothing. For runs that should not persist.
pub struct NullStore;

impl CheckpointStore for NullStore {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn write(&self, _bytes: &[u8]) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_checkpoint(version: u32) -> Checkpoint {
        Checkpoint {
            version,
            iterations: 10,
            current_iteration: 3,
            stop_threshold: 0.01,
            nodes: HashMap::new(),
        }
    }

    #[test]
    fn bytes_round_trip() {
        let cp = empty_checkpoint(CHECKPOINT_VERSION);
        let bytes = cp.to_bytes().unwrap();
        assert_eq!(Checkpoint::from_bytes(&bytes).unwrap(), Some(cp));
    }

    #[test]
    fn other_version_is_ignored() {
        let bytes = empty_checkpoint(CHECKPOINT_VERSION + 1).to_bytes().unwrap();
        assert_eq!(Checkpoint::from_bytes(&bytes).unwrap(), None);
    }

    #[test]
    fn garbage_is_an_error() {
        let result = Checkpoint::from_bytes(&[0xff, 0x01]);
        assert!(matches!(result, Err(OfcError::CheckpointDecode(_))));
    }

    #[test]
    fn missing_file_reads_none() {
        let store = FileStore::new(std::env::temp_dir().join("ofc-solver-missing-checkpoint.bin"));
        assert!(store.read().unwrap().is_none());
    }
}
