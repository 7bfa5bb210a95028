//! State stores: a file-backed one for hosts with a filesystem and an
//! in-memory one for simulation.

use std::cell::{Cell, RefCell};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use shutter_traits::{BoxError, StateStore};
use tracing::{debug, trace};

use crate::error::{HwError, Result};

/// Width of the decimal form of a packed state (`u64::MAX` has 20 digits).
pub const STATE_DIGITS: usize = 20;

/// Write `bytes` to `path` via a sibling temp file and rename, so a power cut
/// leaves either the old or the new state on disk.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("new");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}

/// Persists the packed state as a zero-padded 20-digit decimal line.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<u64>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let digits = text.trim();
        if digits.is_empty() {
            return Ok(None);
        }
        if digits.len() != STATE_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(HwError::CorruptState(format!(
                "expected {STATE_DIGITS} digits, got {digits:?}"
            )));
        }
        digits
            .parse::<u64>()
            .map(Some)
            .map_err(|e| HwError::CorruptState(e.to_string()))
    }

    fn write(&self, state: u64) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        write_atomic(&self.path, format!("{state:020}\n").as_bytes())?;
        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn load(&mut self) -> std::result::Result<Option<u64>, BoxError> {
        let state = self.read()?;
        debug!(path = %self.path.display(), ?state, "state file loaded");
        Ok(state)
    }

    fn store(&mut self, state: u64) -> std::result::Result<(), BoxError> {
        self.write(state)?;
        trace!(path = %self.path.display(), state, "state file written");
        Ok(())
    }
}

/// Volatile store for the simulator. Clones share the same slot, so a caller
/// can keep a handle to inspect what the shutter persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    slot: Rc<Cell<Option<u64>>>,
    writes: Rc<RefCell<Vec<u64>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: u64) -> Self {
        let s = Self::default();
        s.slot.set(Some(state));
        s
    }

    /// Last persisted value.
    pub fn current(&self) -> Option<u64> {
        self.slot.get()
    }

    /// Every value written so far, oldest first.
    pub fn writes(&self) -> Vec<u64> {
        self.writes.borrow().clone()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&mut self) -> std::result::Result<Option<u64>, BoxError> {
        Ok(self.slot.get())
    }

    fn store(&mut self, state: u64) -> std::result::Result<(), BoxError> {
        self.slot.set(Some(state));
        self.writes.borrow_mut().push(state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_shares_slot_between_clones() {
        let handle = MemoryStateStore::new();
        let mut store = handle.clone();
        assert_eq!(store.load().unwrap(), None);
        store.store(42).unwrap();
        store.store(43).unwrap();
        assert_eq!(handle.current(), Some(43));
        assert_eq!(handle.writes(), vec![42, 43]);
    }

    #[test]
    fn file_store_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStateStore::new(dir.path().join("absent.state"));
        assert_eq!(store.load().unwrap(), None);
    }
}
