//! Key/value collaborator the engine reads and writes through
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Sled(#[from] sled::Error),
    #[error("write to {key} rejected by the ledger")]
    Rejected { key: String },
    #[error("read of {key} failed")]
    ReadFailed { key: String },
}

/// Puts that must land together or not at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    puts: Vec<(String, Vec<u8>)>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.puts.push((key.into(), value.into()));
    }
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.puts.iter().map(|(key, _)| key.as_str())
    }
    pub fn len(&self) -> usize {
        self.puts.len()
    }
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty()
    }
}

impl IntoIterator for WriteSet {
    type Item = (String, Vec<u8>);
    type IntoIter = std::vec::IntoIter<(String, Vec<u8>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.puts.into_iter()
    }
}

pub trait LedgerStore: Send + Sync {
    /// Current value at `key`, `None` when nothing was ever written there.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    /// Applies every put in `writes` atomically.
    fn commit(&self, writes: WriteSet) -> Result<(), StoreError>;

    fn put_state(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut writes = WriteSet::new();
        writes.put(key, value);
        self.commit(writes)
    }
}

/// Ledger state kept in a sled tree.
pub struct SledStore {
    instance: Arc<sled::Db>,
}

impl SledStore {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self { instance }
    }
    pub fn instance(&self) -> &Arc<sled::Db> {
        &self.instance
    }
}

impl LedgerStore for SledStore {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.instance.get(key.as_bytes())?.map(|value| value.to_vec()))
    }

    fn commit(&self, writes: WriteSet) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        for (key, value) in writes {
            batch.insert(key.as_bytes(), value);
        }
        self.instance.apply_batch(batch)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Faults {
    failing_reads: BTreeSet<String>,
    // commits still allowed before every later one is rejected
    commits_left: Option<usize>,
}

/// In-process ledger with fault injection, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
    faults: Mutex<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
    /// Every later read of `key` fails with [`StoreError::ReadFailed`]
    pub fn fail_reads_on(&self, key: impl Into<String>) {
        self.faults.lock().failing_reads.insert(key.into());
    }
    /// Lets `n` more commits through, then rejects every commit after them
    pub fn reject_commits_after(&self, n: usize) {
        self.faults.lock().commits_left = Some(n);
    }
    pub fn clear_faults(&self) {
        *self.faults.lock() = Faults::default();
    }
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl LedgerStore for MemoryStore {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if self.faults.lock().failing_reads.contains(key) {
            return Err(StoreError::ReadFailed {
                key: key.to_string(),
            });
        }
        Ok(self.entries.read().get(key).cloned())
    }

    fn commit(&self, writes: WriteSet) -> Result<(), StoreError> {
        {
            let mut faults = self.faults.lock();
            if let Some(left) = faults.commits_left.as_mut() {
                if *left == 0 {
                    let key = writes.keys().next().unwrap_or_default().to_string();
                    return Err(StoreError::Rejected { key });
                }
                *left -= 1;
            }
        }
        let mut entries = self.entries.write();
        for (key, value) in writes {
            entries.insert(key, value);
        }
        Ok(())
    }
}
