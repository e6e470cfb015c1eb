//! Finding persistence seam

use std::path::Path;
use std::sync::Mutex;

use eyre::{Context, Result, eyre};
use findingstore::{Finding, FindingStore};
use tracing::debug;

/// Append-only destination for findings
pub trait FindingSink: Send + Sync {
    /// Persist `finding` and return its assigned identity
    fn record(&self, finding: &Finding) -> Result<i64>;

    /// Release the underlying resources
    fn close(self: Box<Self>) -> Result<()>;
}

/// SQLite-backed sink over a single guarded connection
pub struct SqliteSink {
    store: Mutex<FindingStore>,
}

impl SqliteSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(?path, "SqliteSink::open: called");
        let store = FindingStore::open(path).context(format!("Failed to open finding store {}", path.display()))?;
        Ok(Self {
            store: Mutex::new(store),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            store: Mutex::new(FindingStore::open_in_memory()?),
        })
    }

    /// Run `f` against the store
    pub fn with_store<T>(&self, f: impl FnOnce(&FindingStore) -> Result<T>) -> Result<T> {
        let store = self.store.lock().map_err(|_| eyre!("finding store lock poisoned"))?;
        f(&store)
    }
}

impl FindingSink for SqliteSink {
    fn record(&self, finding: &Finding) -> Result<i64> {
        self.with_store(|store| store.insert(finding))
    }

    fn close(self: Box<Self>) -> Result<()> {
        debug!("SqliteSink::close: called");
        let store = self
            .store
            .into_inner()
            .map_err(|_| eyre!("finding store lock poisoned"))?;
        store.close()
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;

    /// Sink whose every write fails
    pub struct FailingSink;

    impl FindingSink for FailingSink {
        fn record(&self, _finding: &Finding) -> Result<i64> {
            Err(eyre!("database is locked"))
        }

        fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_assigns_ids() {
        let sink = SqliteSink::in_memory().unwrap();
        let a = sink.record(&Finding::new("q", "https://a.example", "c", 0.5)).unwrap();
        let b = sink.record(&Finding::new("q", "https://b.example", "c", 0.5)).unwrap();
        assert!(b > a);
        assert_eq!(sink.with_store(|s| s.count()).unwrap(), 2);
    }

    #[test]
    fn test_open_on_disk_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("research_memory.db");
        let sink = SqliteSink::open(&path).unwrap();
        sink.record(&Finding::new("q", "s", "c", 0.1)).unwrap();
        Box::new(sink).close().unwrap();

        let reopened = FindingStore::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }
}
