//! Core FindingStore implementation

use std::fs;
use std::path::Path;
use std::time::Duration;

use eyre::{Context, Result};
use rusqlite::{Connection, Row, params};
use tracing::{debug, info};

use crate::finding::Finding;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS findings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    query TEXT,
    source TEXT,
    content TEXT,
    score REAL,
    timestamp TEXT
)";

const SELECT_COLUMNS: &str = "SELECT id, query, source, content, score, timestamp FROM findings";

/// Aggregate statistics over the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStats {
    /// Number of findings
    pub finding_count: u64,
    /// Distinct source URLs
    pub source_count: u64,
    /// Distinct sub-tasks
    pub query_count: u64,
    /// Mean reliability score (0.0 when empty)
    pub mean_score: f64,
}

/// Append-only SQLite store of findings
///
/// Holds a single connection; callers sharing it across tasks must lock it.
#[derive(Debug)]
pub struct FindingStore {
    conn: Connection,
}

impl FindingStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("Failed to create store directory")?;
        }
        let conn = Connection::open(path).context(format!("Failed to open finding store: {}", path.display()))?;
        debug!(?path, "Opened finding store");
        Self::init(conn)
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory finding store")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_millis(3000))?;
        conn.execute(SCHEMA, []).context("Failed to create findings table")?;
        Ok(Self { conn })
    }

    /// Append a finding and return its assigned identity
    pub fn insert(&self, finding: &Finding) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO findings (query, source, content, score, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    finding.query,
                    finding.source,
                    finding.content,
                    finding.score,
                    finding.timestamp
                ],
            )
            .context("Failed to insert finding")?;
        let id = self.conn.last_insert_rowid();
        debug!(id, source = %finding.source, "Inserted finding");
        Ok(id)
    }

    /// Findings whose sub-task contains `pattern`, highest score first
    ///
    /// `%` and `_` in the pattern match literally.
    pub fn query_by_substring(&self, pattern: &str, limit: usize) -> Result<Vec<Finding>> {
        let like = format!("%{}%", escape_like(pattern));
        let sql = format!("{SELECT_COLUMNS} WHERE query LIKE ?1 ESCAPE '\\' ORDER BY score DESC LIMIT ?2");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![like, limit as i64], row_to_finding)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to query findings")
    }

    /// Most recently inserted findings, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<Finding>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], row_to_finding)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list recent findings")
    }

    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(1) FROM findings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        self.conn
            .query_row(
                "SELECT COUNT(1), COUNT(DISTINCT source), COUNT(DISTINCT query), COALESCE(AVG(score), 0.0) \
                 FROM findings",
                [],
                |row| {
                    Ok(StoreStats {
                        finding_count: row.get::<_, i64>(0)? as u64,
                        source_count: row.get::<_, i64>(1)? as u64,
                        query_count: row.get::<_, i64>(2)? as u64,
                        mean_score: row.get(3)?,
                    })
                },
            )
            .context("Failed to compute store statistics")
    }

    /// Close the underlying connection
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| e)
            .context("Failed to close finding store")?;
        info!("Finding store closed");
        Ok(())
    }
}

fn row_to_finding(row: &Row<'_>) -> rusqlite::Result<Finding> {
    Ok(Finding {
        id: Some(row.get(0)?),
        query: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        source: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        content: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        score: row.get::<_, Option<f64>>(4)?.unwrap_or_default(),
        timestamp: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
    })
}

fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn finding(query: &str, source: &str, score: f64) -> Finding {
        Finding::new(query, source, format!("summary of {}", source), score)
    }

    #[test]
    fn test_insert_assigns_increasing_ids() {
        let store = FindingStore::open_in_memory().unwrap();
        let a = store.insert(&finding("sleep", "https://a.org", 0.5)).unwrap();
        let b = store.insert(&finding("sleep", "https://b.org", 0.6)).unwrap();
        assert!(b > a);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_query_by_substring_orders_by_score() {
        let store = FindingStore::open_in_memory().unwrap();
        store.insert(&finding("sleep and memory", "https://low.org", 0.5)).unwrap();
        store.insert(&finding("sleep stages", "https://high.org", 0.9)).unwrap();
        store.insert(&finding("diet", "https://other.org", 1.0)).unwrap();

        let results = store.query_by_substring("sleep", 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source, "https://high.org");
        assert_eq!(results[1].source, "https://low.org");
        assert!(results.iter().all(|f| f.id.is_some()));
    }

    #[test]
    fn test_query_by_substring_respects_limit() {
        let store = FindingStore::open_in_memory().unwrap();
        for i in 0..5 {
            store
                .insert(&finding("topic", &format!("https://{}.org", i), 0.1 * i as f64))
                .unwrap();
        }
        assert_eq!(store.query_by_substring("topic", 3).unwrap().len(), 3);
    }

    #[test]
    fn test_query_treats_wildcards_literally() {
        let store = FindingStore::open_in_memory().unwrap();
        store.insert(&finding("100% sleep", "https://a.org", 0.5)).unwrap();
        store.insert(&finding("1000 sleep", "https://b.org", 0.5)).unwrap();

        let results = store.query_by_substring("100%", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "https://a.org");
    }

    #[test]
    fn test_recent_newest_first() {
        let store = FindingStore::open_in_memory().unwrap();
        store.insert(&finding("q", "https://first.org", 0.5)).unwrap();
        store.insert(&finding("q", "https://second.org", 0.5)).unwrap();

        let recent = store.recent(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].source, "https://second.org");
    }

    #[test]
    fn test_stats() {
        let store = FindingStore::open_in_memory().unwrap();
        assert_eq!(store.stats().unwrap().finding_count, 0);
        assert_eq!(store.stats().unwrap().mean_score, 0.0);

        store.insert(&finding("a", "https://x.org", 0.4)).unwrap();
        store.insert(&finding("a", "https://x.org", 0.6)).unwrap();
        store.insert(&finding("b", "https://y.org", 0.8)).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.finding_count, 3);
        assert_eq!(stats.source_count, 2);
        assert_eq!(stats.query_count, 2);
        assert!((stats.mean_score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("findings.db");

        let store = FindingStore::open(&path).unwrap();
        let original = finding("sleep", "https://arxiv.org/abs/1", 0.9);
        let id = store.insert(&original).unwrap();
        store.close().unwrap();

        let store = FindingStore::open(&path).unwrap();
        let results = store.query_by_substring("sleep", 10).unwrap();
        assert_eq!(results, vec![original.with_id(id)]);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
