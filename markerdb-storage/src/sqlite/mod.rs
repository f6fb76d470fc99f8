//! SQLite-backed relational store for observations and cluster membership

mod stream;

pub use stream::ObservationStream;

use itertools::Itertools;
use markerdb_bio::OtuEntry;
use markerdb_core::{MarkerDbError, MarkerDbResult, DEFAULT_BATCH_SIZE};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Transaction};
use std::path::{Path, PathBuf};

/// File name of the store inside a database directory
pub const SQLITE_DB_NAME: &str = "otus.sqlite3";

const SCHEMA: &str = "
    CREATE TABLE observations (
      marker TEXT NOT NULL,
      sample_name TEXT NOT NULL,
      sequence TEXT NOT NULL,
      num_hits INTEGER NOT NULL,
      coverage REAL NOT NULL,
      taxonomy TEXT NOT NULL
    );
    CREATE TABLE clusters (
      member TEXT NOT NULL,
      representative TEXT NOT NULL
    );
";

const INDICES: &str = "
    CREATE INDEX observations_sequence ON observations(sequence);
    CREATE INDEX observations_sample_name ON observations(sample_name);
    CREATE INDEX clusters_representative ON clusters(representative);
";

const INSERT_OBSERVATION: &str = "INSERT INTO observations
    (marker, sample_name, sequence, num_hits, coverage, taxonomy)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const INSERT_CLUSTER: &str = "INSERT INTO clusters (member, representative) VALUES (?1, ?2)";

const SELECT_OBSERVATION: &str =
    "SELECT marker, sample_name, sequence, num_hits, coverage, taxonomy FROM observations";

pub(crate) fn sql_error(e: rusqlite::Error) -> MarkerDbError {
    MarkerDbError::Database(e.to_string())
}

pub(crate) fn row_to_entry(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<OtuEntry> {
    let num_hits: i64 = row.get(offset + 3)?;
    let count = u64::try_from(num_hits).map_err(|_| {
        rusqlite::Error::IntegralValueOutOfRange(offset + 3, num_hits)
    })?;
    Ok(OtuEntry {
        marker: row.get(offset)?,
        sample_name: row.get(offset + 1)?,
        sequence: row.get(offset + 2)?,
        count,
        coverage: row.get(offset + 4)?,
        taxonomy: row.get(offset + 5)?,
    })
}

pub struct OtuStore {
    conn: Connection,
    path: Option<PathBuf>,
    batch_size: usize,
}

impl OtuStore {
    /// Create a new store file with an empty schema. The file must not exist.
    pub fn create<P: AsRef<Path>>(path: P) -> MarkerDbResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(MarkerDbError::AlreadyExists(path.to_path_buf()));
        }
        let conn = Connection::open(path).map_err(sql_error)?;
        conn.execute_batch(
            "
            PRAGMA synchronous=OFF;
            PRAGMA temp_store=MEMORY;
            PRAGMA cache_size=-32000;
            PRAGMA journal_mode=MEMORY;
            ",
        )
        .map_err(sql_error)?;
        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
            batch_size: DEFAULT_BATCH_SIZE,
        };
        store.create_schema()?;
        tracing::debug!("Created store {}", path.display());
        Ok(store)
    }

    /// Open an existing store read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> MarkerDbResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(MarkerDbError::MissingStore(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(sql_error)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    pub fn in_memory() -> MarkerDbResult<Self> {
        let conn = Connection::open_in_memory().map_err(sql_error)?;
        let store = Self {
            conn,
            path: None,
            batch_size: DEFAULT_BATCH_SIZE,
        };
        store.create_schema()?;
        Ok(store)
    }

    /// Rows per load transaction; values below 1 are treated as 1.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn create_schema(&self) -> MarkerDbResult<()> {
        self.conn.execute_batch(SCHEMA).map_err(sql_error)
    }

    /// Load every entry, one transaction per batch. Returns the number of
    /// rows inserted.
    pub fn bulk_load<I>(&mut self, entries: I) -> MarkerDbResult<u64>
    where
        I: IntoIterator<Item = MarkerDbResult<OtuEntry>>,
    {
        self.bulk_load_with(entries, |_| Ok(()))
    }

    /// As [`bulk_load`](Self::bulk_load), handing each entry to `on_entry`
    /// before it is inserted. An error from `on_entry` aborts the load.
    pub fn bulk_load_with<I, F>(&mut self, entries: I, mut on_entry: F) -> MarkerDbResult<u64>
    where
        I: IntoIterator<Item = MarkerDbResult<OtuEntry>>,
        F: FnMut(&OtuEntry) -> MarkerDbResult<()>,
    {
        let mut total = 0u64;
        let batches = entries.into_iter().chunks(self.batch_size);
        for batch in &batches {
            let tx = self.conn.transaction().map_err(sql_error)?;
            {
                let mut stmt = tx.prepare_cached(INSERT_OBSERVATION).map_err(sql_error)?;
                for entry in batch {
                    let entry = entry?;
                    on_entry(&entry)?;
                    let num_hits = i64::try_from(entry.count).map_err(|_| {
                        MarkerDbError::InvalidInput(format!(
                            "count {} for {} in {} does not fit in the store",
                            entry.count, entry.marker, entry.sample_name
                        ))
                    })?;
                    stmt.execute(params![
                        entry.marker,
                        entry.sample_name,
                        entry.sequence,
                        num_hits,
                        entry.coverage,
                        entry.taxonomy
                    ])
                    .map_err(sql_error)?;
                    total += 1;
                }
            }
            tx.commit().map_err(sql_error)?;
            tracing::trace!("Committed batch, {} observations so far", total);
        }
        tracing::debug!("Loaded {} observations", total);
        Ok(total)
    }

    /// Start writing cluster rows in one transaction. Dropping the writer
    /// without [`ClusterWriter::commit`] discards every row it inserted.
    pub fn cluster_writer(&mut self) -> MarkerDbResult<ClusterWriter<'_>> {
        let tx = self.conn.transaction().map_err(sql_error)?;
        Ok(ClusterWriter { tx, inserted: 0 })
    }

    pub fn insert_cluster_pairs<I, S>(&mut self, pairs: I) -> MarkerDbResult<u64>
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        let mut writer = self.cluster_writer()?;
        for (member, representative) in pairs {
            writer.insert(member.as_ref(), representative.as_ref())?;
        }
        writer.commit()
    }

    /// Build the secondary indices. Call once, after all rows are loaded.
    pub fn build_indices(&self) -> MarkerDbResult<()> {
        tracing::debug!("Building store indices");
        self.conn.execute_batch(INDICES).map_err(sql_error)?;
        self.conn.execute_batch("ANALYZE;").map_err(sql_error)
    }

    /// Lazily page through every observation in storage order.
    pub fn stream_observations(&self, chunk_size: usize) -> ObservationStream<'_> {
        ObservationStream::new(&self.conn, chunk_size)
    }

    pub fn count_observations(&self) -> MarkerDbResult<u64> {
        self.count("SELECT COUNT(*) FROM observations")
    }

    pub fn count_cluster_pairs(&self) -> MarkerDbResult<u64> {
        self.count("SELECT COUNT(*) FROM clusters")
    }

    fn count(&self, sql: &str) -> MarkerDbResult<u64> {
        let n: i64 = self.conn.query_row(sql, [], |row| row.get(0)).map_err(sql_error)?;
        u64::try_from(n).map_err(|_| MarkerDbError::Database(format!("negative row count {}", n)))
    }

    pub fn observations_by_sequence(&self, sequence: &str) -> MarkerDbResult<Vec<OtuEntry>> {
        self.select_observations("sequence", sequence)
    }

    pub fn observations_by_sample(&self, sample_name: &str) -> MarkerDbResult<Vec<OtuEntry>> {
        self.select_observations("sample_name", sample_name)
    }

    fn select_observations(&self, column: &str, value: &str) -> MarkerDbResult<Vec<OtuEntry>> {
        let sql = format!("{} WHERE {} = ?1 ORDER BY rowid", SELECT_OBSERVATION, column);
        let mut stmt = self.conn.prepare_cached(&sql).map_err(sql_error)?;
        let rows = stmt
            .query_map(params![value], |row| row_to_entry(row, 0))
            .map_err(sql_error)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(sql_error)
    }

    pub fn representative_of(&self, member: &str) -> MarkerDbResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT representative FROM clusters WHERE member = ?1 LIMIT 1",
                params![member],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_error)
    }

    pub fn members_of(&self, representative: &str) -> MarkerDbResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT member FROM clusters WHERE representative = ?1 ORDER BY rowid")
            .map_err(sql_error)?;
        let rows = stmt
            .query_map(params![representative], |row| row.get(0))
            .map_err(sql_error)?;
        rows.collect::<Result<Vec<String>, _>>().map_err(sql_error)
    }

    /// Distinct markers with at least one observation, sorted
    pub fn markers(&self) -> MarkerDbResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT marker FROM observations ORDER BY marker")
            .map_err(sql_error)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(sql_error)?;
        rows.collect::<Result<Vec<String>, _>>().map_err(sql_error)
    }

    /// Close the connection, reporting any error SQLite raises on close.
    pub fn close(self) -> MarkerDbResult<()> {
        self.conn.close().map_err(|(_, e)| sql_error(e))
    }
}

/// Inserts cluster membership rows inside a single transaction
pub struct ClusterWriter<'a> {
    tx: Transaction<'a>,
    inserted: u64,
}

impl ClusterWriter<'_> {
    pub fn insert(&mut self, member: &str, representative: &str) -> MarkerDbResult<()> {
        self.tx
            .prepare_cached(INSERT_CLUSTER)
            .and_then(|mut stmt| stmt.execute(params![member, representative]))
            .map_err(sql_error)?;
        self.inserted += 1;
        Ok(())
    }

    pub fn inserted(&self) -> u64 {
        self.inserted
    }

    /// Commit the rows, returning how many were written.
    pub fn commit(self) -> MarkerDbResult<u64> {
        let inserted = self.inserted;
        self.tx.commit().map_err(sql_error)?;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn entry(marker: &str, sample: &str, sequence: &str, count: u64) -> OtuEntry {
        OtuEntry::new(marker, sample, sequence, count, 1.5, "Root; d__Bacteria")
    }

    fn entries(n: usize) -> impl Iterator<Item = MarkerDbResult<OtuEntry>> {
        (0..n).map(|i| {
            let sample = format!("sample{}", i % 7);
            Ok(entry("S3.1", &sample, &format!("ACGT{}", i), i as u64))
        })
    }

    #[test]
    fn test_row_count_at_batch_boundaries() {
        for n in [0, 1, 9_999, 10_000, 10_001] {
            let mut store = OtuStore::in_memory().unwrap();
            assert_eq!(store.bulk_load(entries(n)).unwrap(), n as u64);
            assert_eq!(store.count_observations().unwrap(), n as u64, "n = {}", n);
        }
    }

    #[test]
    fn test_small_batches_keep_every_row() {
        let mut store = OtuStore::in_memory().unwrap().with_batch_size(3);
        assert_eq!(store.bulk_load(entries(10)).unwrap(), 10);

        let sequences: Vec<String> = store
            .stream_observations(4)
            .map(|e| e.unwrap().sequence)
            .collect();
        let expected: Vec<String> = (0..10).map(|i| format!("ACGT{}", i)).collect();
        assert_eq!(sequences, expected);
    }

    #[test]
    fn test_stored_fields_are_verbatim() {
        let mut store = OtuStore::in_memory().unwrap();
        let stored = OtuEntry::new("L2", "s1", "ACGTACGT", 5, 1.2, "d__Bacteria");
        store.bulk_load([Ok(stored.clone())]).unwrap();

        assert_eq!(store.observations_by_sequence("ACGTACGT").unwrap(), vec![stored.clone()]);
        assert_eq!(store.observations_by_sample("s1").unwrap(), vec![stored]);
        assert!(store.observations_by_sample("s2").unwrap().is_empty());
    }

    #[test]
    fn test_load_error_stops_at_failing_entry() {
        let mut store = OtuStore::in_memory().unwrap().with_batch_size(2);
        let input = vec![
            Ok(entry("S3.1", "s", "AAAA", 1)),
            Ok(entry("S3.1", "s", "CCCC", 1)),
            Err(MarkerDbError::Parse("bad row".into())),
            Ok(entry("S3.1", "s", "GGGG", 1)),
        ];
        assert!(matches!(store.bulk_load(input), Err(MarkerDbError::Parse(_))));
        // the first batch was already committed
        assert_eq!(store.count_observations().unwrap(), 2);
    }

    #[test]
    fn test_count_too_large_is_rejected() {
        let mut store = OtuStore::in_memory().unwrap();
        let result = store.bulk_load([Ok(entry("S3.1", "s", "AAAA", u64::MAX))]);
        assert!(matches!(result, Err(MarkerDbError::InvalidInput(_))));
    }

    #[test]
    fn test_bulk_load_with_sees_every_entry() {
        let mut store = OtuStore::in_memory().unwrap().with_batch_size(4);
        let mut seen = Vec::new();
        store
            .bulk_load_with(entries(9), |e| {
                seen.push(e.sequence.clone());
                Ok(())
            })
            .unwrap();
        assert_eq!(seen.len(), 9);
    }

    #[test]
    fn test_cluster_writer_commit_and_rollback() {
        let mut store = OtuStore::in_memory().unwrap();
        {
            let mut writer = store.cluster_writer().unwrap();
            writer.insert("AAAA", "AAAA").unwrap();
            writer.insert("AAAT", "AAAA").unwrap();
            assert_eq!(writer.commit().unwrap(), 2);
        }
        {
            let mut writer = store.cluster_writer().unwrap();
            writer.insert("CCCC", "CCCC").unwrap();
            // dropped without commit
        }

        assert_eq!(store.count_cluster_pairs().unwrap(), 2);
        assert_eq!(store.representative_of("AAAT").unwrap(), Some("AAAA".to_string()));
        assert_eq!(store.representative_of("CCCC").unwrap(), None);
        assert_eq!(store.members_of("AAAA").unwrap(), vec!["AAAA", "AAAT"]);
    }

    #[test]
    fn test_markers_are_distinct_and_sorted() {
        let mut store = OtuStore::in_memory().unwrap();
        store
            .bulk_load([
                Ok(entry("S3.2", "s", "A", 1)),
                Ok(entry("S3.1", "s", "C", 1)),
                Ok(entry("S3.2", "t", "G", 1)),
            ])
            .unwrap();
        assert_eq!(store.markers().unwrap(), vec!["S3.1", "S3.2"]);
    }

    #[test]
    fn test_file_store_lifecycle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SQLITE_DB_NAME);

        let mut store = OtuStore::create(&path).unwrap();
        store.bulk_load(entries(5)).unwrap();
        store.insert_cluster_pairs([("ACGT0", "ACGT0")]).unwrap();
        store.build_indices().unwrap();
        store.close().unwrap();

        assert!(matches!(OtuStore::create(&path), Err(MarkerDbError::AlreadyExists(_))));

        let reopened = OtuStore::open(&path).unwrap();
        assert_eq!(reopened.count_observations().unwrap(), 5);
        assert_eq!(reopened.count_cluster_pairs().unwrap(), 1);
    }

    #[test]
    fn test_open_missing_store() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            OtuStore::open(dir.path().join(SQLITE_DB_NAME)),
            Err(MarkerDbError::MissingStore(_))
        ));
    }
}
