use super::{row_to_entry, sql_error};
use markerdb_bio::OtuEntry;
use markerdb_core::MarkerDbResult;
use rusqlite::{params, Connection};
use std::collections::VecDeque;

const PAGE_QUERY: &str = "SELECT rowid, marker, sample_name, sequence, num_hits, coverage, taxonomy
    FROM observations WHERE rowid > ?1 ORDER BY rowid LIMIT ?2";

/// Pages through the observation table `chunk_size` rows at a time, keyed on
/// rowid, so at most one chunk is held in memory. Starting a new stream
/// restarts from the first row.
pub struct ObservationStream<'a> {
    conn: &'a Connection,
    chunk_size: usize,
    last_rowid: i64,
    buffer: VecDeque<OtuEntry>,
    finished: bool,
}

impl<'a> ObservationStream<'a> {
    pub(crate) fn new(conn: &'a Connection, chunk_size: usize) -> Self {
        Self {
            conn,
            chunk_size: chunk_size.max(1),
            last_rowid: 0,
            buffer: VecDeque::new(),
            finished: false,
        }
    }

    fn fetch_page(&mut self) -> MarkerDbResult<()> {
        let limit = i64::try_from(self.chunk_size).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare_cached(PAGE_QUERY).map_err(sql_error)?;
        let mut rows = stmt.query(params![self.last_rowid, limit]).map_err(sql_error)?;

        let mut fetched = 0;
        while let Some(row) = rows.next().map_err(sql_error)? {
            self.last_rowid = row.get(0).map_err(sql_error)?;
            self.buffer.push_back(row_to_entry(row, 1).map_err(sql_error)?);
            fetched += 1;
        }
        if fetched < self.chunk_size {
            self.finished = true;
        }
        tracing::trace!("Fetched {} observations up to rowid {}", fetched, self.last_rowid);
        Ok(())
    }
}

impl Iterator for ObservationStream<'_> {
    type Item = MarkerDbResult<OtuEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.finished {
            if let Err(e) = self.fetch_page() {
                self.finished = true;
                self.buffer.clear();
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
