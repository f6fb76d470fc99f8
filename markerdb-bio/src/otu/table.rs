//! Tab-separated OTU tables
//!
//! Input tables are matched by column name so that both SingleM-style
//! (`gene`, `sample`, `num_hits`) and dump-style (`marker`, `sample_name`,
//! `count`) headers are accepted.

use super::OtuEntry;
use markerdb_core::{MarkerDbError, MarkerDbResult};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

/// Header written by [`OtuTableWriter::write_header`]
pub const DEFAULT_OUTPUT_FIELDS: [&str; 6] =
    ["marker", "sample_name", "sequence", "count", "coverage", "taxonomy"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Marker,
    Sample,
    Sequence,
    Count,
    Coverage,
    Taxonomy,
}

impl Column {
    const ALL: [Column; 6] = [
        Column::Marker,
        Column::Sample,
        Column::Sequence,
        Column::Count,
        Column::Coverage,
        Column::Taxonomy,
    ];

    fn from_header(name: &str) -> Option<Self> {
        match name.trim() {
            "gene" | "marker" => Some(Column::Marker),
            "sample" | "sample_name" => Some(Column::Sample),
            "sequence" => Some(Column::Sequence),
            "num_hits" | "count" => Some(Column::Count),
            "coverage" => Some(Column::Coverage),
            "taxonomy" => Some(Column::Taxonomy),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        DEFAULT_OUTPUT_FIELDS[*self as usize]
    }
}

/// Streaming reader over the rows of one OTU table
pub struct OtuTableReader<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
    columns: HashMap<Column, usize>,
    source: String,
}

impl OtuTableReader<BufReader<File>> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> MarkerDbResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::new(BufReader::new(file), path.display().to_string())
    }
}

impl<R: Read> OtuTableReader<R> {
    /// Wrap a reader; `source` names the table in error messages.
    pub fn new(reader: R, source: impl Into<String>) -> MarkerDbResult<Self> {
        let source = source.into();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .has_headers(true)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| MarkerDbError::Parse(format!("{}: unreadable header: {}", source, e)))?
            .clone();

        let mut columns = HashMap::new();
        for (idx, name) in headers.iter().enumerate() {
            if let Some(column) = Column::from_header(name) {
                if columns.insert(column, idx).is_some() {
                    return Err(MarkerDbError::DuplicateIdentity(format!(
                        "{}: column '{}' appears more than once in the header",
                        source,
                        column.name()
                    )));
                }
            }
        }
        for column in Column::ALL {
            if !columns.contains_key(&column) {
                return Err(MarkerDbError::Parse(format!(
                    "{}: header is missing the '{}' column",
                    source,
                    column.name()
                )));
            }
        }

        Ok(Self {
            records: reader.into_records(),
            columns,
            source,
        })
    }

    fn parse_record(&self, record: &csv::StringRecord) -> MarkerDbResult<OtuEntry> {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let field = |column: Column| {
            record.get(self.columns[&column]).ok_or_else(|| {
                MarkerDbError::Parse(format!(
                    "{} line {}: missing '{}' field",
                    self.source,
                    line,
                    column.name()
                ))
            })
        };

        let count = field(Column::Count)?.parse::<u64>().map_err(|e| {
            MarkerDbError::Parse(format!("{} line {}: bad count: {}", self.source, line, e))
        })?;
        let coverage = field(Column::Coverage)?.parse::<f64>().map_err(|e| {
            MarkerDbError::Parse(format!("{} line {}: bad coverage: {}", self.source, line, e))
        })?;

        Ok(OtuEntry {
            marker: field(Column::Marker)?.to_string(),
            sample_name: field(Column::Sample)?.to_string(),
            sequence: field(Column::Sequence)?.to_string(),
            count,
            coverage,
            taxonomy: field(Column::Taxonomy)?.to_string(),
        })
    }
}

impl<R: Read> Iterator for OtuTableReader<R> {
    type Item = MarkerDbResult<OtuEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => {
                return Some(Err(MarkerDbError::Parse(format!("{}: {}", self.source, e))));
            }
        };
        Some(self.parse_record(&record))
    }
}

/// Writes entries as tab-separated lines in [`DEFAULT_OUTPUT_FIELDS`] order
pub struct OtuTableWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OtuTableWriter<W> {
    pub fn new(writer: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .has_headers(false)
            .from_writer(writer);
        Self { writer }
    }

    pub fn write_header(&mut self) -> MarkerDbResult<()> {
        self.writer.write_record(DEFAULT_OUTPUT_FIELDS).map_err(csv_error)
    }

    pub fn write_entry(&mut self, entry: &OtuEntry) -> MarkerDbResult<()> {
        let count = entry.count.to_string();
        let coverage = entry.coverage.to_string();
        self.writer
            .write_record([
                entry.marker.as_str(),
                entry.sample_name.as_str(),
                entry.sequence.as_str(),
                count.as_str(),
                coverage.as_str(),
                entry.taxonomy.as_str(),
            ])
            .map_err(csv_error)
    }

    pub fn flush(&mut self) -> MarkerDbResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn csv_error(e: csv::Error) -> MarkerDbError {
    if e.is_io_error() {
        match e.into_kind() {
            csv::ErrorKind::Io(io) => MarkerDbError::Io(io),
            other => MarkerDbError::Serialization(format!("{:?}", other)),
        }
    } else {
        MarkerDbError::Serialization(e.to_string())
    }
}
