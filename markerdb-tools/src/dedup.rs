//! In-process sequence deduplication

use crate::traits::Deduplicator;
use markerdb_bio::write_pseudo_fasta;
use markerdb_core::MarkerDbResult;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Sorts and uniques sequences in memory, the equivalent of `sort | uniq`.
/// Output is in byte order.
///
/// Memory grows with the distinct sequences of one marker (roughly their
/// total length plus ~50 bytes each); duplicates cost nothing. Markers are
/// deduplicated one at a time, so the peak is set by the largest marker.
#[derive(Debug, Default, Clone, Copy)]
pub struct SortedDeduplicator;

impl Deduplicator for SortedDeduplicator {
    fn deduplicate(&self, staged: &Path, output: &Path) -> MarkerDbResult<usize> {
        let mut distinct = BTreeSet::new();
        for line in BufReader::new(File::open(staged)?).lines() {
            let line = line?;
            let sequence = line.trim();
            if !sequence.is_empty() {
                distinct.insert(sequence.to_string());
            }
        }

        let mut writer = BufWriter::new(File::create(output)?);
        let written = write_pseudo_fasta(&mut writer, &distinct)?;
        writer.flush()?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_duplicates_collapse_in_sorted_order() {
        let dir = TempDir::new().unwrap();
        let staged = dir.path().join("S3.1.seqs");
        let output = dir.path().join("S3.1.dedup.fa");
        fs::write(&staged, "TTTT\nAAAA\nTTTT\n\nCCCC\nAAAA\n").unwrap();

        let n = SortedDeduplicator.deduplicate(&staged, &output).unwrap();

        assert_eq!(n, 3);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            ">1\nAAAA\n>1\nCCCC\n>1\nTTTT\n"
        );
    }

    #[test]
    fn test_missing_staging_file() {
        let dir = TempDir::new().unwrap();
        let result =
            SortedDeduplicator.deduplicate(&dir.path().join("nope"), &dir.path().join("out"));
        assert!(result.is_err());
    }
}
