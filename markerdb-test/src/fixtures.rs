//! Test fixtures and data generators

use markerdb_bio::{OtuEntry, OtuTableWriter};
use std::fs::File;
use std::path::{Path, PathBuf};

/// The single observation used by the end-to-end scenario
pub fn l2_entry() -> OtuEntry {
    OtuEntry::new("L2", "s1", "ACGTACGT", 5, 1.2, "d__Bacteria")
}

/// A small two-marker data set. `ACGTACGT` is seen in two samples.
pub fn sample_entries() -> Vec<OtuEntry> {
    vec![
        OtuEntry::new("S3.1", "sample1", "ACGTACGT", 5, 1.2, "Root; d__Bacteria"),
        OtuEntry::new("S3.1", "sample2", "ACGTACGT", 2, 0.48, "Root; d__Bacteria"),
        OtuEntry::new("S3.1", "sample2", "ACGTACGA", 1, 0.24, "Root; d__Bacteria; p__Firmicutes"),
        OtuEntry::new("S3.2", "sample1", "TTGGCCAATTGG", 7, 2.9, "Root; d__Archaea"),
    ]
}

/// Deterministic entries spread over `markers` marker names
pub fn generate_entries(n: usize, markers: usize) -> Vec<OtuEntry> {
    const BASES: [char; 4] = ['A', 'C', 'G', 'T'];
    let markers = markers.max(1);
    (0..n)
        .map(|i| {
            let mut sequence = String::with_capacity(12);
            let mut k = i;
            for _ in 0..12 {
                sequence.push(BASES[k % 4]);
                k /= 4;
            }
            OtuEntry::new(
                format!("S3.{}", i % markers + 1),
                format!("sample{}", i % 3),
                sequence,
                (i % 9 + 1) as u64,
                (i % 9 + 1) as f64 * 0.25,
                "Root; d__Bacteria",
            )
        })
        .collect()
}

/// Write `entries` as a dump-style OTU table at `dir/name`.
pub fn write_otu_table(dir: &Path, name: &str, entries: &[OtuEntry]) -> PathBuf {
    let path = dir.join(name);
    let mut writer = OtuTableWriter::new(File::create(&path).expect("create OTU table"));
    writer.write_header().expect("write header");
    for entry in entries {
        writer.write_entry(entry).expect("write entry");
    }
    writer.flush().expect("flush OTU table");
    path
}
