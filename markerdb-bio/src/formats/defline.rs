//! Packed sequence records
//!
//! A single physical sequence can carry several observations (same sequence
//! seen in different samples or markers). When such a sequence has to cross
//! an external tool as a FASTA record, all of its observations are packed
//! into the definition line:
//!
//! ```text
//! 17 S3.1|sample1|5|Root; d__Bacteria~S3.1|sample2|1|Root; d__Bacteria
//! ```
//!
//! The identifier is separated from the packed entries by the first space.
//! Within an entry the four fields are joined by [`FIELD_DELIMITER`], and
//! entries are joined by [`GROUP_DELIMITER`]. Neither delimiter may occur in
//! a field, which [`SequenceRecord::encode`] enforces.

use crate::otu::OtuEntry;
use markerdb_core::{MarkerDbError, MarkerDbResult};

pub const FIELD_DELIMITER: char = '|';
pub const GROUP_DELIMITER: char = '~';

/// Prefix some aligners add to local sequence identifiers
const LOCAL_ID_PREFIX: &str = "lcl|";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefLineEntry {
    pub marker: String,
    pub sample_name: String,
    pub count: u64,
    pub taxonomy: String,
}

impl DefLineEntry {
    pub fn new(
        marker: impl Into<String>,
        sample_name: impl Into<String>,
        count: u64,
        taxonomy: impl Into<String>,
    ) -> Self {
        Self {
            marker: marker.into(),
            sample_name: sample_name.into(),
            count,
            taxonomy: taxonomy.into(),
        }
    }
}

impl From<&OtuEntry> for DefLineEntry {
    fn from(entry: &OtuEntry) -> Self {
        Self {
            marker: entry.marker.clone(),
            sample_name: entry.sample_name.clone(),
            count: entry.count,
            taxonomy: entry.taxonomy.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub sequence_id: u64,
    pub entries: Vec<DefLineEntry>,
}

impl SequenceRecord {
    pub fn new(sequence_id: u64, entries: Vec<DefLineEntry>) -> Self {
        Self { sequence_id, entries }
    }

    /// Render the definition line (without the leading `>`).
    pub fn encode(&self) -> MarkerDbResult<String> {
        if self.entries.is_empty() {
            return Err(MarkerDbError::InvalidInput(format!(
                "sequence {} has no entries to encode",
                self.sequence_id
            )));
        }

        let mut line = format!("{} ", self.sequence_id);
        for (i, entry) in self.entries.iter().enumerate() {
            for field in [&entry.marker, &entry.sample_name, &entry.taxonomy] {
                check_field(field)?;
            }
            if i > 0 {
                line.push(GROUP_DELIMITER);
            }
            line.push_str(&entry.marker);
            line.push(FIELD_DELIMITER);
            line.push_str(&entry.sample_name);
            line.push(FIELD_DELIMITER);
            line.push_str(&entry.count.to_string());
            line.push(FIELD_DELIMITER);
            line.push_str(&entry.taxonomy);
        }
        Ok(line)
    }

    /// Parse a definition line produced by [`encode`](Self::encode).
    ///
    /// A leading `>` and an `lcl|` identifier prefix are tolerated.
    pub fn decode(line: &str) -> MarkerDbResult<Self> {
        let malformed = || MarkerDbError::MalformedRecord(line.to_string());

        let trimmed = line.trim_end_matches(['\r', '\n']);
        let trimmed = trimmed.strip_prefix('>').unwrap_or(trimmed);
        let (id, packed) = trimmed.split_once(' ').ok_or_else(malformed)?;
        let id = id.strip_prefix(LOCAL_ID_PREFIX).unwrap_or(id);
        let sequence_id = parse_digits(id).ok_or_else(malformed)?;

        let mut entries = Vec::new();
        for group in packed.split(GROUP_DELIMITER) {
            let fields: Vec<&str> = group.split(FIELD_DELIMITER).collect();
            let [marker, sample_name, count, taxonomy] = fields[..] else {
                return Err(malformed());
            };
            let count = parse_digits(count).ok_or_else(malformed)?;
            entries.push(DefLineEntry::new(marker, sample_name, count, taxonomy));
        }

        Ok(Self { sequence_id, entries })
    }
}

/// Plain decimal digits only; `u64::from_str` would also take a leading `+`.
fn parse_digits(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn check_field(value: &str) -> MarkerDbResult<()> {
    if value.contains([FIELD_DELIMITER, GROUP_DELIMITER, '\n', '\r']) {
        return Err(MarkerDbError::InvalidInput(format!(
            "{:?} contains a reserved delimiter ('{}' or '{}') or a line break",
            value, FIELD_DELIMITER, GROUP_DELIMITER
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn two_entry_record() -> SequenceRecord {
        SequenceRecord::new(
            17,
            vec![
                DefLineEntry::new("S3.1", "sample1", 5, "Root; d__Bacteria"),
                DefLineEntry::new("S3.1", "sample2", 1, "Root; d__Bacteria; p__Firmicutes"),
            ],
        )
    }

    #[test]
    fn test_encode_layout() {
        assert_eq!(
            two_entry_record().encode().unwrap(),
            "17 S3.1|sample1|5|Root; d__Bacteria~S3.1|sample2|1|Root; d__Bacteria; p__Firmicutes"
        );
    }

    #[test]
    fn test_decode_preserves_order() {
        let line = two_entry_record().encode().unwrap();
        assert_eq!(SequenceRecord::decode(&line).unwrap(), two_entry_record());
    }

    #[test]
    fn test_decode_tolerates_fasta_and_local_prefix() {
        let record = SequenceRecord::decode(">lcl|9 L2|s1|3|d__Archaea\n").unwrap();
        assert_eq!(record.sequence_id, 9);
        assert_eq!(record.entries, vec![DefLineEntry::new("L2", "s1", 3, "d__Archaea")]);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        for line in [
            "17",
            "S3.1|s1|5|Root",
            "abc S3.1|s1|5|Root",
            "17 ",
            "17 S3.1|s1|5",
            "17 S3.1|s1|5|Root|extra",
            "17 S3.1|s1|five|Root",
            "17 S3.1|s1|5|Root~",
            "+17 L2|s|5|t",
            "17 L2|s|+5|t",
            "17 L2|s|-5|t",
            "17 L2|s| 5|t",
        ] {
            assert!(
                matches!(SequenceRecord::decode(line), Err(MarkerDbError::MalformedRecord(_))),
                "{:?} should not decode",
                line
            );
        }
    }

    #[test]
    fn test_encode_rejects_delimiters_and_empty() {
        let record = SequenceRecord::new(1, vec![DefLineEntry::new("S3|1", "s", 1, "t")]);
        assert!(matches!(record.encode(), Err(MarkerDbError::InvalidInput(_))));

        let record = SequenceRecord::new(1, vec![DefLineEntry::new("S3", "s~2", 1, "t")]);
        assert!(record.encode().is_err());

        assert!(SequenceRecord::new(1, Vec::new()).encode().is_err());
    }

    #[test]
    fn test_from_otu_entry() {
        let otu = OtuEntry::new("S3.1", "s1", "ACGT", 4, 0.9, "Root");
        assert_eq!(DefLineEntry::from(&otu), DefLineEntry::new("S3.1", "s1", 4, "Root"));
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(
            id in any::<u64>(),
            entries in prop::collection::vec(
                ("[^|~\r\n]{0,12}", "[^|~\r\n]{0,12}", any::<u64>(), "[^|~\r\n]{0,24}"),
                1..6,
            ),
        ) {
            let record = SequenceRecord::new(
                id,
                entries
                    .into_iter()
                    .map(|(m, s, c, t)| DefLineEntry::new(m, s, c, t))
                    .collect(),
            );
            let line = record.encode().unwrap();
            prop_assert_eq!(SequenceRecord::decode(&line).unwrap(), record);
        }
    }
}
