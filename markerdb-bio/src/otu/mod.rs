//! OTU entries: one observation of a marker sequence in a sample

pub mod table;

use crate::formats::defline::{FIELD_DELIMITER, GROUP_DELIMITER};
use markerdb_core::{MarkerDbError, MarkerDbResult};

#[derive(Debug, Clone, PartialEq)]
pub struct OtuEntry {
    pub marker: String,
    pub sample_name: String,
    pub sequence: String,
    pub count: u64,
    pub coverage: f64,
    pub taxonomy: String,
}

impl OtuEntry {
    pub fn new(
        marker: impl Into<String>,
        sample_name: impl Into<String>,
        sequence: impl Into<String>,
        count: u64,
        coverage: f64,
        taxonomy: impl Into<String>,
    ) -> Self {
        Self {
            marker: marker.into(),
            sample_name: sample_name.into(),
            sequence: sequence.into(),
            count,
            coverage,
            taxonomy: taxonomy.into(),
        }
    }

    /// Check that the entry can be stored, dumped as TSV and packed into a
    /// sequence record without ambiguity.
    ///
    /// The marker doubles as the file stem of its cluster index, so it must
    /// be a plain file name.
    pub fn validate(&self) -> MarkerDbResult<()> {
        if self.marker.is_empty() || self.marker == "." || self.marker == ".." {
            return Err(self.invalid("marker name must be a non-empty file name"));
        }
        if self.marker.contains(['/', '\\', '\0']) {
            return Err(self.invalid("marker name must not contain path separators"));
        }
        for (field, value) in [
            ("marker", &self.marker),
            ("sample_name", &self.sample_name),
            ("taxonomy", &self.taxonomy),
        ] {
            if value.contains([FIELD_DELIMITER, GROUP_DELIMITER, '\t', '\n', '\r']) {
                return Err(self.invalid(&format!(
                    "{} must not contain '{}', '{}', tabs or line breaks",
                    field, FIELD_DELIMITER, GROUP_DELIMITER
                )));
            }
        }
        if self.sequence.is_empty() || self.sequence.contains(char::is_whitespace) {
            return Err(self.invalid("sequence must be non-empty and free of whitespace"));
        }
        if !self.coverage.is_finite() || self.coverage < 0.0 {
            return Err(self.invalid("coverage must be a finite, non-negative number"));
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> MarkerDbError {
        MarkerDbError::InvalidInput(format!(
            "{} (marker {:?}, sample {:?})",
            reason, self.marker, self.sample_name
        ))
    }
}
