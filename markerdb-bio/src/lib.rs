//! Marker-gene observation types and the text formats they travel in

pub mod formats;
pub mod otu;

// Re-export commonly used types
pub use formats::defline::{DefLineEntry, SequenceRecord, FIELD_DELIMITER, GROUP_DELIMITER};
pub use formats::fasta::write_pseudo_fasta;
pub use otu::table::{OtuTableReader, OtuTableWriter, DEFAULT_OUTPUT_FIELDS};
pub use otu::OtuEntry;
