//! Persistent state of a marker database: the contents descriptor and the
//! SQLite store of observations and cluster memberships

pub mod contents;
pub mod sqlite;

pub use contents::{ContentsDescriptor, CONTENTS_FILE_NAME, CURRENT_VERSION};
pub use sqlite::{ClusterWriter, ObservationStream, OtuStore, SQLITE_DB_NAME};
