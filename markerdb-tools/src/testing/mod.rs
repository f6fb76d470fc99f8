//! In-process stand-ins for the external tools

pub mod mock;

pub use mock::{MockClusterer, MockIndexBuilder};
