pub mod dump;
pub mod info;
pub mod makedb;
pub mod query;
