pub mod smafa;

pub use smafa::SmafaTool;
