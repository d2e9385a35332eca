//! CLI command implementations.

pub mod parse;
pub mod query;
pub mod test;
pub mod version;
