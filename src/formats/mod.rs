//! Delimited file parsing

pub mod delimited;
pub mod reader;

pub use delimited::GenericDelimitedReader;
pub use reader::{DelimitedConfig, SourceData, SourceReader};
