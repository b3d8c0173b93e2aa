//! Table load pipeline: reinitialize, parse, validate, bulk insert

pub mod loader;
pub mod writer;

pub use loader::{Dataset, LoadConfigBuilder, LoadResult, Loader};
