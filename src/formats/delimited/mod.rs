pub mod reader;

pub use reader::GenericDelimitedReader;
