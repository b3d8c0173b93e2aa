//! I/O abstraction layer for reading source file bytes

pub mod byte_reader;
pub mod local_reader;

pub use byte_reader::ByteReader;
pub use local_reader::LocalFileByteReader;
