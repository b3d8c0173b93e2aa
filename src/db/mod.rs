//! Database layer - SQLite connection handling, table schemas and DDL

pub mod pool;
pub mod schema;
pub mod tables;

pub use pool::Pool;
pub use schema::{Binding, SqlValue, TableSchema};
pub use tables::{LENDER_RECORD, LOAN_RECORD};
