//! Configuration constants for the HMDA loader
//!
//! This module centralizes the file and table naming conventions and the
//! tunable parameters used throughout the application.

// ============================================================================
// Conventional Paths
// ============================================================================

pub const DEFAULT_DATABASE_PATH: &str = "database/hmda_analysis.db";

pub const DEFAULT_LOAN_FILE: &str = "data/2024_combined_mlar.txt";

pub const DEFAULT_LENDER_FILE: &str = "data/2023_ts.txt";

pub const DEFAULT_OUTPUT_DIR: &str = "output";

pub const DEFAULT_PULL_THROUGH_DIR: &str = "output/pull_through_rate";

// ============================================================================
// Table Names
// ============================================================================

pub const LOAN_TABLE: &str = "hmda_data";

pub const LENDER_TABLE: &str = "Lender";

// ============================================================================
// Source File Format
// ============================================================================

/// Both regulatory files are pipe-delimited
pub const SOURCE_DELIMITER: u8 = b'|';

// ============================================================================
// Insert Configuration
// ============================================================================

/// Highest number of bind parameters a single SQLite statement may carry
///
/// SQLite has allowed 32766 host parameters per statement since 3.32. Batches
/// are sized so that `rows * columns` stays under this ceiling.
pub const SQLITE_MAX_BIND_PARAMS: usize = 32_766;

/// Default number of rows per multi-row INSERT
///
/// 250 rows of the 85-column loan schema bind 21250 parameters, which keeps
/// the statement comfortably under the SQLite ceiling.
pub const DEFAULT_BATCH_SIZE: usize = 250;
