//! High-level runner API for the HMDA loaders and reports.
//!
//! This module provides a simplified public interface that encapsulates opening
//! the database, wiring readers to the load pipeline and running reports.
//!
//! This is the primary API for external users and for the CLI.

use anyhow::{Context, bail};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{LENDER_TABLE, LOAN_TABLE};
use crate::db::Pool;
use crate::formats::GenericDelimitedReader;
use crate::io::LocalFileByteReader;
use crate::pipeline::{LoadConfigBuilder, Loader};
use crate::report::{pull_through, volume};

pub use crate::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_DATABASE_PATH, DEFAULT_LENDER_FILE, DEFAULT_LOAN_FILE,
    DEFAULT_OUTPUT_DIR, DEFAULT_PULL_THROUGH_DIR,
};
pub use crate::error::LoadError;
pub use crate::model::{ActionTaken, LoanType, Measure};
pub use crate::pipeline::{Dataset, LoadResult};
pub use crate::report::{ClosedFilter, LoanTypeSelection, VolumeOptions};

/// Arguments for loading one source file into its table
#[derive(Debug, Clone)]
pub struct LoadArgs {
    pub database_path: PathBuf,
    pub source_path: PathBuf,
    pub dataset: Dataset,
    pub batch_size: usize,
    pub quiet: bool,

    // Test-only: inject a pre-created pool (for in-memory SQLite)
    #[cfg(test)]
    pub test_pool: Option<Pool>,
}

impl LoadArgs {
    pub fn new(dataset: Dataset, source_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            source_path: source_path.into(),
            dataset,
            batch_size: DEFAULT_BATCH_SIZE,
            quiet: false,
            #[cfg(test)]
            test_pool: None,
        }
    }

    #[cfg(test)]
    fn injected_pool(&self) -> Option<Pool> {
        self.test_pool.clone()
    }

    #[cfg(not(test))]
    fn injected_pool(&self) -> Option<Pool> {
        None
    }
}

/// Arguments for running a report
#[derive(Debug, Clone)]
pub struct ReportArgs {
    pub database_path: PathBuf,
    pub output_dir: PathBuf,

    #[cfg(test)]
    pub test_pool: Option<Pool>,
}

impl ReportArgs {
    pub fn new(database_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            output_dir: output_dir.into(),
            #[cfg(test)]
            test_pool: None,
        }
    }

    #[cfg(test)]
    fn injected_pool(&self) -> Option<Pool> {
        self.test_pool.clone()
    }

    #[cfg(not(test))]
    fn injected_pool(&self) -> Option<Pool> {
        None
    }
}

/// Which pool a run uses, and whether the run owns it
struct RunPool {
    pool: Pool,
    owned: bool,
}

impl RunPool {
    /// Loads create the database file and its directory when missing
    async fn for_load(database_path: &Path, injected: Option<Pool>) -> Result<Self, LoadError> {
        if let Some(pool) = injected {
            return Ok(Self { pool, owned: false });
        }

        Ok(Self {
            pool: Pool::open(database_path).await?,
            owned: true,
        })
    }

    /// Reports only read, so a missing database is an error
    async fn for_report(database_path: &Path, injected: Option<Pool>) -> anyhow::Result<Self> {
        if let Some(pool) = injected {
            return Ok(Self { pool, owned: false });
        }

        let pool = Pool::open_existing(database_path)
            .await
            .with_context(|| format!("Failed to open database {}", database_path.display()))?;
        Ok(Self { pool, owned: true })
    }

    /// Reports join both tables, so both must have been loaded
    async fn require_loaded_tables(&self) -> anyhow::Result<()> {
        for table in [LOAN_TABLE, LENDER_TABLE] {
            if !self.pool.table_exists(table).await? {
                bail!(
                    "Table '{}' not found in {}. Load it before running reports",
                    table,
                    self.pool.location()
                );
            }
        }
        Ok(())
    }

    async fn release(self) {
        if self.owned {
            self.pool.close().await;
        }
    }
}

/// Load one source file, replacing the contents of its table
///
/// The table is dropped and recreated, then filled from the file in a single
/// transaction. On error the table is left empty and the typed error is
/// returned.
///
/// # Example
///
/// ```no_run
/// use hmda_loader::runner::{Dataset, LoadArgs, run_load};
///
/// # async fn example() -> Result<(), hmda_loader::runner::LoadError> {
/// let args = LoadArgs::new(Dataset::Lenders, "data/2023_ts.txt");
/// let result = run_load(args).await?;
/// println!("Loaded {} records in {:?}", result.records_loaded, result.duration);
/// # Ok(())
/// # }
/// ```
pub async fn run_load(args: LoadArgs) -> Result<LoadResult, LoadError> {
    let run_pool = RunPool::for_load(&args.database_path, args.injected_pool()).await?;

    let byte_reader = LocalFileByteReader::new(&args.source_path);
    let file_reader = GenericDelimitedReader::new(byte_reader, args.dataset.delimited_config());
    let loader = Loader::new(Arc::new(file_reader), run_pool.pool.clone());

    let load_config = LoadConfigBuilder::default()
        .source_path(args.source_path.clone())
        .dataset(args.dataset)
        .batch_size(args.batch_size)
        .quiet(args.quiet)
        .build()
        .map_err(|e| LoadError::source_file(&args.source_path, e.to_string()))?;

    let result = loader.run_load(&load_config).await;
    run_pool.release().await;
    result
}

/// Compute pull-through rates and write them under `output_dir`
pub async fn run_pull_through(args: ReportArgs) -> anyhow::Result<Vec<PathBuf>> {
    let run_pool = RunPool::for_report(&args.database_path, args.injected_pool()).await?;

    let result = match run_pool.require_loaded_tables().await {
        Ok(()) => pull_through::run(&run_pool.pool, &args.output_dir).await,
        Err(e) => Err(e),
    };
    run_pool.release().await;
    result
}

/// Compute loan volume tables and write them under `output_dir`
pub async fn run_volume(args: ReportArgs, options: VolumeOptions) -> anyhow::Result<Vec<PathBuf>> {
    let run_pool = RunPool::for_report(&args.database_path, args.injected_pool()).await?;

    let result = match run_pool.require_loaded_tables().await {
        Ok(()) => volume::run(&run_pool.pool, &args.output_dir, &options).await,
        Err(e) => Err(e),
    };
    run_pool.release().await;
    result
}
