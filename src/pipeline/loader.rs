use chrono::Utc;
use derive_builder::Builder;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use super::writer::{BoundRow, BulkWriter};
use crate::config::DEFAULT_BATCH_SIZE;
use crate::db::schema::{count_rows, query_table_columns, reinit_table};
use crate::db::{Binding, LENDER_RECORD, LOAN_RECORD, Pool, TableSchema};
use crate::error::{LoadError, Result};
use crate::formats::{DelimitedConfig, SourceData, SourceReader};
use crate::telemetry::{ProgressStats, TelemetryEvent};

/// Which regulatory file a load ingests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    /// Loan-level records into `hmda_data`
    Loans,
    /// Lender panel into `Lender`
    Lenders,
}

impl Dataset {
    pub fn schema(&self) -> &'static TableSchema {
        match self {
            Dataset::Loans => &LOAN_RECORD,
            Dataset::Lenders => &LENDER_RECORD,
        }
    }

    pub fn table_name(&self) -> &'static str {
        self.schema().name
    }

    pub fn delimited_config(&self) -> DelimitedConfig {
        match self {
            Dataset::Loans => DelimitedConfig::loan_file(),
            Dataset::Lenders => DelimitedConfig::panel_file(),
        }
    }
}

/// Configuration for one table load
#[derive(Debug, Clone, Builder)]
pub struct LoadConfig {
    #[builder(setter(into))]
    pub source_path: PathBuf,
    pub dataset: Dataset,
    #[builder(default = "DEFAULT_BATCH_SIZE")]
    pub batch_size: usize,
    #[builder(default = "false")]
    pub quiet: bool,
}

/// Result of a completed table load
#[derive(Debug)]
pub struct LoadResult {
    pub load_id: String,
    pub table: String,
    pub started_at: String,
    pub records_loaded: u64,
    pub bytes_read: u64,
    pub duration: Duration,
    /// p50 / p90 / p99 batch insert time in milliseconds
    pub batch_percentiles_ms: (Option<u64>, Option<u64>, Option<u64>),
}

/// The Loader runs the drop → create → parse → validate → insert pipeline.
pub struct Loader {
    file_reader: Arc<dyn SourceReader>,
    pool: Pool,
}

impl Loader {
    pub fn new(file_reader: Arc<dyn SourceReader>, pool: Pool) -> Self {
        Self { file_reader, pool }
    }

    /// Run the complete table load
    ///
    /// 1. Drop and recreate the destination table
    /// 2. Parse the whole source file
    /// 3. Bind every row to the schema and validate its values
    /// 4. Insert all rows in one transaction
    pub async fn run_load(&self, config: &LoadConfig) -> Result<LoadResult> {
        let start_time = Instant::now();
        let load_id = Uuid::new_v4().to_string();
        let started_at = Utc::now().to_rfc3339();
        let schema = config.dataset.schema();

        info!(
            load_id = %load_id,
            table = schema.name,
            source = %config.source_path.display(),
            "Starting load"
        );

        // 1. Reinitialize table
        reinit_table(&self.pool, schema).await?;
        self.verify_table_columns(schema).await?;

        // 2. Parse source
        let source = self.file_reader.read_all().await?;
        info!(
            "Read {} records ({} bytes) from {}",
            source.records.len(),
            source.bytes_read,
            self.file_reader.location().display()
        );

        // 3. Bind and validate
        let bytes_read = source.bytes_read;
        let rows = self.bind_records(schema, source)?;

        // 4. Insert
        let (telemetry_tx, telemetry_rx) = mpsc::unbounded_channel::<TelemetryEvent>();
        let progress = Self::setup_progress_tracking(config.quiet, telemetry_rx);

        let writer = BulkWriter::new(self.pool.clone(), config.batch_size, telemetry_tx);
        let outcome = writer.write_all(schema, &rows).await;

        // Dropping the writer closes the channel so the progress task can finish
        drop(writer);
        let stats = progress.await.unwrap_or_default();
        let records_loaded = outcome?;

        let stored = count_rows(&self.pool, schema.name).await?;
        if stored != records_loaded as i64 {
            warn!(
                table = schema.name,
                stored, records_loaded, "Stored row count differs from rows committed"
            );
        }

        let duration = start_time.elapsed();
        info!(
            "Load complete: {} records committed to '{}' in {:.2}s",
            records_loaded,
            schema.name,
            duration.as_secs_f64()
        );

        Ok(LoadResult {
            load_id,
            table: schema.name.to_string(),
            started_at,
            records_loaded,
            bytes_read,
            duration,
            batch_percentiles_ms: stats.get_percentiles(),
        })
    }

    /// Check the recreated table has exactly the declared columns, in order
    async fn verify_table_columns(&self, schema: &TableSchema) -> Result<()> {
        let actual = query_table_columns(&self.pool, schema.name).await?;
        if actual != schema.column_names() {
            return Err(LoadError::schema_mismatch(
                schema.name,
                format!(
                    "created table has columns [{}], expected [{}]",
                    actual.join(", "),
                    schema.column_names().join(", ")
                ),
            ));
        }
        Ok(())
    }

    /// Put every record into schema order and convert its values
    ///
    /// Fails on the first row whose width differs from the schema, before
    /// anything is written.
    fn bind_records(&self, schema: &TableSchema, source: SourceData) -> Result<Vec<BoundRow>> {
        let positions = match schema.binding {
            Binding::Positional => None,
            Binding::Header => {
                let header = source.header.as_deref().ok_or_else(|| {
                    LoadError::source_file(self.file_reader.location(), "missing header row")
                })?;
                Some(schema.bind_header(header)?)
            }
        };
        let expected_width = schema.width();

        let mut rows = Vec::with_capacity(source.records.len());
        for record in source.records {
            if record.fields.len() != expected_width {
                return Err(LoadError::source_file(
                    self.file_reader.location(),
                    format!(
                        "line {}: expected {} fields for table '{}', found {}",
                        record.line_number,
                        expected_width,
                        schema.name,
                        record.fields.len()
                    ),
                ));
            }

            let ordered = match &positions {
                None => record.fields,
                Some(positions) => positions
                    .iter()
                    .map(|&idx| record.fields[idx].clone())
                    .collect(),
            };

            rows.push(BoundRow {
                line_number: record.line_number,
                values: schema.coerce_row(&ordered, record.line_number)?,
            });
        }

        Ok(rows)
    }

    /// Collect telemetry, drawing a progress bar unless quiet
    fn setup_progress_tracking(
        quiet: bool,
        mut telemetry_rx: mpsc::UnboundedReceiver<TelemetryEvent>,
    ) -> tokio::task::JoinHandle<ProgressStats> {
        let bar = if quiet {
            None
        } else {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "[{elapsed_precise}] Rows: [{bar:30.green/blue}] {human_pos}/{human_len} ({percent}%) | {per_sec}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            Some(bar)
        };

        tokio::spawn(async move {
            let mut stats = ProgressStats::new();

            while let Some(event) = telemetry_rx.recv().await {
                stats.update(&event);

                if let Some(ref bar) = bar {
                    bar.set_length(stats.total_rows);
                    bar.set_position(stats.rows_inserted);
                }
            }

            if let Some(bar) = bar {
                if stats.rolled_back {
                    bar.abandon_with_message("rolled back");
                } else {
                    bar.finish();
                }
            }

            stats
        })
    }
}
