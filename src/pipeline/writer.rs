use sqlx::query::Query;
use sqlx::{Database, Sqlite, Transaction};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::SQLITE_MAX_BIND_PARAMS;
use crate::db::{Pool, SqlValue, TableSchema};
use crate::error::{LoadError, Result};
use crate::telemetry::TelemetryEvent;

type SqliteQuery<'q> = Query<'q, Sqlite, <Sqlite as Database>::Arguments<'q>>;

/// A validated row in schema order, remembering where it came from
#[derive(Debug, Clone)]
pub struct BoundRow {
    pub line_number: u64,
    pub values: Vec<SqlValue>,
}

/// Writes bound rows into a freshly initialized table as one unit
pub struct BulkWriter {
    pool: Pool,
    batch_size: usize,
    telemetry_tx: mpsc::UnboundedSender<TelemetryEvent>,
}

impl BulkWriter {
    pub fn new(
        pool: Pool,
        batch_size: usize,
        telemetry_tx: mpsc::UnboundedSender<TelemetryEvent>,
    ) -> Self {
        Self {
            pool,
            batch_size,
            telemetry_tx,
        }
    }

    /// Rows per statement, capped so one INSERT never exceeds the bind limit
    fn rows_per_batch(&self, width: usize) -> usize {
        let ceiling = SQLITE_MAX_BIND_PARAMS / width.max(1);
        self.batch_size.clamp(1, ceiling.max(1))
    }

    /// Insert every row inside a single transaction
    ///
    /// Either all rows are committed and their count returned, or the
    /// transaction is rolled back and the table is left as it was.
    pub async fn write_all(&self, schema: &TableSchema, rows: &[BoundRow]) -> Result<u64> {
        let _ = self.telemetry_tx.send(TelemetryEvent::InsertStarted {
            total_rows: rows.len() as u64,
        });

        let mut tx = self.pool.begin().await?;

        match self.insert_batches(&mut tx, schema, rows).await {
            Ok(inserted) => {
                tx.commit()
                    .await
                    .map_err(|e| LoadError::from_insert(schema.name, e))?;
                let _ = self
                    .telemetry_tx
                    .send(TelemetryEvent::Committed { rows: inserted });
                Ok(inserted)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(table = schema.name, "Rollback failed: {}", rollback_err);
                }
                let _ = self.telemetry_tx.send(TelemetryEvent::RolledBack);
                Err(e)
            }
        }
    }

    async fn insert_batches(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        schema: &TableSchema,
        rows: &[BoundRow],
    ) -> Result<u64> {
        let rows_per_batch = self.rows_per_batch(schema.width());
        let mut inserted = 0u64;

        for batch in rows.chunks(rows_per_batch) {
            let start = Instant::now();
            let insert_sql = Self::build_insert_sql(schema, batch.len());

            let mut query = sqlx::query(&insert_sql);
            for row in batch {
                for value in &row.values {
                    query = Self::bind_value(query, value);
                }
            }

            query.execute(&mut **tx).await.map_err(|e| {
                let first_line = batch.first().map_or(0, |r| r.line_number);
                match LoadError::from_insert(schema.name, e) {
                    LoadError::ConstraintViolation { table, message } => {
                        LoadError::ConstraintViolation {
                            table,
                            message: format!(
                                "{} (batch of {} rows starting at line {})",
                                message,
                                batch.len(),
                                first_line
                            ),
                        }
                    }
                    other => other,
                }
            })?;

            inserted += batch.len() as u64;
            let duration_ms = start.elapsed().as_millis() as u64;
            debug!(
                table = schema.name,
                rows = batch.len(),
                duration_ms,
                "Inserted batch"
            );
            let _ = self.telemetry_tx.send(TelemetryEvent::BatchInserted {
                rows: batch.len() as u64,
                duration_ms,
            });
        }

        Ok(inserted)
    }

    /// Build a multi-row INSERT: INSERT INTO t ("a", "b") VALUES (?, ?), (?, ?), ...
    fn build_insert_sql(schema: &TableSchema, row_count: usize) -> String {
        let column_list: Vec<String> = schema
            .columns
            .iter()
            .map(|c| format!("\"{}\"", c.name))
            .collect();

        let placeholders = format!("({})", vec!["?"; schema.width()].join(", "));
        let value_groups = vec![placeholders.as_str(); row_count].join(", ");

        format!(
            "INSERT INTO \"{}\" ({}) VALUES {}",
            schema.name,
            column_list.join(", "),
            value_groups
        )
    }

    fn bind_value<'q>(query: SqliteQuery<'q>, value: &'q SqlValue) -> SqliteQuery<'q> {
        match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::{Binding, Column, ColumnType, count_rows, reinit_table};

    static PAIRS: TableSchema = TableSchema {
        name: "pairs",
        binding: Binding::Header,
        columns: &[
            Column::primary_key("key", ColumnType::Text),
            Column::new("value", ColumnType::Integer),
        ],
    };

    fn row(line_number: u64, key: &str, value: i64) -> BoundRow {
        BoundRow {
            line_number,
            values: vec![SqlValue::Text(key.to_string()), SqlValue::Integer(value)],
        }
    }

    fn writer(pool: &Pool, batch_size: usize) -> BulkWriter {
        let (tx, _rx) = mpsc::unbounded_channel();
        BulkWriter::new(pool.clone(), batch_size, tx)
    }

    #[test]
    fn test_build_insert_sql() {
        let sql = BulkWriter::build_insert_sql(&PAIRS, 2);
        assert_eq!(
            sql,
            "INSERT INTO \"pairs\" (\"key\", \"value\") VALUES (?, ?), (?, ?)"
        );
    }

    #[tokio::test]
    async fn test_rows_per_batch_respects_bind_limit() {
        let pool = Pool::sqlite_in_memory().await.unwrap();
        let writer = writer(&pool, 100_000);
        assert_eq!(writer.rows_per_batch(85), SQLITE_MAX_BIND_PARAMS / 85);
        assert_eq!(writer.rows_per_batch(2), SQLITE_MAX_BIND_PARAMS / 2);

        let writer = BulkWriter {
            batch_size: 0,
            ..writer
        };
        assert_eq!(writer.rows_per_batch(2), 1);
    }

    #[tokio::test]
    async fn test_write_all_across_batches() {
        let pool = Pool::sqlite_in_memory().await.unwrap();
        reinit_table(&pool, &PAIRS).await.unwrap();

        let rows: Vec<BoundRow> = (0..25)
            .map(|i| row(i + 1, &format!("k{}", i), i as i64))
            .collect();
        let inserted = writer(&pool, 10)
            .write_all(&PAIRS, &rows)
            .await
            .unwrap();

        assert_eq!(inserted, 25);
        assert_eq!(count_rows(&pool, "pairs").await.unwrap(), 25);
    }

    #[tokio::test]
    async fn test_duplicate_key_rolls_back_every_batch() {
        let pool = Pool::sqlite_in_memory().await.unwrap();
        reinit_table(&pool, &PAIRS).await.unwrap();

        // The duplicate sits in the third batch, after two batches already went in
        let mut rows: Vec<BoundRow> = (0..20)
            .map(|i| row(i + 1, &format!("k{}", i), 0))
            .collect();
        rows.push(row(21, "k3", 1));

        let err = writer(&pool, 10)
            .write_all(&PAIRS, &rows)
            .await
            .unwrap_err();

        assert!(matches!(err, LoadError::ConstraintViolation { .. }));
        assert!(err.to_string().contains("line 21"));
        assert_eq!(count_rows(&pool, "pairs").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_null_binding() {
        let pool = Pool::sqlite_in_memory().await.unwrap();
        reinit_table(&pool, &PAIRS).await.unwrap();

        let rows = vec![BoundRow {
            line_number: 1,
            values: vec![SqlValue::Text("k".to_string()), SqlValue::Null],
        }];
        writer(&pool, 10).write_all(&PAIRS, &rows).await.unwrap();

        let (value,): (Option<i64>,) = sqlx::query_as("SELECT value FROM pairs")
            .fetch_one(pool.inner())
            .await
            .unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_telemetry_events() {
        let pool = Pool::sqlite_in_memory().await.unwrap();
        reinit_table(&pool, &PAIRS).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let writer = BulkWriter::new(pool.clone(), 2, tx);
        let rows: Vec<BoundRow> = (0..3).map(|i| row(i + 1, &format!("k{}", i), 0)).collect();
        writer.write_all(&PAIRS, &rows).await.unwrap();
        drop(writer);

        let mut stats = crate::telemetry::ProgressStats::new();
        while let Some(event) = rx.recv().await {
            stats.update(&event);
        }
        assert_eq!(stats.total_rows, 3);
        assert_eq!(stats.batches, 2);
        assert_eq!(stats.rows_committed, 3);
    }
}
