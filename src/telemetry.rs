/// Telemetry events emitted by the bulk writer while a load runs
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    /// Rows were parsed and validated, insertion is about to start
    InsertStarted { total_rows: u64 },
    /// Batch of rows was inserted (not yet committed)
    BatchInserted { rows: u64, duration_ms: u64 },
    /// Transaction committed
    Committed { rows: u64 },
    /// Transaction rolled back
    RolledBack,
}

/// Statistics aggregated from telemetry events
#[derive(Debug, Default, Clone)]
pub struct ProgressStats {
    pub total_rows: u64,
    pub rows_inserted: u64,
    pub rows_committed: u64,
    pub batches: usize,
    pub rolled_back: bool,
    pub batch_durations_ms: Vec<u64>,
}

impl ProgressStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats with a telemetry event
    pub fn update(&mut self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::InsertStarted { total_rows } => {
                self.total_rows = *total_rows;
            }
            TelemetryEvent::BatchInserted { rows, duration_ms } => {
                self.batches += 1;
                self.rows_inserted += rows;
                self.batch_durations_ms.push(*duration_ms);
            }
            TelemetryEvent::Committed { rows } => {
                self.rows_committed = *rows;
            }
            TelemetryEvent::RolledBack => {
                // Inserted rows were never made visible
                self.rows_committed = 0;
                self.rolled_back = true;
            }
        }
    }

    /// Calculate percentile from batch durations
    pub fn percentile(&self, p: f64) -> Option<u64> {
        if self.batch_durations_ms.is_empty() {
            return None;
        }

        let mut sorted = self.batch_durations_ms.clone();
        sorted.sort_unstable();

        let index = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
        let index = index.saturating_sub(1).min(sorted.len() - 1);

        Some(sorted[index])
    }

    /// Get p50, p90, p99 percentiles
    pub fn get_percentiles(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        (
            self.percentile(50.0),
            self.percentile(90.0),
            self.percentile(99.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_flow() {
        let mut stats = ProgressStats::new();
        stats.update(&TelemetryEvent::InsertStarted { total_rows: 30 });
        for duration_ms in [5, 7, 9] {
            stats.update(&TelemetryEvent::BatchInserted {
                rows: 10,
                duration_ms,
            });
        }
        stats.update(&TelemetryEvent::Committed { rows: 30 });

        assert_eq!(stats.batches, 3);
        assert_eq!(stats.rows_inserted, 30);
        assert_eq!(stats.rows_committed, 30);
        assert!(!stats.rolled_back);
    }

    #[test]
    fn test_rollback_clears_committed_rows() {
        let mut stats = ProgressStats::new();
        stats.update(&TelemetryEvent::BatchInserted {
            rows: 10,
            duration_ms: 1,
        });
        stats.update(&TelemetryEvent::RolledBack);

        assert_eq!(stats.rows_inserted, 10);
        assert_eq!(stats.rows_committed, 0);
        assert!(stats.rolled_back);
    }

    #[test]
    fn test_percentiles() {
        let mut stats = ProgressStats::new();
        assert_eq!(stats.get_percentiles(), (None, None, None));

        for duration_ms in 1..=100 {
            stats.update(&TelemetryEvent::BatchInserted {
                rows: 1,
                duration_ms,
            });
        }

        assert_eq!(stats.get_percentiles(), (Some(50), Some(90), Some(99)));
        assert_eq!(stats.percentile(0.0), Some(1));
    }
}
