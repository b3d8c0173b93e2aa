use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::info;

use super::pivot::Pivot;

/// Write serializable rows to `dir/file_name`, header taken from field names
///
/// An empty result still produces a file (with no header row).
pub async fn write_rows<T: Serialize>(dir: &Path, file_name: &str, rows: &[T]) -> Result<PathBuf> {
    let path = prepare(dir, file_name).await?;
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }
    writer.flush()?;

    info!(file = %path.display(), rows = rows.len(), "Exported report");
    Ok(path)
}

/// Write a pivot table: one row per index value, one column per pivot column
pub async fn write_pivot<V>(
    dir: &Path,
    file_name: &str,
    index_name: &str,
    pivot: &Pivot<V>,
) -> Result<PathBuf>
where
    V: Copy + Default + Display,
{
    let path = prepare(dir, file_name).await?;
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut header = vec![index_name.to_string()];
    header.extend(pivot.columns().map(str::to_string));
    writer.write_record(&header)?;

    for (index, values) in pivot.rows() {
        let mut record = vec![index.to_string()];
        record.extend(values.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!(file = %path.display(), rows = pivot.len(), "Exported pivot");
    Ok(path)
}

async fn prepare(dir: &Path, file_name: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    Ok(dir.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Amount;
    use tempfile::TempDir;

    #[derive(Serialize)]
    struct Row {
        respondent_name: Option<String>,
        loan_count: i64,
    }

    #[tokio::test]
    async fn test_write_rows_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested/out");
        let rows = vec![
            Row {
                respondent_name: Some("First Bank".to_string()),
                loan_count: 3,
            },
            Row {
                respondent_name: None,
                loan_count: 1,
            },
        ];

        let path = write_rows(&dir, "rows.csv", &rows).await.unwrap();
        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            written,
            "respondent_name,loan_count\nFirst Bank,3\n,1\n"
        );
    }

    #[tokio::test]
    async fn test_write_pivot() {
        let temp = TempDir::new().unwrap();
        let mut pivot = Pivot::new();
        pivot.add(Some("B Bank"), "VA", 2i64);
        pivot.add(Some("A Bank"), "FHA", 1);

        let path = write_pivot(temp.path(), "pivot.csv", "respondent_name", &pivot)
            .await
            .unwrap();
        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            written,
            "respondent_name,FHA,VA\nA Bank,1,0\nB Bank,0,2\n"
        );
    }

    #[tokio::test]
    async fn test_write_amount_pivot_into_new_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("output");
        let mut pivot = Pivot::new();
        pivot.add(Some("A Bank"), "Conventional", Amount(255_000.0));
        pivot.add(Some("A Bank"), "Conventional", Amount(255_000.0));
        pivot.add(Some("B Bank"), "FHA", Amount(99_500.5));

        let path = write_pivot(&dir, "amounts.csv", "respondent_name", &pivot)
            .await
            .unwrap();
        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            written,
            "respondent_name,Conventional,FHA\nA Bank,510000,0\nB Bank,0,99500.5\n"
        );
    }
}
