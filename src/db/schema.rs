use sqlx::Row;
use tracing::info;

use super::pool::Pool;
use crate::error::{LoadError, Result};
use crate::model::Measure;

/// Cell values that the pandas-era files use to mean "no value" in numeric columns
const NULL_TOKENS: [&str; 3] = ["", "NA", "N/A"];

/// Semantic column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Coded value, bound as a 64-bit integer
    Integer,
    /// Amount, bound as an integer when integral, otherwise as a float
    Numeric,
    /// Free text, stored verbatim
    Text,
    /// Number or exemption sentinel, stored verbatim as TEXT after validation
    NumericOrExempt,
}

impl ColumnType {
    /// Returns the SQLite type name used in DDL
    pub fn to_sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Numeric => "NUMERIC",
            ColumnType::Text | ColumnType::NumericOrExempt => "TEXT",
        }
    }
}

/// A column in a table schema
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub col_type: ColumnType,
    pub primary_key: bool,
}

impl Column {
    pub const fn new(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            primary_key: false,
        }
    }

    pub const fn primary_key(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            primary_key: true,
        }
    }

    /// Convert a raw field into the value bound for this column
    pub fn coerce(&self, raw: &str) -> std::result::Result<SqlValue, String> {
        let trimmed = raw.trim();
        match self.col_type {
            ColumnType::Text => Ok(SqlValue::Text(raw.to_string())),
            ColumnType::NumericOrExempt => {
                Measure::parse(raw).map_err(|e| format!("column '{}': {}", self.name, e))?;
                Ok(SqlValue::Text(raw.to_string()))
            }
            ColumnType::Integer => {
                if NULL_TOKENS.contains(&trimmed) {
                    return Ok(SqlValue::Null);
                }
                trimmed.parse::<i64>().map(SqlValue::Integer).map_err(|e| {
                    format!(
                        "column '{}': cannot convert '{}' to INTEGER ({})",
                        self.name, raw, e
                    )
                })
            }
            ColumnType::Numeric => {
                if NULL_TOKENS.contains(&trimmed) {
                    return Ok(SqlValue::Null);
                }
                if let Ok(int) = trimmed.parse::<i64>() {
                    return Ok(SqlValue::Integer(int));
                }
                match trimmed.parse::<f64>() {
                    Ok(float) if float.is_finite() => Ok(SqlValue::Real(float)),
                    _ => Err(format!(
                        "column '{}': cannot convert '{}' to NUMERIC",
                        self.name, raw
                    )),
                }
            }
        }
    }
}

/// How the fields of a source row are matched to schema columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// No header row; field `i` is column `i`
    Positional,
    /// First row is a header; fields are matched by column name
    Header,
}

/// Ordered column declarations for one table
#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    pub binding: Binding,
    pub columns: &'static [Column],
}

impl TableSchema {
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Map each schema column to its position in a header row
    ///
    /// The header must name every schema column exactly once and nothing else.
    pub fn bind_header(&self, header: &[String]) -> Result<Vec<usize>> {
        let normalized: Vec<&str> = header
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}'))
            .collect();

        let unknown: Vec<&str> = normalized
            .iter()
            .copied()
            .filter(|h| !self.columns.iter().any(|c| c.name == *h))
            .collect();
        if !unknown.is_empty() {
            return Err(LoadError::schema_mismatch(
                self.name,
                format!("header has unknown columns: {}", unknown.join(", ")),
            ));
        }

        let mut positions = Vec::with_capacity(self.width());
        let mut missing = Vec::new();
        for column in self.columns {
            let matches: Vec<usize> = normalized
                .iter()
                .enumerate()
                .filter(|(_, h)| **h == column.name)
                .map(|(idx, _)| idx)
                .collect();
            match matches.as_slice() {
                [] => missing.push(column.name),
                [idx] => positions.push(*idx),
                _ => {
                    return Err(LoadError::schema_mismatch(
                        self.name,
                        format!("header repeats column '{}'", column.name),
                    ));
                }
            }
        }

        if !missing.is_empty() {
            return Err(LoadError::schema_mismatch(
                self.name,
                format!("header is missing columns: {}", missing.join(", ")),
            ));
        }

        Ok(positions)
    }

    /// Convert a row already in schema order into bound values
    pub fn coerce_row(&self, fields: &[String], line_number: u64) -> Result<Vec<SqlValue>> {
        self.columns
            .iter()
            .zip(fields)
            .map(|(column, raw)| {
                column.coerce(raw).map_err(|reason| {
                    LoadError::schema_mismatch(self.name, format!("line {}: {}", line_number, reason))
                })
            })
            .collect()
    }

    /// Generate the CREATE TABLE statement for this schema
    pub fn generate_ddl(&self) -> String {
        let mut ddl = format!("CREATE TABLE \"{}\" (\n", self.name);

        let column_defs: Vec<String> = self
            .columns
            .iter()
            .map(|col| {
                let pk_clause = if col.primary_key { " PRIMARY KEY" } else { "" };
                format!("  \"{}\" {}{}", col.name, col.col_type.to_sql(), pk_clause)
            })
            .collect();

        ddl.push_str(&column_defs.join(",\n"));
        ddl.push_str("\n);");

        ddl
    }
}

/// A value ready to bind into an INSERT
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

/// Drop and recreate a table so it is empty and matches the schema
pub async fn reinit_table(pool: &Pool, schema: &TableSchema) -> Result<()> {
    pool.execute_query(&format!("DROP TABLE IF EXISTS \"{}\"", schema.name))
        .await?;
    info!(table = schema.name, "Dropped existing table (if existed)");

    pool.execute_query(&schema.generate_ddl()).await?;
    info!(
        table = schema.name,
        columns = schema.width(),
        "Created table with declared schema"
    );
    Ok(())
}

/// Query the column names of an existing table in declared order
pub async fn query_table_columns(pool: &Pool, table_name: &str) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT name FROM pragma_table_info(?) ORDER BY cid")
        .bind(table_name)
        .fetch_all(pool.inner())
        .await?;

    rows.iter()
        .map(|row| row.try_get::<String, _>("name").map_err(LoadError::from))
        .collect()
}

/// Count the rows currently stored in a table
pub async fn count_rows(pool: &Pool, table_name: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM \"{}\"", table_name);
    let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(pool.inner()).await?;
    Ok(count)
}
