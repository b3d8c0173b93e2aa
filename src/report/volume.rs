//! Loan volume by year, lender, loan type and state

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::Sqlite;
use std::path::{Path, PathBuf};
use tracing::info;

use super::options::{ClosedFilter, VolumeOptions};
use super::pivot::Pivot;
use super::{Amount, billions, export, thousands};
use crate::config::{LENDER_TABLE, LOAN_TABLE};
use crate::db::Pool;
use crate::model::{ActionTaken, LoanType};

/// Volume for one lender and year, split by loan type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanTypeVolumeRow {
    pub activity_year: Option<i64>,
    pub loan_type: Option<i64>,
    pub loan_type_name: String,
    pub respondent_name: Option<String>,
    pub loan_count: i64,
    pub total_loan_amount: Option<Amount>,
    pub avg_loan_amount: Option<f64>,
    pub loan_count_000s: f64,
    pub loan_amount_bil: Option<f64>,
}

/// Volume for one lender and year across loan types
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LenderVolumeRow {
    pub activity_year: Option<i64>,
    pub respondent_name: Option<String>,
    pub loan_count: i64,
    pub total_loan_amount: Option<Amount>,
    pub avg_loan_amount: Option<f64>,
    pub loan_count_000s: f64,
    pub loan_amount_bil: Option<f64>,
}

/// Volume for one lender, year and state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateVolumeRow {
    pub activity_year: Option<i64>,
    pub state: Option<String>,
    pub respondent_name: Option<String>,
    pub loan_count: i64,
    pub total_loan_amount: Option<Amount>,
    pub avg_loan_amount: Option<f64>,
    pub loan_count_000s: f64,
    pub loan_amount_bil: Option<f64>,
}

/// Year/lender volume in the shape the loan type selection asks for
#[derive(Debug, Clone, PartialEq)]
pub enum LenderVolume {
    Total(Vec<LenderVolumeRow>),
    ByLoanType(Vec<LoanTypeVolumeRow>),
}

impl LenderVolume {
    pub fn len(&self) -> usize {
        match self {
            LenderVolume::Total(rows) => rows.len(),
            LenderVolume::ByLoanType(rows) => rows.len(),
        }
    }
}

// (activity_year, respondent_name, loan_count, total_loan_amount, avg_loan_amount)
type LenderTuple = (Option<i64>, Option<String>, i64, Option<f64>, Option<f64>);
// (activity_year, loan_type, respondent_name, ...)
type LoanTypeTuple = (Option<i64>, Option<i64>, Option<String>, i64, Option<f64>, Option<f64>);
// (activity_year, state, respondent_name, ...)
type StateTuple = (Option<i64>, Option<String>, Option<String>, i64, Option<f64>, Option<f64>);

/// Shared WHERE clause; the loan type, if any, is bound as the only parameter
fn where_clause(options: &VolumeOptions) -> String {
    let mut clause = String::from(
        "WHERE h.business_or_commercial_purpose = 2 \
         AND h.open_end_line_of_credit = 2 \
         AND h.reverse_mortgage = 2 \
         AND h.loan_purpose = 1",
    );
    if options.closed == ClosedFilter::ClosedOnly {
        clause.push_str(&format!(
            " AND h.action_taken IN {}",
            ActionTaken::sql_list(&ActionTaken::CLOSED_CODES)
        ));
    }
    if options.loan_types.loan_type().is_some() {
        clause.push_str(" AND h.loan_type = ?");
    }
    clause
}

const VOLUME_COLUMNS: &str = "COUNT(*) AS loan_count, \
     CAST(SUM(h.loan_amount) AS REAL) AS total_loan_amount, \
     AVG(h.loan_amount) AS avg_loan_amount";

pub async fn by_lender(pool: &Pool, options: &VolumeOptions) -> Result<LenderVolume> {
    let bound_loan_type = options.loan_types.loan_type().map(|t| t.code());

    if !options.loan_types.splits_loan_types() {
        let sql = format!(
            "SELECT h.activity_year, l.respondent_name, {columns} \
             FROM \"{loans}\" h \
             LEFT JOIN \"{lenders}\" l ON h.lei = l.lei \
             {filter} \
             GROUP BY h.activity_year, l.respondent_name \
             ORDER BY h.activity_year, loan_count DESC",
            columns = VOLUME_COLUMNS,
            loans = LOAN_TABLE,
            lenders = LENDER_TABLE,
            filter = where_clause(options),
        );
        let rows = sqlx::query_as::<Sqlite, LenderTuple>(&sql)
            .fetch_all(pool.inner())
            .await
            .context("Volume by lender query failed")?;

        return Ok(LenderVolume::Total(
            rows.into_iter()
                .map(|(activity_year, respondent_name, count, total, avg)| {
                    LenderVolumeRow {
                        activity_year,
                        respondent_name,
                        loan_count: count,
                        total_loan_amount: total.map(Amount),
                        avg_loan_amount: avg,
                        loan_count_000s: thousands(count),
                        loan_amount_bil: total.map(billions),
                    }
                })
                .collect(),
        ));
    }

    let sql = format!(
        "SELECT h.activity_year, h.loan_type, l.respondent_name, {columns} \
         FROM \"{loans}\" h \
         LEFT JOIN \"{lenders}\" l ON h.lei = l.lei \
         {filter} \
         GROUP BY h.activity_year, l.respondent_name, h.loan_type \
         ORDER BY h.activity_year, loan_count DESC",
        columns = VOLUME_COLUMNS,
        loans = LOAN_TABLE,
        lenders = LENDER_TABLE,
        filter = where_clause(options),
    );
    let mut query = sqlx::query_as::<Sqlite, LoanTypeTuple>(&sql);
    if let Some(code) = bound_loan_type {
        query = query.bind(code);
    }
    let rows = query
        .fetch_all(pool.inner())
        .await
        .context("Volume by lender and loan type query failed")?;

    Ok(LenderVolume::ByLoanType(
        rows.into_iter()
            .map(|(activity_year, loan_type, respondent_name, count, total, avg)| {
                LoanTypeVolumeRow {
                    activity_year,
                    loan_type,
                    loan_type_name: loan_type
                        .map_or("Unknown", LoanType::name_for_code)
                        .to_string(),
                    respondent_name,
                    loan_count: count,
                    total_loan_amount: total.map(Amount),
                    avg_loan_amount: avg,
                    loan_count_000s: thousands(count),
                    loan_amount_bil: total.map(billions),
                }
            })
            .collect(),
    ))
}

pub async fn by_state(pool: &Pool, options: &VolumeOptions) -> Result<Vec<StateVolumeRow>> {
    let sql = format!(
        "SELECT h.activity_year, h.state, l.respondent_name, {columns} \
         FROM \"{loans}\" h \
         LEFT JOIN \"{lenders}\" l ON h.lei = l.lei \
         {filter} \
         GROUP BY h.activity_year, h.state, l.respondent_name \
         ORDER BY h.activity_year, h.state, loan_count DESC",
        columns = VOLUME_COLUMNS,
        loans = LOAN_TABLE,
        lenders = LENDER_TABLE,
        filter = where_clause(options),
    );
    let mut query = sqlx::query_as::<Sqlite, StateTuple>(&sql);
    if let Some(loan_type) = options.loan_types.loan_type() {
        query = query.bind(loan_type.code());
    }
    let rows = query
        .fetch_all(pool.inner())
        .await
        .context("Volume by state query failed")?;

    Ok(rows
        .into_iter()
        .map(|(activity_year, state, respondent_name, count, total, avg)| StateVolumeRow {
            activity_year,
            state,
            respondent_name,
            loan_count: count,
            total_loan_amount: total.map(Amount),
            avg_loan_amount: avg,
            loan_count_000s: thousands(count),
            loan_amount_bil: total.map(billions),
        })
        .collect())
}

/// Lender × loan type pivots of counts and amounts, summed over years
pub fn pivots(rows: &[LoanTypeVolumeRow]) -> (Pivot<i64>, Pivot<Amount>) {
    let mut counts = Pivot::new();
    let mut amounts = Pivot::new();
    for row in rows {
        let lender = row.respondent_name.as_deref();
        counts.add(lender, &row.loan_type_name, row.loan_count);
        amounts.add(
            lender,
            &row.loan_type_name,
            row.total_loan_amount.unwrap_or_default(),
        );
    }
    (counts, amounts)
}

/// Run the volume queries and export them to `output_dir`
pub async fn run(pool: &Pool, output_dir: &Path, options: &VolumeOptions) -> Result<Vec<PathBuf>> {
    let suffix = options.loan_types.file_suffix();
    let mut written = Vec::new();

    let lender_volume = by_lender(pool, options).await?;
    let state_rows = by_state(pool, options).await?;
    info!(
        lender_rows = lender_volume.len(),
        state_rows = state_rows.len(),
        "Computed loan volume"
    );

    let lender_file = format!("loans_by_year_lender{}.csv", suffix);
    match &lender_volume {
        LenderVolume::Total(rows) => {
            written.push(export::write_rows(output_dir, &lender_file, rows).await?);
        }
        LenderVolume::ByLoanType(rows) => {
            written.push(export::write_rows(output_dir, &lender_file, rows).await?);
        }
    }

    written.push(export::write_rows(
        output_dir,
        &format!("loans_by_year_state_lender{}.csv", suffix),
        &state_rows,
    )
    .await?);

    if let LenderVolume::ByLoanType(rows) = &lender_volume {
        let (counts, amounts) = pivots(rows);
        written.push(export::write_pivot(
            output_dir,
            &format!("loan_counts_pivot_by_lender{}.csv", suffix),
            "respondent_name",
            &counts,
        )
        .await?);
        written.push(export::write_pivot(
            output_dir,
            &format!("loan_amounts_pivot_by_lender{}.csv", suffix),
            "respondent_name",
            &amounts,
        )
        .await?);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::LoanTypeSelection;

    fn split_row(lender: Option<&str>, loan_type: i64, count: i64, amount: f64) -> LoanTypeVolumeRow {
        LoanTypeVolumeRow {
            activity_year: Some(2024),
            loan_type: Some(loan_type),
            loan_type_name: LoanType::name_for_code(loan_type).to_string(),
            respondent_name: lender.map(str::to_string),
            loan_count: count,
            total_loan_amount: Some(Amount(amount)),
            avg_loan_amount: Some(amount / count as f64),
            loan_count_000s: thousands(count),
            loan_amount_bil: Some(billions(amount)),
        }
    }

    #[test]
    fn test_where_clause_variants() {
        let default = where_clause(&VolumeOptions::default());
        assert!(default.contains("h.action_taken IN (1, 6)"));
        assert!(!default.contains('?'));

        let all_fha = where_clause(&VolumeOptions {
            closed: ClosedFilter::AllStatuses,
            loan_types: LoanTypeSelection::Only(LoanType::Fha),
        });
        assert!(!all_fha.contains("action_taken"));
        assert!(all_fha.ends_with("AND h.loan_type = ?"));
    }

    #[test]
    fn test_pivots_sum_across_years_and_drop_unnamed() {
        let rows = vec![
            split_row(Some("First Bank"), 1, 10, 3_000_000.0),
            split_row(Some("First Bank"), 1, 5, 1_000_000.0),
            split_row(Some("First Bank"), 2, 2, 400_000.0),
            split_row(None, 3, 7, 900_000.0),
        ];

        let (counts, amounts) = pivots(&rows);
        assert_eq!(counts.columns().collect::<Vec<_>>(), vec!["Conventional", "FHA"]);
        assert_eq!(
            counts.rows().collect::<Vec<_>>(),
            vec![("First Bank", vec![15, 2])]
        );
        assert_eq!(
            amounts.rows().collect::<Vec<_>>(),
            vec![("First Bank", vec![Amount(4_000_000.0), Amount(400_000.0)])]
        );
    }
}
