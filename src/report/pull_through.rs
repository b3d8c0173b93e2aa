//! Pull-through rate: share of home-purchase applications that closed

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{export, round_to, thousands};
use crate::config::{LENDER_TABLE, LOAN_TABLE};
use crate::db::Pool;
use crate::model::{ActionTaken, LoanType};

pub const BY_LENDER_FILE: &str = "pull_through_by_lender.csv";
pub const TOTALS_FILE: &str = "pull_through_totals_by_lender.csv";

/// Pull-through for one lender, year and loan type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullThroughRow {
    pub activity_year: Option<i64>,
    pub respondent_name: Option<String>,
    pub loan_type: Option<i64>,
    pub loan_type_name: String,
    pub total_applications: i64,
    pub closed_loans: i64,
    pub pull_through_rate: Option<f64>,
    pub pull_through_pct: Option<f64>,
    pub apps_000s: f64,
    pub closed_000s: f64,
}

/// Pull-through for one lender and year across all loan types
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullThroughTotalRow {
    pub activity_year: Option<i64>,
    pub respondent_name: Option<String>,
    pub total_applications: i64,
    pub closed_loans: i64,
    pub pull_through_rate: Option<f64>,
    pub pull_through_pct: Option<f64>,
    pub apps_000s: f64,
    pub closed_000s: f64,
}

/// closed / total rounded to 4 places, and the same as a percentage to 2
pub fn pull_through(closed: i64, total: i64) -> (Option<f64>, Option<f64>) {
    if total == 0 {
        return (None, None);
    }
    let rate = round_to(closed as f64 / total as f64, 4);
    (Some(rate), Some(round_to(rate * 100.0, 2)))
}

/// Home purchase, non-business, forward, closed-end applications with a known outcome
fn purchase_application_filter() -> String {
    format!(
        "h.loan_purpose = 1 \
         AND h.business_or_commercial_purpose = 2 \
         AND h.reverse_mortgage = 2 \
         AND h.open_end_line_of_credit = 2 \
         AND h.action_taken IN {}",
        ActionTaken::sql_list(&ActionTaken::CODES)
    )
}

fn closed_count_expr() -> String {
    format!(
        "SUM(CASE WHEN h.action_taken IN {} THEN 1 ELSE 0 END)",
        ActionTaken::sql_list(&ActionTaken::CLOSED_CODES)
    )
}

pub async fn by_lender(pool: &Pool) -> Result<Vec<PullThroughRow>> {
    let sql = format!(
        "SELECT h.activity_year, l.respondent_name, h.loan_type, \
                COUNT(*) AS total_applications, {closed} AS closed_loans \
         FROM \"{loans}\" h \
         LEFT JOIN \"{lenders}\" l ON h.lei = l.lei \
         WHERE {filter} \
         GROUP BY h.activity_year, h.loan_type, l.respondent_name \
         ORDER BY h.activity_year, l.respondent_name, h.loan_type",
        closed = closed_count_expr(),
        loans = LOAN_TABLE,
        lenders = LENDER_TABLE,
        filter = purchase_application_filter(),
    );

    let rows: Vec<(Option<i64>, Option<String>, Option<i64>, i64, i64)> = sqlx::query_as(&sql)
        .fetch_all(pool.inner())
        .await
        .context("Pull-through by lender query failed")?;

    Ok(rows
        .into_iter()
        .map(|(activity_year, respondent_name, loan_type, total, closed)| {
            let (pull_through_rate, pull_through_pct) = pull_through(closed, total);
            PullThroughRow {
                activity_year,
                respondent_name,
                loan_type,
                loan_type_name: loan_type
                    .map_or("Unknown", LoanType::name_for_code)
                    .to_string(),
                total_applications: total,
                closed_loans: closed,
                pull_through_rate,
                pull_through_pct,
                apps_000s: thousands(total),
                closed_000s: thousands(closed),
            }
        })
        .collect())
}

pub async fn totals_by_lender(pool: &Pool) -> Result<Vec<PullThroughTotalRow>> {
    let sql = format!(
        "SELECT h.activity_year, l.respondent_name, \
                COUNT(*) AS total_applications, {closed} AS closed_loans \
         FROM \"{loans}\" h \
         LEFT JOIN \"{lenders}\" l ON h.lei = l.lei \
         WHERE {filter} \
         GROUP BY h.activity_year, l.respondent_name \
         ORDER BY h.activity_year, l.respondent_name",
        closed = closed_count_expr(),
        loans = LOAN_TABLE,
        lenders = LENDER_TABLE,
        filter = purchase_application_filter(),
    );

    let rows: Vec<(Option<i64>, Option<String>, i64, i64)> = sqlx::query_as(&sql)
        .fetch_all(pool.inner())
        .await
        .context("Pull-through totals query failed")?;

    Ok(rows
        .into_iter()
        .map(|(activity_year, respondent_name, total, closed)| {
            let (pull_through_rate, pull_through_pct) = pull_through(closed, total);
            PullThroughTotalRow {
                activity_year,
                respondent_name,
                total_applications: total,
                closed_loans: closed,
                pull_through_rate,
                pull_through_pct,
                apps_000s: thousands(total),
                closed_000s: thousands(closed),
            }
        })
        .collect())
}

/// Run both pull-through queries and export them to `output_dir`
pub async fn run(pool: &Pool, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let rows = by_lender(pool).await?;
    let totals = totals_by_lender(pool).await?;
    info!(
        lender_rows = rows.len(),
        total_rows = totals.len(),
        "Computed pull-through rates"
    );

    Ok(vec![
        export::write_rows(output_dir, BY_LENDER_FILE, &rows).await?,
        export::write_rows(output_dir, TOTALS_FILE, &totals).await?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_through_rate() {
        assert_eq!(pull_through(50, 100), (Some(0.5), Some(50.0)));
        assert_eq!(pull_through(1, 3), (Some(0.3333), Some(33.33)));
        assert_eq!(pull_through(2, 3), (Some(0.6667), Some(66.67)));
        assert_eq!(pull_through(0, 0), (None, None));
    }

    #[test]
    fn test_filter_lists_codes() {
        let filter = purchase_application_filter();
        assert!(filter.contains("IN (1, 2, 3, 4, 5, 6, 7, 8)"));
        assert!(closed_count_expr().contains("IN (1, 6)"));
    }
}
