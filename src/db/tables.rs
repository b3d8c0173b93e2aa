//! Table schema definitions for the loan-level file and the lender panel
//!
//! Column order is the positional order of the published files. The loan file
//! carries no header, so this order is the only thing binding a field to a column.

use super::schema::{Binding, Column, ColumnType, TableSchema};
use crate::config::{LENDER_TABLE, LOAN_TABLE};

// =============================================================================
// Loan-level records (modified LAR)
// =============================================================================

pub static LOAN_RECORD: TableSchema = TableSchema {
    name: LOAN_TABLE,
    binding: Binding::Positional,
    columns: &[
        // Identifiers, loan terms and geography
        Column::new("activity_year", ColumnType::Integer),
        Column::new("lei", ColumnType::Text),
        Column::new("loan_type", ColumnType::Integer),
        Column::new("loan_purpose", ColumnType::Integer),
        Column::new("preapproval", ColumnType::Integer),
        Column::new("construction_method", ColumnType::Integer),
        Column::new("occupancy_type", ColumnType::Integer),
        Column::new("loan_amount", ColumnType::Numeric),
        Column::new("action_taken", ColumnType::Integer),
        Column::new("state", ColumnType::Text),
        Column::new("county", ColumnType::Text),
        Column::new("census_tract", ColumnType::Text),

        // Applicant and co-applicant ethnicity
        Column::new("ethnicity_applicant_1", ColumnType::Text),
        Column::new("ethnicity_applicant_2", ColumnType::Text),
        Column::new("ethnicity_applicant_3", ColumnType::Text),
        Column::new("ethnicity_applicant_4", ColumnType::Text),
        Column::new("ethnicity_applicant_5", ColumnType::Text),
        Column::new("ethnicity_coapplicant_1", ColumnType::Text),
        Column::new("ethnicity_coapplicant_2", ColumnType::Text),
        Column::new("ethnicity_coapplicant_3", ColumnType::Text),
        Column::new("ethnicity_coapplicant_4", ColumnType::Text),
        Column::new("ethnicity_coapplicant_5", ColumnType::Text),
        Column::new("ethnicity_applicant_collected", ColumnType::Integer),
        Column::new("ethnicity_coapplicant_collected", ColumnType::Integer),

        // Applicant and co-applicant race
        Column::new("race_applicant_1", ColumnType::Text),
        Column::new("race_applicant_2", ColumnType::Text),
        Column::new("race_applicant_3", ColumnType::Text),
        Column::new("race_applicant_4", ColumnType::Text),
        Column::new("race_applicant_5", ColumnType::Text),
        Column::new("race_coapplicant_1", ColumnType::Text),
        Column::new("race_coapplicant_2", ColumnType::Text),
        Column::new("race_coapplicant_3", ColumnType::Text),
        Column::new("race_coapplicant_4", ColumnType::Text),
        Column::new("race_coapplicant_5", ColumnType::Text),
        Column::new("race_applicant_collected", ColumnType::Integer),
        Column::new("race_coapplicant_collected", ColumnType::Integer),

        // Sex and age
        Column::new("sex_applicant", ColumnType::Integer),
        Column::new("sex_coapplicant", ColumnType::Integer),
        Column::new("sex_applicant_collected", ColumnType::Integer),
        Column::new("sex_coapplicant_collected", ColumnType::Integer),
        Column::new("age_applicant", ColumnType::Text),
        Column::new("age_applicant_ge62", ColumnType::Text),
        Column::new("age_coapplicant", ColumnType::Text),
        Column::new("age_coapplicant_ge62", ColumnType::Text),

        // Income, pricing and underwriting outcome
        Column::new("income", ColumnType::NumericOrExempt),
        Column::new("type_of_purchaser", ColumnType::Integer),
        Column::new("rate_spread", ColumnType::NumericOrExempt),
        Column::new("hoepa_status", ColumnType::Integer),
        Column::new("lien_status", ColumnType::Integer),
        Column::new("applicant_credit_model", ColumnType::Integer),
        Column::new("coapplicant_credit_model", ColumnType::Integer),
        Column::new("reason_for_denial_1", ColumnType::Integer),
        Column::new("reason_for_denial_2", ColumnType::Integer),
        Column::new("reason_for_denial_3", ColumnType::Integer),
        Column::new("reason_for_denial_4", ColumnType::Integer),

        // Loan costs and terms
        Column::new("total_loan_costs", ColumnType::NumericOrExempt),
        Column::new("total_points_and_fees", ColumnType::NumericOrExempt),
        Column::new("origination_charges", ColumnType::NumericOrExempt),
        Column::new("discount_points", ColumnType::NumericOrExempt),
        Column::new("lender_credits", ColumnType::NumericOrExempt),
        Column::new("interest_rate", ColumnType::NumericOrExempt),
        Column::new("prepayment_penalty_term", ColumnType::NumericOrExempt),
        Column::new("debt_to_income_ratio", ColumnType::Text),
        Column::new("combined_loan_to_value_ratio", ColumnType::NumericOrExempt),
        Column::new("loan_term", ColumnType::NumericOrExempt),
        Column::new("introductory_rate_period", ColumnType::NumericOrExempt),
        Column::new("balloon_payment", ColumnType::Integer),
        Column::new("interest_only_payments", ColumnType::Integer),
        Column::new("negative_amortization", ColumnType::Integer),
        Column::new("other_non_amortizing_features", ColumnType::Integer),

        // Property and application channel
        Column::new("property_value", ColumnType::NumericOrExempt),
        Column::new("manufactured_home_secured_property_type", ColumnType::Integer),
        Column::new("manufactured_home_land_property_interest", ColumnType::Integer),
        Column::new("total_units", ColumnType::Text),
        Column::new("multifamily_affordable_units", ColumnType::NumericOrExempt),
        Column::new("submission_of_application", ColumnType::Integer),
        Column::new("initially_payable_to_institution", ColumnType::Integer),

        // Automated underwriting systems and loan features
        Column::new("aus_1", ColumnType::Integer),
        Column::new("aus_2", ColumnType::Integer),
        Column::new("aus_3", ColumnType::Integer),
        Column::new("aus_4", ColumnType::Integer),
        Column::new("aus_5", ColumnType::Integer),
        Column::new("reverse_mortgage", ColumnType::Integer),
        Column::new("open_end_line_of_credit", ColumnType::Integer),
        Column::new("business_or_commercial_purpose", ColumnType::Integer),
    ],
};

// =============================================================================
// Lender panel (transmittal sheet)
// =============================================================================

pub static LENDER_RECORD: TableSchema = TableSchema {
    name: LENDER_TABLE,
    binding: Binding::Header,
    columns: &[
        Column::new("activity_year", ColumnType::Integer),
        Column::new("calendar_quarter", ColumnType::Integer),
        Column::primary_key("lei", ColumnType::Text),
        Column::new("tax_id", ColumnType::Text),
        Column::new("agency_code", ColumnType::Integer),
        Column::new("respondent_name", ColumnType::Text),
        Column::new("respondent_state", ColumnType::Text),
        Column::new("respondent_city", ColumnType::Text),
        Column::new("respondent_zip_code", ColumnType::Text),
        Column::new("lar_count", ColumnType::Integer),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_loan_schema_shape() {
        assert_eq!(LOAN_RECORD.width(), 85);
        assert_eq!(LOAN_RECORD.columns[0].name, "activity_year");
        assert_eq!(LOAN_RECORD.columns[1].name, "lei");
        assert_eq!(LOAN_RECORD.columns[8].name, "action_taken");
        assert_eq!(
            LOAN_RECORD.columns[LOAN_RECORD.width() - 1].name,
            "business_or_commercial_purpose"
        );
        assert!(LOAN_RECORD.columns.iter().all(|c| !c.primary_key));
    }

    #[test]
    fn test_lender_schema_shape() {
        assert_eq!(LENDER_RECORD.width(), 10);
        let keys: Vec<_> = LENDER_RECORD
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name)
            .collect();
        assert_eq!(keys, vec!["lei"]);
    }

    #[test]
    fn test_column_names_unique() {
        for schema in [&LOAN_RECORD, &LENDER_RECORD] {
            let names: HashSet<_> = schema.column_names().into_iter().collect();
            assert_eq!(names.len(), schema.width(), "duplicate column in {}", schema.name);
        }
    }

    #[test]
    fn test_exemptible_fields_stay_text() {
        for name in ["income", "rate_spread", "property_value", "interest_rate"] {
            let column = LOAN_RECORD
                .columns
                .iter()
                .find(|c| c.name == name)
                .unwrap();
            assert_eq!(column.col_type, ColumnType::NumericOrExempt);
            assert_eq!(column.col_type.to_sql(), "TEXT");
        }
    }
}
