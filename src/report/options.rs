use anyhow::{Result, anyhow};

use crate::model::LoanType;

/// Which application outcomes the volume report counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClosedFilter {
    /// Only originated or purchased loans
    #[default]
    ClosedOnly,
    AllStatuses,
}

impl ClosedFilter {
    pub fn from_closed_only(closed_only: bool) -> Self {
        if closed_only {
            ClosedFilter::ClosedOnly
        } else {
            ClosedFilter::AllStatuses
        }
    }
}

/// How the volume report treats loan types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoanTypeSelection {
    /// One figure per lender, summed across loan types
    Total,
    /// Split by loan type
    #[default]
    All,
    /// Split, restricted to one loan type
    Only(LoanType),
}

impl LoanTypeSelection {
    /// Parse `total`, `all` or a loan type code `1`-`4` (case-insensitive)
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "" | "all" => Ok(LoanTypeSelection::All),
            "total" => Ok(LoanTypeSelection::Total),
            other => other
                .parse::<i64>()
                .ok()
                .and_then(LoanType::from_code)
                .map(LoanTypeSelection::Only)
                .ok_or_else(|| {
                    anyhow!(
                        "Invalid loan type selection '{}'. Expected total, all, 1, 2, 3 or 4",
                        trimmed
                    )
                }),
        }
    }

    /// Suffix appended to output file names
    pub fn file_suffix(&self) -> String {
        match self {
            LoanTypeSelection::Total => "_total".to_string(),
            LoanTypeSelection::All => String::new(),
            LoanTypeSelection::Only(loan_type) => format!("_loan_type_{}", loan_type.code()),
        }
    }

    /// Whether output rows carry a loan type
    pub fn splits_loan_types(&self) -> bool {
        !matches!(self, LoanTypeSelection::Total)
    }

    pub fn loan_type(&self) -> Option<LoanType> {
        match self {
            LoanTypeSelection::Only(loan_type) => Some(*loan_type),
            _ => None,
        }
    }
}

/// Options for the volume report
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeOptions {
    pub closed: ClosedFilter,
    pub loan_types: LoanTypeSelection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection() {
        assert_eq!(LoanTypeSelection::parse("").unwrap(), LoanTypeSelection::All);
        assert_eq!(LoanTypeSelection::parse("ALL").unwrap(), LoanTypeSelection::All);
        assert_eq!(
            LoanTypeSelection::parse(" Total ").unwrap(),
            LoanTypeSelection::Total
        );
        assert_eq!(
            LoanTypeSelection::parse("2").unwrap(),
            LoanTypeSelection::Only(LoanType::Fha)
        );
        assert!(LoanTypeSelection::parse("5").is_err());
        assert!(LoanTypeSelection::parse("jumbo").is_err());
    }

    #[test]
    fn test_file_suffix() {
        assert_eq!(LoanTypeSelection::All.file_suffix(), "");
        assert_eq!(LoanTypeSelection::Total.file_suffix(), "_total");
        assert_eq!(
            LoanTypeSelection::Only(LoanType::Va).file_suffix(),
            "_loan_type_3"
        );
    }

    #[test]
    fn test_defaults() {
        let options = VolumeOptions::default();
        assert_eq!(options.closed, ClosedFilter::ClosedOnly);
        assert_eq!(options.loan_types, LoanTypeSelection::All);
        assert!(options.loan_types.splits_loan_types());
        assert!(!LoanTypeSelection::Total.splits_loan_types());
    }
}
