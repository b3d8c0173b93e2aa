//! Regulatory code domains and the numeric-or-exempt value type

use std::fmt;

/// Value of a field that holds either a number or an exemption sentinel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measure {
    Numeric(f64),
    /// Reporter claimed a partial exemption for this field
    Exempt,
    /// Field does not apply to this record (`NA` or blank)
    NotApplicable,
}

impl Measure {
    /// Parse a raw field, rejecting anything that is neither a number nor a sentinel
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();

        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("NA") {
            return Ok(Measure::NotApplicable);
        }
        if trimmed.eq_ignore_ascii_case("Exempt") {
            return Ok(Measure::Exempt);
        }

        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Measure::Numeric(value)),
            _ => Err(format!(
                "expected a number, 'Exempt' or 'NA', got '{}'",
                raw
            )),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Measure::Numeric(value) => Some(*value),
            Measure::Exempt | Measure::NotApplicable => None,
        }
    }
}

/// Loan type code (field `loan_type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LoanType {
    Conventional,
    Fha,
    Va,
    Usda,
}

impl LoanType {
    pub const ALL: [LoanType; 4] = [
        LoanType::Conventional,
        LoanType::Fha,
        LoanType::Va,
        LoanType::Usda,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(LoanType::Conventional),
            2 => Some(LoanType::Fha),
            3 => Some(LoanType::Va),
            4 => Some(LoanType::Usda),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            LoanType::Conventional => 1,
            LoanType::Fha => 2,
            LoanType::Va => 3,
            LoanType::Usda => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LoanType::Conventional => "Conventional",
            LoanType::Fha => "FHA",
            LoanType::Va => "VA",
            LoanType::Usda => "USDA",
        }
    }

    /// Display name for a raw code, `Unknown` outside the domain
    pub fn name_for_code(code: i64) -> &'static str {
        Self::from_code(code).map_or("Unknown", |t| t.name())
    }
}

impl fmt::Display for LoanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of an application (field `action_taken`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionTaken {
    Originated,
    ApprovedNotAccepted,
    Denied,
    Withdrawn,
    FileClosedIncomplete,
    PurchasedLoan,
    PreapprovalDenied,
    PreapprovalApprovedNotAccepted,
}

impl ActionTaken {
    pub const CODES: [i64; 8] = [1, 2, 3, 4, 5, 6, 7, 8];
    pub const CLOSED_CODES: [i64; 2] = [1, 6];

    /// Render codes as an SQL `IN` list, e.g. `(1, 6)`
    pub fn sql_list(codes: &[i64]) -> String {
        let joined: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
        format!("({})", joined.join(", "))
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ActionTaken::Originated),
            2 => Some(ActionTaken::ApprovedNotAccepted),
            3 => Some(ActionTaken::Denied),
            4 => Some(ActionTaken::Withdrawn),
            5 => Some(ActionTaken::FileClosedIncomplete),
            6 => Some(ActionTaken::PurchasedLoan),
            7 => Some(ActionTaken::PreapprovalDenied),
            8 => Some(ActionTaken::PreapprovalApprovedNotAccepted),
            _ => None,
        }
    }

    /// Closed (funded) outcomes count toward pull-through
    pub fn is_closed(&self) -> bool {
        matches!(self, ActionTaken::Originated | ActionTaken::PurchasedLoan)
    }
}
