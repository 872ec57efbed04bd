use rust_decimal::Decimal;
use thiserror::Error;

pub const ALLOCATION_OVERRUN_MESSAGE: &str = "Total distributed exceeds commission payable";

#[derive(Error, Debug)]
pub enum CommissionError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration validation error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid input '{field}' = {value}: {reason}")]
    InvalidInputError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Total distributed exceeds commission payable (distributed {distributed}, payable {payable})")]
    AllocationOverrunError {
        distributed: Decimal,
        payable: Decimal,
    },

    #[error("Invalid allocation at row {row}: {reason}")]
    InvalidAllocationError { row: usize, reason: String },

    #[error("Paying account '{account_id}' is {reason}")]
    InactiveAccountError { account_id: String, reason: String },

    #[error("Invalid chart of accounts: {message}")]
    AccountTreeError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Parsing,
    Configuration,
    Validation,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl CommissionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CommissionError::IoError(_) => ErrorCategory::Io,
            CommissionError::CsvError(_) | CommissionError::SerializationError(_) => {
                ErrorCategory::Parsing
            }
            CommissionError::ConfigValidationError { .. }
            | CommissionError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            CommissionError::InvalidInputError { .. }
            | CommissionError::AllocationOverrunError { .. }
            | CommissionError::InvalidAllocationError { .. }
            | CommissionError::InactiveAccountError { .. }
            | CommissionError::AccountTreeError { .. } => ErrorCategory::Validation,
            CommissionError::ProcessingError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::Medium,
            ErrorCategory::Parsing | ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    /// 給終端使用者看的訊息，不含內部細節
    pub fn user_friendly_message(&self) -> String {
        match self {
            CommissionError::AllocationOverrunError { .. } => {
                ALLOCATION_OVERRUN_MESSAGE.to_string()
            }
            CommissionError::InactiveAccountError { account_id, .. } => {
                format!("Paying account '{}' cannot be used", account_id)
            }
            CommissionError::IoError(e) => format!("Could not access a file: {}", e),
            CommissionError::CsvError(e) => format!("Could not read CSV data: {}", e),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            CommissionError::IoError(_) => "Check that the file paths exist and are readable",
            CommissionError::CsvError(_) => "Check the CSV headers and column values",
            CommissionError::SerializationError(_) => "Report this output failure",
            CommissionError::ConfigValidationError { .. } => {
                "Check the TOML syntax of the configuration file"
            }
            CommissionError::InvalidConfigValueError { .. } => {
                "Correct the configuration value and run again"
            }
            CommissionError::InvalidInputError { .. } => {
                "Amounts must be between 0 and 1000000000000000, rates between 0% and 100%"
            }
            CommissionError::AllocationOverrunError { .. } => {
                "Reduce recipient amounts so they do not exceed the commission payable"
            }
            CommissionError::InvalidAllocationError { .. } => {
                "Every recipient needs an agent, a paying account and an amount between 0 and 1000000000000000"
            }
            CommissionError::InactiveAccountError { .. } => {
                "Choose an active paying account"
            }
            CommissionError::AccountTreeError { .. } => {
                "Fix the parent_id links in the accounts file"
            }
            CommissionError::ProcessingError { .. } => "Run again with --verbose for details",
        }
    }

    /// 依嚴重程度決定 CLI 退出碼
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Validation | ErrorCategory::Processing | ErrorCategory::Parsing => 1,
            ErrorCategory::Configuration => 2,
            ErrorCategory::Io => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, CommissionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrun_message_is_user_facing() {
        let err = CommissionError::AllocationOverrunError {
            distributed: Decimal::new(98, 0),
            payable: Decimal::new(9785, 2),
        };
        assert_eq!(err.user_friendly_message(), ALLOCATION_OVERRUN_MESSAGE);
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_io_errors_are_critical() {
        let err = CommissionError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_input_suggestion_names_the_amount_limit() {
        let err = CommissionError::InvalidInputError {
            field: "amount_received".to_string(),
            value: "1e30".to_string(),
            reason: "Amount cannot exceed 1000000000000000".to_string(),
        };
        assert!(err
            .recovery_suggestion()
            .contains(&crate::utils::validation::MAX_AMOUNT.to_string()));
        assert_eq!(err.exit_code(), 1);
    }
}
