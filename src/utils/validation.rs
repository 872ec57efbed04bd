use crate::utils::error::{CommissionError, Result};
use rust_decimal::Decimal;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// 單筆金額上限 1,000,000,000,000,000
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

pub fn validate_amount(field_name: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(CommissionError::InvalidInputError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Amount cannot be negative".to_string(),
        });
    }
    if value > MAX_AMOUNT {
        return Err(CommissionError::InvalidInputError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Amount cannot exceed {}", MAX_AMOUNT),
        });
    }
    Ok(())
}

/// 比率必須為 0..=1 的小數 (10% 以 0.10 表示)
pub fn validate_rate(field_name: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(CommissionError::InvalidInputError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Rate must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CommissionError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    validate_non_empty_string(field_name, path)?;

    if path.contains('\0') {
        return Err(CommissionError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(CommissionError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount("amount_received", dec!(0)).is_ok());
        assert!(validate_amount("amount_received", dec!(12.50)).is_ok());
        assert!(validate_amount("amount_received", dec!(-0.01)).is_err());
        assert!(validate_amount("amount_received", MAX_AMOUNT).is_ok());
        assert!(validate_amount("amount_received", MAX_AMOUNT + dec!(0.01)).is_err());
    }

    #[test]
    fn test_max_amount_value() {
        assert_eq!(MAX_AMOUNT, dec!(1000000000000000));
    }

    #[test]
    fn test_validate_rate() {
        assert!(validate_rate("commission_rate", dec!(0)).is_ok());
        assert!(validate_rate("commission_rate", dec!(0.10)).is_ok());
        assert!(validate_rate("commission_rate", dec!(1)).is_ok());
        assert!(validate_rate("commission_rate", dec!(1.0001)).is_err());
        assert!(validate_rate("commission_rate", dec!(-0.1)).is_err());
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("output", "./reports").is_ok());
        assert!(validate_path("output", "  ").is_err());
        assert!(validate_path("output", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("report.decimal_places", 2u32, 0, 10).is_ok());
        assert!(validate_range("report.decimal_places", 11u32, 0, 10).is_err());
    }
}
