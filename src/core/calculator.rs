use crate::core::{CommissionInput, CommissionResult, NegativeBasePolicy};
use crate::utils::error::{CommissionError, Result};
use crate::utils::validation::{validate_amount, validate_rate, Validate};
use rust_decimal::Decimal;
use std::str::FromStr;

/// base = received + additions - deductions, gross = base * rate,
/// wht = gross * wht rate, payable = gross - wht.
///
/// Exact decimal arithmetic, no rounding. A negative base is carried through
/// unless the policy is [`NegativeBasePolicy::Clamp`]. Fails with
/// `InvalidInputError` when a step leaves the range `Decimal` can hold.
pub fn calculate_commission(
    input: &CommissionInput,
    policy: NegativeBasePolicy,
) -> Result<CommissionResult> {
    let mut base_for_commission = input
        .amount_received
        .checked_add(input.additions)
        .and_then(|sum| sum.checked_sub(input.deductions))
        .ok_or_else(|| out_of_range("base_for_commission", input.amount_received))?;
    if policy == NegativeBasePolicy::Clamp && base_for_commission < Decimal::ZERO {
        base_for_commission = Decimal::ZERO;
    }

    let gross_commission = base_for_commission
        .checked_mul(input.commission_rate)
        .ok_or_else(|| out_of_range("gross_commission", base_for_commission))?;
    let withholding_tax_amount = gross_commission
        .checked_mul(input.withholding_tax_rate)
        .ok_or_else(|| out_of_range("withholding_tax_amount", gross_commission))?;
    let total_commission_payable = gross_commission
        .checked_sub(withholding_tax_amount)
        .ok_or_else(|| out_of_range("total_commission_payable", gross_commission))?;

    Ok(CommissionResult {
        base_for_commission,
        gross_commission,
        withholding_tax_amount,
        total_commission_payable,
    })
}

fn out_of_range(field: &str, value: Decimal) -> CommissionError {
    CommissionError::InvalidInputError {
        field: field.to_string(),
        value: value.to_string(),
        reason: "Result is outside the supported decimal range".to_string(),
    }
}

/// 10 (%) -> 0.10
pub fn rate_from_percent(percent: Decimal) -> Decimal {
    percent / Decimal::ONE_HUNDRED
}

/// 將表單輸入轉為金額，空白或非數字視為 0
pub fn coerce_amount(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }

    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .unwrap_or_else(|_| {
            tracing::debug!("Non-numeric amount '{}' coerced to 0", trimmed);
            Decimal::ZERO
        })
}

impl CommissionInput {
    /// Builds an input from form values where both rates are percentages.
    pub fn from_percentages(
        amount_received: Decimal,
        additions: Decimal,
        deductions: Decimal,
        commission_rate_percent: Decimal,
        withholding_tax_rate_percent: Decimal,
    ) -> Self {
        Self {
            amount_received,
            additions,
            deductions,
            commission_rate: rate_from_percent(commission_rate_percent),
            withholding_tax_rate: rate_from_percent(withholding_tax_rate_percent),
        }
    }

    /// Same as [`CommissionInput::from_percentages`] but from raw text fields.
    pub fn from_raw_fields(
        amount_received: &str,
        additions: &str,
        deductions: &str,
        commission_rate_percent: &str,
        withholding_tax_rate_percent: &str,
    ) -> Self {
        Self::from_percentages(
            coerce_amount(amount_received),
            coerce_amount(additions),
            coerce_amount(deductions),
            coerce_amount(commission_rate_percent),
            coerce_amount(withholding_tax_rate_percent),
        )
    }
}

impl Validate for CommissionInput {
    fn validate(&self) -> Result<()> {
        validate_amount("amount_received", self.amount_received)?;
        validate_amount("additions", self.additions)?;
        validate_amount("deductions", self.deductions)?;
        validate_rate("commission_rate", self.commission_rate)?;
        validate_rate("withholding_tax_rate", self.withholding_tax_rate)?;
        Ok(())
    }
}
