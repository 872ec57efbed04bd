use crate::core::{AccountDirectory, AllocationSummary, RecipientAllocation};
use crate::utils::error::{CommissionError, Result};
use crate::utils::validation::MAX_AMOUNT;
use rust_decimal::Decimal;

/// Slack allowed between the distributed total and the payable (0.01).
pub const DEFAULT_ALLOCATION_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

pub fn total_distributed(allocations: &[RecipientAllocation]) -> Result<Decimal> {
    allocations
        .iter()
        .try_fold(Decimal::ZERO, |total, a| total.checked_add(a.amount))
        .ok_or_else(|| out_of_range("distributed", format!("sum of {} rows", allocations.len())))
}

/// Accepts when `sum(amount) <= payable + tolerance`. Never rescales.
pub fn validate_allocations(
    allocations: &[RecipientAllocation],
    payable: Decimal,
    tolerance: Decimal,
) -> Result<()> {
    let summary = summarize_allocations(allocations, payable, tolerance)?;
    if !summary.within_tolerance {
        return Err(CommissionError::AllocationOverrunError {
            distributed: summary.distributed,
            payable,
        });
    }
    Ok(())
}

pub fn summarize_allocations(
    allocations: &[RecipientAllocation],
    payable: Decimal,
    tolerance: Decimal,
) -> Result<AllocationSummary> {
    let distributed = total_distributed(allocations)?;
    let ceiling = payable
        .checked_add(tolerance)
        .ok_or_else(|| out_of_range("payable", payable))?;
    let remaining = payable
        .checked_sub(distributed)
        .ok_or_else(|| out_of_range("remaining", payable))?;
    Ok(AllocationSummary {
        payable,
        distributed,
        remaining,
        within_tolerance: distributed <= ceiling,
    })
}

fn out_of_range(field: &str, value: impl std::fmt::Display) -> CommissionError {
    CommissionError::InvalidInputError {
        field: field.to_string(),
        value: value.to_string(),
        reason: "Result is outside the supported decimal range".to_string(),
    }
}

/// 逐列檢查：代理人與付款帳戶必填，金額不可為負
pub fn validate_allocation_rows(allocations: &[RecipientAllocation]) -> Result<()> {
    for (index, allocation) in allocations.iter().enumerate() {
        let row = index + 1;
        if allocation.sales_agent_id.trim().is_empty() {
            return Err(CommissionError::InvalidAllocationError {
                row,
                reason: "sales agent is required".to_string(),
            });
        }
        if allocation.paying_account_id.trim().is_empty() {
            return Err(CommissionError::InvalidAllocationError {
                row,
                reason: "paying account is required".to_string(),
            });
        }
        if allocation.amount < Decimal::ZERO {
            return Err(CommissionError::InvalidAllocationError {
                row,
                reason: format!("amount {} is negative", allocation.amount),
            });
        }
        if allocation.amount > MAX_AMOUNT {
            return Err(CommissionError::InvalidAllocationError {
                row,
                reason: format!("amount {} exceeds {}", allocation.amount, MAX_AMOUNT),
            });
        }
    }
    Ok(())
}

pub fn check_paying_accounts<D: AccountDirectory + ?Sized>(
    allocations: &[RecipientAllocation],
    directory: &D,
) -> Result<()> {
    for allocation in allocations {
        match directory.find_account(&allocation.paying_account_id) {
            Some(account) if account.is_active => {}
            Some(_) => {
                return Err(CommissionError::InactiveAccountError {
                    account_id: allocation.paying_account_id.clone(),
                    reason: "inactive".to_string(),
                })
            }
            None => {
                return Err(CommissionError::InactiveAccountError {
                    account_id: allocation.paying_account_id.clone(),
                    reason: "not in the chart of accounts".to_string(),
                })
            }
        }
    }
    Ok(())
}
