use crate::core::allocation::{
    check_paying_accounts, summarize_allocations, validate_allocation_rows, validate_allocations,
};
use crate::core::calculator::calculate_commission;
use crate::core::{
    AccountDirectory, AllocationSummary, CommissionInput, CommissionRecord, CommissionResult,
    PolicyProvider, RecipientAllocation, SettledCommission,
};
use crate::utils::error::{CommissionError, Result};
use crate::utils::validation::Validate;
use rust_decimal::Decimal;

/// Runs the submission-time checks for a commission record.
pub struct CommissionService<P: PolicyProvider, D: AccountDirectory> {
    policy: P,
    directory: Option<D>,
}

impl<P: PolicyProvider, D: AccountDirectory> CommissionService<P, D> {
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            directory: None,
        }
    }

    pub fn with_directory(policy: P, directory: D) -> Self {
        Self {
            policy,
            directory: Some(directory),
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn calculate(&self, input: &CommissionInput) -> Result<CommissionResult> {
        calculate_commission(input, self.policy.negative_base_policy())
    }

    /// Reactive recomputation while a form is being edited. Over-allocation is
    /// reported in the summary rather than as an error; only amounts outside
    /// the decimal range fail.
    pub fn preview(
        &self,
        input: &CommissionInput,
        recipients: &[RecipientAllocation],
    ) -> Result<(CommissionResult, AllocationSummary)> {
        let result = self.calculate(input)?;
        let summary = summarize_allocations(
            recipients,
            result.total_commission_payable,
            self.policy.allocation_tolerance(),
        )?;
        Ok((result, summary))
    }

    /// 預覽後的分配檢查：逐列檢查，再檢查總額是否超出應付佣金
    pub fn check_allocation(
        &self,
        recipients: &[RecipientAllocation],
        summary: &AllocationSummary,
    ) -> Result<()> {
        validate_allocation_rows(recipients)?;
        if !summary.within_tolerance {
            return Err(CommissionError::AllocationOverrunError {
                distributed: summary.distributed,
                payable: summary.payable,
            });
        }
        Ok(())
    }

    /// 提交時的權威檢查，任何一步失敗都不產生結果
    pub fn settle(&self, record: CommissionRecord) -> Result<SettledCommission> {
        let span = tracing::debug_span!("settle", commission_id = %record.commission_id);
        let _guard = span.enter();

        record.input.validate()?;

        let result = self.calculate(&record.input)?;
        tracing::debug!(
            "Base {} gross {} wht {} payable {}",
            result.base_for_commission,
            result.gross_commission,
            result.withholding_tax_amount,
            result.total_commission_payable
        );
        if result.total_commission_payable < Decimal::ZERO {
            tracing::warn!(
                "Commission {} has a negative payable of {}",
                record.commission_id,
                result.total_commission_payable
            );
        }

        validate_allocation_rows(&record.recipients)?;
        validate_allocations(
            &record.recipients,
            result.total_commission_payable,
            self.policy.allocation_tolerance(),
        )?;

        if self.policy.require_active_accounts() {
            match &self.directory {
                Some(directory) => check_paying_accounts(&record.recipients, directory)?,
                None => tracing::debug!("No chart of accounts loaded, skipping account check"),
            }
        }

        let summary = summarize_allocations(
            &record.recipients,
            result.total_commission_payable,
            self.policy.allocation_tolerance(),
        )?;

        tracing::info!(
            "Commission {} settled: payable {}, distributed {}",
            record.commission_id,
            result.total_commission_payable,
            summary.distributed
        );

        Ok(SettledCommission {
            record,
            result,
            distributed: summary.distributed,
            remaining: summary.remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Account, NegativeBasePolicy, DEFAULT_ALLOCATION_TOLERANCE};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    struct FixedPolicy {
        negative_base: NegativeBasePolicy,
        require_active: bool,
    }

    impl PolicyProvider for FixedPolicy {
        fn allocation_tolerance(&self) -> Decimal {
            DEFAULT_ALLOCATION_TOLERANCE
        }

        fn negative_base_policy(&self) -> NegativeBasePolicy {
            self.negative_base
        }

        fn require_active_accounts(&self) -> bool {
            self.require_active
        }
    }

    fn policy() -> FixedPolicy {
        FixedPolicy {
            negative_base: NegativeBasePolicy::Propagate,
            require_active: true,
        }
    }

    fn without_directory(
        policy: FixedPolicy,
    ) -> CommissionService<FixedPolicy, HashMap<String, Account>> {
        CommissionService::new(policy)
    }

    fn directory() -> HashMap<String, Account> {
        let mut accounts = HashMap::new();
        for (id, active) in [("cash", true), ("closed", false)] {
            accounts.insert(
                id.to_string(),
                Account {
                    id: id.to_string(),
                    parent_id: None,
                    code: id.to_string(),
                    name: id.to_string(),
                    is_active: active,
                },
            );
        }
        accounts
    }

    fn record(recipients: Vec<RecipientAllocation>) -> CommissionRecord {
        CommissionRecord {
            commission_id: "C-1".to_string(),
            sale_reference: "S-100".to_string(),
            date: None,
            input: CommissionInput::from_percentages(
                dec!(1000),
                dec!(50),
                dec!(20),
                dec!(10),
                dec!(5),
            ),
            recipients,
        }
    }

    #[test]
    fn test_settle_accepts_valid_record() {
        let service = CommissionService::with_directory(policy(), directory());
        let settled = service
            .settle(record(vec![
                RecipientAllocation::new("agent-a", dec!(60), "cash"),
                RecipientAllocation::new("agent-b", dec!(37.85), "cash"),
            ]))
            .unwrap();

        assert_eq!(settled.result.total_commission_payable, dec!(97.85));
        assert_eq!(settled.distributed, dec!(97.85));
        assert_eq!(settled.remaining, Decimal::ZERO);
    }

    #[test]
    fn test_settle_rejects_overrun() {
        let service = CommissionService::with_directory(policy(), directory());
        let err = service
            .settle(record(vec![
                RecipientAllocation::new("agent-a", dec!(60), "cash"),
                RecipientAllocation::new("agent-b", dec!(38), "cash"),
            ]))
            .unwrap_err();

        assert!(matches!(err, CommissionError::AllocationOverrunError { .. }));
    }

    #[test]
    fn test_settle_rejects_inactive_account() {
        let service = CommissionService::with_directory(policy(), directory());
        let err = service
            .settle(record(vec![RecipientAllocation::new(
                "agent-a",
                dec!(10),
                "closed",
            )]))
            .unwrap_err();

        assert!(matches!(err, CommissionError::InactiveAccountError { .. }));
    }

    #[test]
    fn test_settle_without_directory_skips_account_check() {
        let service = without_directory(policy());
        assert!(service
            .settle(record(vec![RecipientAllocation::new(
                "agent-a",
                dec!(10),
                "closed",
            )]))
            .is_ok());
    }

    #[test]
    fn test_settle_rejects_invalid_rate() {
        let service = without_directory(policy());
        let mut bad = record(vec![]);
        bad.input.commission_rate = dec!(2);

        assert!(matches!(
            service.settle(bad),
            Err(CommissionError::InvalidInputError { .. })
        ));
    }

    #[test]
    fn test_preview_reports_overrun_without_failing() {
        let service = without_directory(policy());
        let rec = record(vec![RecipientAllocation::new("agent-a", dec!(100), "cash")]);
        let (result, summary) = service.preview(&rec.input, &rec.recipients).unwrap();

        assert_eq!(result.total_commission_payable, dec!(97.85));
        assert!(!summary.within_tolerance);
        assert_eq!(summary.remaining, dec!(-2.15));
    }

    #[test]
    fn test_check_allocation_rejects_overrun_after_preview() {
        let service = without_directory(policy());
        let rec = record(vec![
            RecipientAllocation::new("agent-a", dec!(60), "cash"),
            RecipientAllocation::new("agent-b", dec!(38), "cash"),
        ]);
        let (_, summary) = service.preview(&rec.input, &rec.recipients).unwrap();

        let err = service
            .check_allocation(&rec.recipients, &summary)
            .unwrap_err();
        assert!(matches!(err, CommissionError::AllocationOverrunError { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_check_allocation_accepts_one_cent_over_payable() {
        let service = without_directory(policy());
        let rec = record(vec![
            RecipientAllocation::new("agent-a", dec!(60), "cash"),
            RecipientAllocation::new("agent-b", dec!(37.86), "cash"),
        ]);
        let (_, summary) = service.preview(&rec.input, &rec.recipients).unwrap();

        assert_eq!(summary.remaining, dec!(-0.01));
        assert!(service.check_allocation(&rec.recipients, &summary).is_ok());
    }

    #[test]
    fn test_check_allocation_rejects_bad_row() {
        let service = without_directory(policy());
        let rec = record(vec![RecipientAllocation::new("agent-a", dec!(10), "")]);
        let (_, summary) = service.preview(&rec.input, &rec.recipients).unwrap();

        assert!(matches!(
            service.check_allocation(&rec.recipients, &summary),
            Err(CommissionError::InvalidAllocationError { row: 1, .. })
        ));
    }

    #[test]
    fn test_settle_rejects_amount_beyond_limit() {
        let service = without_directory(policy());
        let mut huge = record(vec![]);
        huge.input.amount_received = Decimal::MAX;
        huge.input.additions = dec!(1);

        assert!(matches!(
            service.settle(huge),
            Err(CommissionError::InvalidInputError { .. })
        ));
    }

    #[test]
    fn test_preview_reports_overflow_as_error() {
        let service = without_directory(policy());
        let mut huge = record(vec![]);
        huge.input.amount_received = Decimal::MAX;
        huge.input.additions = dec!(1);

        assert!(service.preview(&huge.input, &huge.recipients).is_err());
    }

    #[test]
    fn test_clamp_policy_flows_through_service() {
        let service = without_directory(FixedPolicy {
            negative_base: NegativeBasePolicy::Clamp,
            require_active: false,
        });
        let input =
            CommissionInput::from_percentages(dec!(500), dec!(0), dec!(600), dec!(10), dec!(0));

        assert_eq!(service.calculate(&input).unwrap().gross_commission, Decimal::ZERO);
    }
}
