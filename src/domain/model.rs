use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 佣金計算輸入，比率為 0..=1 的小數
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommissionInput {
    pub amount_received: Decimal,
    pub additions: Decimal,
    pub deductions: Decimal,
    pub commission_rate: Decimal,
    pub withholding_tax_rate: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommissionResult {
    pub base_for_commission: Decimal,
    pub gross_commission: Decimal,
    pub withholding_tax_amount: Decimal,
    pub total_commission_payable: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientAllocation {
    pub sales_agent_id: String,
    pub amount: Decimal,
    pub paying_account_id: String,
}

impl RecipientAllocation {
    pub fn new(
        sales_agent_id: impl Into<String>,
        amount: Decimal,
        paying_account_id: impl Into<String>,
    ) -> Self {
        Self {
            sales_agent_id: sales_agent_id.into(),
            amount,
            paying_account_id: paying_account_id.into(),
        }
    }
}

/// Running totals shown while recipient rows are being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllocationSummary {
    pub payable: Decimal,
    pub distributed: Decimal,
    pub remaining: Decimal,
    pub within_tolerance: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub code: String,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountNode {
    pub account: Account,
    pub children: Vec<AccountNode>,
}

/// One row of a flattened chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenedAccount {
    pub account: Account,
    pub depth: usize,
    /// Ancestor ids from the root down to and including this account.
    pub path: Vec<String>,
}

impl FlattenedAccount {
    pub fn label(&self, indent: &str) -> String {
        format!(
            "{}{} - {}",
            indent.repeat(self.depth),
            self.account.code,
            self.account.name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissionRecord {
    pub commission_id: String,
    pub sale_reference: String,
    pub date: Option<NaiveDate>,
    pub input: CommissionInput,
    pub recipients: Vec<RecipientAllocation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledCommission {
    pub record: CommissionRecord,
    pub result: CommissionResult,
    pub distributed: Decimal,
    pub remaining: Decimal,
}
