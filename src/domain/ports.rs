use crate::domain::model::Account;
use crate::utils::error::Result;
use rust_decimal::Decimal;
use std::collections::HashMap;

pub trait Storage {
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
}

/// What happens when deductions exceed receipts plus additions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegativeBasePolicy {
    #[default]
    Propagate,
    Clamp,
}

pub trait PolicyProvider {
    fn allocation_tolerance(&self) -> Decimal;
    fn negative_base_policy(&self) -> NegativeBasePolicy;
    fn require_active_accounts(&self) -> bool;
}

pub trait AccountDirectory {
    fn find_account(&self, id: &str) -> Option<&Account>;
}

impl AccountDirectory for HashMap<String, Account> {
    fn find_account(&self, id: &str) -> Option<&Account> {
        self.get(id)
    }
}
