pub mod accounts;
pub mod allocation;
pub mod batch;
pub mod calculator;
pub mod service;

pub use crate::core::allocation::DEFAULT_ALLOCATION_TOLERANCE;
pub use crate::domain::model::{
    Account, AccountNode, AllocationSummary, CommissionInput, CommissionRecord, CommissionResult,
    FlattenedAccount, RecipientAllocation, SettledCommission,
};
pub use crate::domain::ports::{AccountDirectory, NegativeBasePolicy, PolicyProvider, Storage};
pub use crate::utils::error::Result;
