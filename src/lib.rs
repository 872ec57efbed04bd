pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::LocalStorage;
pub use config::toml_config::TomlConfig;
pub use crate::core::{
    accounts::{build_account_tree, flatten_accounts, flatten_active_accounts},
    allocation::{summarize_allocations, validate_allocations, DEFAULT_ALLOCATION_TOLERANCE},
    batch::{BatchProcessor, BatchSummary},
    calculator::{calculate_commission, coerce_amount, rate_from_percent},
    service::CommissionService,
};
pub use domain::model::{
    Account, AllocationSummary, CommissionInput, CommissionRecord, CommissionResult,
    RecipientAllocation, SettledCommission,
};
pub use domain::ports::NegativeBasePolicy;
pub use utils::error::{CommissionError, Result};
