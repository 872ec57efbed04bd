pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};

#[cfg(feature = "cli")]
mod cli {
    use super::toml_config::TomlConfig;
    use crate::core::calculator::coerce_amount;
    use crate::core::{NegativeBasePolicy, RecipientAllocation};
    use crate::utils::error::Result;
    use crate::utils::validation::{validate_path, Validate};
    use clap::{Parser, Subcommand};
    use rust_decimal::Decimal;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "sales-commission")]
    #[command(about = "Sales commission calculator and allocation checker")]
    pub struct CliConfig {
        /// Path to TOML policy file
        #[arg(short, long, global = true)]
        pub config: Option<String>,

        /// Enable verbose output
        #[arg(short, long, global = true)]
        pub verbose: bool,

        /// Emit logs as JSON lines
        #[arg(long, global = true)]
        pub json_logs: bool,

        /// Floor a negative commission base at zero
        #[arg(long, global = true)]
        pub clamp_negative_base: bool,

        /// Override the allocation tolerance from the config file
        #[arg(long, global = true)]
        pub tolerance: Option<Decimal>,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Compute one commission; rates are percentages
        Calculate {
            #[arg(long, default_value = "0")]
            amount_received: String,

            #[arg(long, default_value = "0")]
            additions: String,

            #[arg(long, default_value = "0")]
            deductions: String,

            #[arg(long, default_value = "0")]
            commission_rate: String,

            #[arg(long, default_value = "0")]
            withholding_tax_rate: String,

            /// Recipient as agent:amount:account, repeatable
            #[arg(long = "recipient", value_parser = parse_recipient)]
            recipients: Vec<RecipientAllocation>,

            /// Print the result as JSON
            #[arg(long)]
            json: bool,
        },

        /// Settle every commission in a CSV file and write a report
        Batch {
            #[arg(long)]
            commissions: String,

            #[arg(long)]
            recipients: Option<String>,

            #[arg(long)]
            accounts: Option<String>,

            #[arg(long, default_value = "./output")]
            output: String,
        },

        /// Print the chart of accounts as an indented list
        Accounts {
            #[arg(long)]
            accounts: String,

            #[arg(long)]
            active_only: bool,
        },
    }

    pub fn parse_recipient(raw: &str) -> std::result::Result<RecipientAllocation, String> {
        let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
        match parts.as_slice() {
            [agent, amount, account] if !agent.is_empty() && !account.is_empty() => Ok(
                RecipientAllocation::new(*agent, coerce_amount(amount), *account),
            ),
            _ => Err(format!("expected agent:amount:account, got '{}'", raw)),
        }
    }

    impl CliConfig {
        /// 載入政策設定並套用命令列覆蓋
        pub fn load_policy(&self) -> Result<TomlConfig> {
            let mut config = match &self.config {
                Some(path) => {
                    tracing::info!("📁 Loading configuration from: {}", path);
                    TomlConfig::from_file(path)?
                }
                None => TomlConfig::default(),
            };

            if self.clamp_negative_base {
                config.policy.negative_base = NegativeBasePolicy::Clamp;
                tracing::info!("🔧 Negative base will be clamped to zero");
            }
            if let Some(tolerance) = self.tolerance {
                config.policy.allocation_tolerance = tolerance;
                tracing::info!("🔧 Allocation tolerance overridden to: {}", tolerance);
            }

            config.validate()?;
            Ok(config)
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            if let Some(path) = &self.config {
                validate_path("config", path)?;
            }

            match &self.command {
                Command::Calculate { .. } => {}
                Command::Batch {
                    commissions,
                    recipients,
                    accounts,
                    output,
                } => {
                    validate_path("commissions", commissions)?;
                    validate_path("output", output)?;
                    if let Some(path) = recipients {
                        validate_path("recipients", path)?;
                    }
                    if let Some(path) = accounts {
                        validate_path("accounts", path)?;
                    }
                }
                Command::Accounts { accounts, .. } => validate_path("accounts", accounts)?,
            }

            Ok(())
        }
    }

}
