use crate::core::{NegativeBasePolicy, PolicyProvider, DEFAULT_ALLOCATION_TOLERANCE};
use crate::utils::error::{CommissionError, Result};
use crate::utils::validation::{validate_range, Validate};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_tolerance")]
    pub allocation_tolerance: Decimal,
    #[serde(default)]
    pub negative_base: NegativeBasePolicy,
    #[serde(default = "default_true")]
    pub require_active_accounts: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Rounding applied to amounts written to reports, never to calculations.
    #[serde(default = "default_decimal_places")]
    pub decimal_places: Option<u32>,
    #[serde(default = "default_indent")]
    pub account_indent: String,
}

fn default_tolerance() -> Decimal {
    DEFAULT_ALLOCATION_TOLERANCE
}

fn default_true() -> bool {
    true
}

fn default_decimal_places() -> Option<u32> {
    Some(2)
}

fn default_indent() -> String {
    "    ".to_string()
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allocation_tolerance: default_tolerance(),
            negative_base: NegativeBasePolicy::default(),
            require_active_accounts: true,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            decimal_places: default_decimal_places(),
            account_indent: default_indent(),
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| CommissionError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${COMMISSION_TOLERANCE})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    /// Rounds a report amount to the configured scale.
    pub fn format_amount(&self, amount: Decimal) -> String {
        match self.report.decimal_places {
            Some(places) => format!("{:.*}", places as usize, amount.round_dp(places)),
            None => amount.normalize().to_string(),
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if self.policy.allocation_tolerance < Decimal::ZERO {
            return Err(CommissionError::InvalidConfigValueError {
                field: "policy.allocation_tolerance".to_string(),
                value: self.policy.allocation_tolerance.to_string(),
                reason: "Tolerance cannot be negative".to_string(),
            });
        }

        if let Some(places) = self.report.decimal_places {
            validate_range("report.decimal_places", places, 0, 10)?;
        }

        Ok(())
    }
}

impl PolicyProvider for TomlConfig {
    fn allocation_tolerance(&self) -> Decimal {
        self.policy.allocation_tolerance
    }

    fn negative_base_policy(&self) -> NegativeBasePolicy {
        self.policy.negative_base
    }

    fn require_active_accounts(&self) -> bool {
        self.policy.require_active_accounts
    }
}
