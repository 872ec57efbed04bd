use clap::Parser;
use sales_commission::utils::{logger, validation::Validate};
use sales_commission::{
    build_account_tree, flatten_accounts, flatten_active_accounts, Account, BatchProcessor,
    CliConfig, Command, CommissionInput, CommissionService, LocalStorage, RecipientAllocation,
    Result, TomlConfig,
};
use std::collections::HashMap;

fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting sales-commission CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = run(&config) {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }
}

fn run(config: &CliConfig) -> Result<()> {
    // 驗證配置
    config.validate()?;
    let policy = config.load_policy()?;
    let storage = LocalStorage::new(".");

    match &config.command {
        Command::Calculate {
            amount_received,
            additions,
            deductions,
            commission_rate,
            withholding_tax_rate,
            recipients,
            json,
        } => {
            let input = CommissionInput::from_raw_fields(
                amount_received,
                additions,
                deductions,
                commission_rate,
                withholding_tax_rate,
            );
            calculate(policy, input, recipients, *json)
        }
        Command::Batch {
            commissions,
            recipients,
            accounts,
            output,
        } => {
            let processor = match accounts {
                Some(path) => {
                    let chart = BatchProcessor::load_accounts(&storage, path)?;
                    BatchProcessor::with_accounts(storage, policy, chart)
                }
                None => BatchProcessor::new(storage, policy),
            };

            let summary = processor.run(commissions, recipients.as_deref(), output)?;
            println!("✅ {} settled, {} rejected", summary.settled, summary.rejected);
            println!("📁 Report saved to: {}", summary.report_path);
            Ok(())
        }
        Command::Accounts {
            accounts,
            active_only,
        } => {
            let chart = BatchProcessor::load_accounts(&storage, accounts)?;
            let tree = build_account_tree(chart)?;
            let rows = if *active_only {
                flatten_active_accounts(&tree)
            } else {
                flatten_accounts(&tree)
            };
            for row in rows {
                let marker = if row.account.is_active { "" } else { " (inactive)" };
                println!("{}{}", row.label(&policy.report.account_indent), marker);
            }
            Ok(())
        }
    }
}

fn calculate(
    policy: TomlConfig,
    input: CommissionInput,
    recipients: &[RecipientAllocation],
    json: bool,
) -> Result<()> {
    let service: CommissionService<TomlConfig, HashMap<String, Account>> =
        CommissionService::new(policy);
    let (result, summary) = service.preview(&input, recipients)?;

    if json {
        let output = serde_json::json!({
            "input": input,
            "result": result,
            "allocation": summary,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let policy = service.policy();
        let line = |label: &str, amount| println!("{:<26}{}", label, policy.format_amount(amount));
        line("Base for commission:", result.base_for_commission);
        line("Gross commission:", result.gross_commission);
        line("Withholding tax:", result.withholding_tax_amount);
        line("Total commission payable:", result.total_commission_payable);
        if !recipients.is_empty() {
            line("Distributed:", summary.distributed);
            line("Remaining:", summary.remaining);
        }
    }

    service.check_allocation(recipients, &summary)
}
