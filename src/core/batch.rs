use crate::config::toml_config::TomlConfig;
use crate::core::calculator::coerce_amount;
use crate::core::service::CommissionService;
use crate::core::{
    Account, CommissionInput, CommissionRecord, CommissionResult, RecipientAllocation,
    SettledCommission, Storage,
};
use crate::utils::error::{CommissionError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const REPORT_FILENAME: &str = "commission_report.csv";

#[derive(Debug, Clone, Deserialize)]
struct CommissionRow {
    commission_id: String,
    #[serde(default)]
    sale_reference: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    amount_received: String,
    #[serde(default)]
    additions: String,
    #[serde(default)]
    deductions: String,
    #[serde(default)]
    commission_rate_percent: String,
    #[serde(default)]
    withholding_tax_rate_percent: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RecipientRow {
    commission_id: String,
    sales_agent_id: String,
    #[serde(default)]
    amount: String,
    paying_account_id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AccountRow {
    id: String,
    #[serde(default)]
    parent_id: String,
    code: String,
    name: String,
    #[serde(default)]
    is_active: String,
}

#[derive(Debug, Clone, Serialize)]
struct ReportRow {
    commission_id: String,
    sale_reference: String,
    date: String,
    base_for_commission: String,
    gross_commission: String,
    withholding_tax_amount: String,
    total_commission_payable: String,
    distributed: String,
    remaining: String,
    status: &'static str,
    message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub settled: usize,
    pub rejected: usize,
    pub report_path: String,
}

/// 帳戶 CSV：id,parent_id,code,name,is_active
pub fn parse_accounts_csv(data: &[u8]) -> Result<Vec<Account>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(data);
    let mut accounts = Vec::new();
    for row in reader.deserialize::<AccountRow>() {
        let row = row?;
        accounts.push(Account {
            id: row.id,
            parent_id: Some(row.parent_id).filter(|p| !p.is_empty()),
            code: row.code,
            name: row.name,
            is_active: parse_flag(&row.is_active),
        });
    }
    Ok(accounts)
}

/// Blank means active; accounts are switched off explicitly.
fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "n" | "inactive"
    )
}

fn parse_date(raw: &str) -> Result<Option<NaiveDate>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| CommissionError::InvalidInputError {
            field: "date".to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

/// Reads commission and recipient CSVs, settles each commission and writes
/// one report row per commission. Rejected rows do not stop the batch.
pub struct BatchProcessor<S: Storage> {
    storage: S,
    service: CommissionService<TomlConfig, HashMap<String, Account>>,
}

impl<S: Storage> BatchProcessor<S> {
    pub fn new(storage: S, config: TomlConfig) -> Self {
        Self {
            storage,
            service: CommissionService::new(config),
        }
    }

    pub fn with_accounts(storage: S, config: TomlConfig, accounts: Vec<Account>) -> Self {
        let directory = accounts.into_iter().map(|a| (a.id.clone(), a)).collect();
        Self {
            storage,
            service: CommissionService::with_directory(config, directory),
        }
    }

    pub fn load_accounts(storage: &S, path: &str) -> Result<Vec<Account>> {
        let data = storage.read_file(path)?;
        let accounts = parse_accounts_csv(&data)?;
        tracing::info!("Loaded {} accounts from {}", accounts.len(), path);
        Ok(accounts)
    }

    pub fn run(
        &self,
        commissions_path: &str,
        recipients_path: Option<&str>,
        output_dir: &str,
    ) -> Result<BatchSummary> {
        tracing::info!("Reading commissions from {}", commissions_path);
        let commission_data = self.storage.read_file(commissions_path)?;
        let rows = self.read_commissions(&commission_data)?;
        tracing::info!("Read {} commission rows", rows.len());

        let mut recipients = match recipients_path {
            Some(path) => {
                tracing::info!("Reading recipients from {}", path);
                let data = self.storage.read_file(path)?;
                self.read_recipients(&data)?
            }
            None => HashMap::new(),
        };

        // 同一 commission_id 出現多次時，收款人無法歸屬，全部拒絕
        let mut occurrences: HashMap<String, usize> = HashMap::new();
        for row in &rows {
            *occurrences.entry(row.commission_id.clone()).or_default() += 1;
        }

        let mut summary = BatchSummary::default();
        let mut writer = csv::Writer::from_writer(Vec::new());

        for row in rows {
            let report = if occurrences[&row.commission_id] > 1 {
                tracing::warn!("Duplicate commission id '{}' rejected", row.commission_id);
                let error = CommissionError::InvalidInputError {
                    field: "commission_id".to_string(),
                    value: row.commission_id.clone(),
                    reason: "duplicate commission id".to_string(),
                };
                self.rejected(&row, None, &error)
            } else {
                let row_recipients = recipients.remove(&row.commission_id).unwrap_or_default();
                self.process_row(row, row_recipients)
            };
            if report.status == "settled" {
                summary.settled += 1;
            } else {
                summary.rejected += 1;
            }
            writer.serialize(report)?;
        }

        for orphan in recipients.keys() {
            if !occurrences.contains_key(orphan) {
                tracing::warn!("Recipients reference unknown commission '{}'", orphan);
            }
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| CommissionError::ProcessingError {
                message: format!("Failed to finish report: {}", e),
            })?;

        let report_path = std::path::Path::new(output_dir)
            .join(REPORT_FILENAME)
            .to_string_lossy()
            .into_owned();
        self.storage.write_file(&report_path, &bytes)?;

        tracing::info!(
            "Batch finished: {} settled, {} rejected",
            summary.settled,
            summary.rejected
        );
        summary.report_path = report_path;
        Ok(summary)
    }

    fn read_commissions(&self, data: &[u8]) -> Result<Vec<CommissionRow>> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(data);
        let mut rows = Vec::new();
        for row in reader.deserialize::<CommissionRow>() {
            rows.push(row?);
        }
        Ok(rows)
    }

    fn read_recipients(&self, data: &[u8]) -> Result<HashMap<String, Vec<RecipientAllocation>>> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(data);
        let mut grouped: HashMap<String, Vec<RecipientAllocation>> = HashMap::new();
        for row in reader.deserialize::<RecipientRow>() {
            let row = row?;
            grouped
                .entry(row.commission_id)
                .or_default()
                .push(RecipientAllocation::new(
                    row.sales_agent_id,
                    coerce_amount(&row.amount),
                    row.paying_account_id,
                ));
        }
        Ok(grouped)
    }

    fn process_row(&self, row: CommissionRow, recipients: Vec<RecipientAllocation>) -> ReportRow {
        let input = CommissionInput::from_raw_fields(
            &row.amount_received,
            &row.additions,
            &row.deductions,
            &row.commission_rate_percent,
            &row.withholding_tax_rate_percent,
        );

        let date = match parse_date(&row.date) {
            Ok(date) => date,
            Err(e) => return self.rejected(&row, None, &e),
        };

        let record = CommissionRecord {
            commission_id: row.commission_id.clone(),
            sale_reference: row.sale_reference.clone(),
            date,
            input,
            recipients,
        };

        match self.service.settle(record) {
            Ok(settled) => self.settled(settled),
            Err(e) => {
                tracing::warn!("Commission {} rejected: {}", row.commission_id, e);
                let result = self.service.calculate(&input).ok();
                self.rejected(&row, result, &e)
            }
        }
    }

    fn settled(&self, settled: SettledCommission) -> ReportRow {
        let config = self.service.policy();
        let result = settled.result;
        ReportRow {
            date: settled
                .record
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            commission_id: settled.record.commission_id,
            sale_reference: settled.record.sale_reference,
            base_for_commission: config.format_amount(result.base_for_commission),
            gross_commission: config.format_amount(result.gross_commission),
            withholding_tax_amount: config.format_amount(result.withholding_tax_amount),
            total_commission_payable: config.format_amount(result.total_commission_payable),
            distributed: config.format_amount(settled.distributed),
            remaining: config.format_amount(settled.remaining),
            status: "settled",
            message: String::new(),
        }
    }

    fn rejected(
        &self,
        row: &CommissionRow,
        result: Option<CommissionResult>,
        error: &CommissionError,
    ) -> ReportRow {
        let config = self.service.policy();
        let amount = |pick: fn(&CommissionResult) -> Decimal| {
            result
                .as_ref()
                .map(|r| config.format_amount(pick(r)))
                .unwrap_or_default()
        };
        ReportRow {
            commission_id: row.commission_id.clone(),
            sale_reference: row.sale_reference.clone(),
            date: row.date.clone(),
            base_for_commission: amount(|r| r.base_for_commission),
            gross_commission: amount(|r| r.gross_commission),
            withholding_tax_amount: amount(|r| r.withholding_tax_amount),
            total_commission_payable: amount(|r| r.total_commission_payable),
            distributed: String::new(),
            remaining: String::new(),
            status: "rejected",
            message: error.user_friendly_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct MemoryStorage {
        files: RefCell<HashMap<String, Vec<u8>>>,
    }

    impl MemoryStorage {
        fn with_file(self, path: &str, content: &str) -> Self {
            self.files
                .borrow_mut()
                .insert(path.to_string(), content.as_bytes().to_vec());
            self
        }
    }

    impl Storage for MemoryStorage {
        fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            self.files.borrow().get(path).cloned().ok_or_else(|| {
                CommissionError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    path.to_string(),
                ))
            })
        }

        fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files
                .borrow_mut()
                .insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    const COMMISSIONS: &str = "\
commission_id,sale_reference,date,amount_received,additions,deductions,commission_rate_percent,withholding_tax_rate_percent
C-1,S-100,2024-03-01,1000,50,20,10,5
C-2,S-101,2024-03-02,1000,50,20,10,5
C-3,S-102,,500,,600,10,5
C-4,S-103,2024-03-04,200,0,0,10,0
";

    const RECIPIENTS: &str = "\
commission_id,sales_agent_id,amount,paying_account_id
C-1,agent-a,60,cash
C-1,agent-b,37.85,cash
C-2,agent-a,60,cash
C-2,agent-b,38,cash
";

    #[test]
    fn test_batch_settles_and_rejects_rows_independently() {
        let storage = MemoryStorage::default()
            .with_file("commissions.csv", COMMISSIONS)
            .with_file("recipients.csv", RECIPIENTS);
        let processor = BatchProcessor::new(storage, TomlConfig::default());

        let summary = processor
            .run("commissions.csv", Some("recipients.csv"), "out")
            .unwrap();

        assert_eq!(summary.settled, 2);
        assert_eq!(summary.rejected, 2);

        let report = processor.storage.read_file(&summary.report_path).unwrap();
        let report = String::from_utf8(report).unwrap();
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("C-1,S-100,2024-03-01,1030.00,103.00,5.15,97.85,97.85,0.00,settled"));
        assert!(lines[2].contains("rejected,Total distributed exceeds commission payable"));
        // negative payable is carried through, so even an empty allocation overruns it
        assert_eq!(
            lines[3],
            "C-3,S-102,,-100.00,-10.00,-0.50,-9.50,,,rejected,Total distributed exceeds commission payable"
        );
        assert_eq!(
            lines[4],
            "C-4,S-103,2024-03-04,200.00,20.00,0.00,20.00,0.00,20.00,settled,"
        );
    }

    #[test]
    fn test_out_of_range_row_does_not_stop_batch() {
        let commissions = "\
commission_id,sale_reference,date,amount_received,additions,deductions,commission_rate_percent,withholding_tax_rate_percent
C-1,S-1,,79228162514264337593543950335,1,0,10,5
C-2,S-2,,1000,50,20,10,5
";
        let storage = MemoryStorage::default().with_file("c.csv", commissions);
        let processor = BatchProcessor::new(storage, TomlConfig::default());

        let summary = processor.run("c.csv", None, "out").unwrap();
        assert_eq!(summary.settled, 1);
        assert_eq!(summary.rejected, 1);

        let report = processor.storage.read_file(&summary.report_path).unwrap();
        let report = String::from_utf8(report).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        assert!(lines[1].starts_with("C-1,S-1,,,,,,,,rejected,"));
        assert!(lines[1].contains("amount_received"));
        assert_eq!(
            lines[2],
            "C-2,S-2,,1030.00,103.00,5.15,97.85,0.00,97.85,settled,"
        );
    }

    #[test]
    fn test_duplicate_commission_ids_are_rejected() {
        let commissions = "\
commission_id,sale_reference,date,amount_received,additions,deductions,commission_rate_percent,withholding_tax_rate_percent
C-1,S-100,2024-03-01,1000,50,20,10,5
C-1,S-100,2024-03-01,1000,50,20,10,5
C-4,S-103,2024-03-04,200,0,0,10,0
";
        let storage = MemoryStorage::default()
            .with_file("commissions.csv", commissions)
            .with_file("recipients.csv", RECIPIENTS);
        let processor = BatchProcessor::new(storage, TomlConfig::default());

        let summary = processor
            .run("commissions.csv", Some("recipients.csv"), "out")
            .unwrap();
        assert_eq!(summary.settled, 1);
        assert_eq!(summary.rejected, 2);

        let report = processor.storage.read_file(&summary.report_path).unwrap();
        let report = String::from_utf8(report).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        for line in &lines[1..3] {
            assert!(line.starts_with("C-1,"));
            assert!(line.contains("rejected,"));
            assert!(line.contains("duplicate commission id"));
        }
        assert!(lines[3].starts_with("C-4,"));
    }

    #[test]
    fn test_invalid_date_rejects_row() {
        let commissions = "\
commission_id,sale_reference,date,amount_received,additions,deductions,commission_rate_percent,withholding_tax_rate_percent
C-9,S-9,03/01/2024,100,0,0,10,0
";
        let storage = MemoryStorage::default().with_file("c.csv", commissions);
        let processor = BatchProcessor::new(storage, TomlConfig::default());

        let summary = processor.run("c.csv", None, "out").unwrap();
        assert_eq!(summary.rejected, 1);
    }

    #[test]
    fn test_missing_input_aborts_batch() {
        let processor = BatchProcessor::new(MemoryStorage::default(), TomlConfig::default());
        assert!(matches!(
            processor.run("missing.csv", None, "out"),
            Err(CommissionError::IoError(_))
        ));
    }

    #[test]
    fn test_parse_accounts_csv() {
        let accounts = parse_accounts_csv(
            b"id,parent_id,code,name,is_active\nassets,,1000,Assets,true\ncash,assets,1100,Cash,\nold,assets,1200,Old,false\n",
        )
        .unwrap();

        assert_eq!(accounts.len(), 3);
        assert_eq!(accounts[0].parent_id, None);
        assert_eq!(accounts[1].parent_id.as_deref(), Some("assets"));
        assert!(accounts[1].is_active);
        assert!(!accounts[2].is_active);
    }

    #[test]
    fn test_inactive_account_rejected_in_batch() {
        let storage = MemoryStorage::default()
            .with_file("commissions.csv", COMMISSIONS)
            .with_file("recipients.csv", RECIPIENTS);
        let accounts = vec![Account {
            id: "cash".to_string(),
            parent_id: None,
            code: "1100".to_string(),
            name: "Cash".to_string(),
            is_active: false,
        }];
        let processor = BatchProcessor::with_accounts(storage, TomlConfig::default(), accounts);

        let summary = processor
            .run("commissions.csv", Some("recipients.csv"), "out")
            .unwrap();

        // C-4 has no recipients, so it never touches the account
        assert_eq!(summary.settled, 1);
        assert_eq!(summary.rejected, 3);
    }
}
