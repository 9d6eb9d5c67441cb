//! CSV format handling for replay operations and balance output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to ledger operations
//! - Balance output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{AccountId, Balance, LoyaltyError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns: type, account, number, amount.
/// The amount field is optional because order rows don't carry one.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub op_type: String,
    pub account: AccountId,
    pub number: String,
    pub amount: Option<String>,
}

/// One operation replayed against the ledger
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerOp {
    /// Register an order number for an account
    Order { account: AccountId, number: String },

    /// Spend bonuses against a reference number
    Withdraw {
        account: AccountId,
        reference: String,
        amount: Decimal,
    },
}

impl LedgerOp {
    pub fn account(&self) -> AccountId {
        match self {
            LedgerOp::Order { account, .. } | LedgerOp::Withdraw { account, .. } => *account,
        }
    }
}

/// Convert a CsvRecord to a LedgerOp
///
/// The operation type is matched case-insensitively. Withdraw rows must carry
/// a decimal amount; any amount on an order row is ignored. Order numbers are
/// passed through untouched so the core can apply its own validation.
///
/// # Returns
///
/// * `Ok(LedgerOp)` - Successfully converted record
/// * `Err(String)` - Description of the conversion failure
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<LedgerOp, String> {
    match csv_record.op_type.to_lowercase().as_str() {
        "order" => Ok(LedgerOp::Order {
            account: csv_record.account,
            number: csv_record.number,
        }),
        "withdraw" => {
            let amount = match csv_record.amount.as_deref().map(str::trim) {
                Some(raw) if !raw.is_empty() => Decimal::from_str(raw).map_err(|_| {
                    format!(
                        "Invalid amount '{}' for withdrawal {}",
                        raw, csv_record.number
                    )
                })?,
                _ => {
                    return Err(format!(
                        "Withdrawal {} for account {} requires an amount",
                        csv_record.number, csv_record.account
                    ))
                }
            };

            Ok(LedgerOp::Withdraw {
                account: csv_record.account,
                reference: csv_record.number,
                amount,
            })
        }
        _ => Err(format!(
            "Invalid operation type: '{}' for number {}",
            csv_record.op_type, csv_record.number
        )),
    }
}

/// Write account balances to CSV format
///
/// Writes balances with columns: account, current, withdrawn. Rows are sorted
/// by account ID for deterministic output and amounts carry four decimal
/// places.
pub fn write_balances_csv(
    balances: &[(AccountId, Balance)],
    output: &mut dyn Write,
) -> Result<(), LoyaltyError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["account", "current", "withdrawn"])?;

    let mut sorted = balances.to_vec();
    sorted.sort_by_key(|(account, _)| *account);

    for (account, balance) in sorted {
        writer.write_record(&[
            account.to_string(),
            format!("{:.4}", balance.current),
            format!("{:.4}", balance.withdrawn),
        ])?;
    }

    writer.flush()?;

    Ok(())
}
