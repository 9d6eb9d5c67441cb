//! Shared helpers for integration tests

use async_trait::async_trait;
use loyalty_ledger::core::AccrualOracle;
use loyalty_ledger::types::OracleError;
use loyalty_ledger::AccrualReport;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Accrual oracle answering from a fixed table of final reports
///
/// Orders missing from the table are reported as not found.
#[derive(Debug, Default)]
pub struct TableOracle {
    reports: HashMap<String, AccrualReport>,
    calls: AtomicUsize,
}

impl TableOracle {
    pub fn new(reports: impl IntoIterator<Item = AccrualReport>) -> Self {
        Self {
            reports: reports
                .into_iter()
                .map(|report| (report.order.clone(), report))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Load reports from a CSV file with columns order,status,accrual
    #[allow(dead_code)]
    pub fn from_csv(path: &Path) -> Self {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .unwrap_or_else(|e| panic!("Failed to open {}: {}", path.display(), e));

        let reports: Vec<AccrualReport> = reader
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap_or_else(|e| panic!("Failed to parse {}: {}", path.display(), e));

        Self::new(reports)
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccrualOracle for TableOracle {
    async fn accrual(&self, number: &str) -> Result<Option<AccrualReport>, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reports.get(number).cloned())
    }
}
