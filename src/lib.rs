//! # Adjusted Balance Builder
//!
//! A library for restating monthly ledger balances, reported in constant
//! currency, into an inflation-adjustment component and a historical component.
//!
//! ## Core Concepts
//!
//! - **Sources**: a tab-separated entity roster, chart of accounts and balance
//!   ledger, plus a dated monthly price-index workbook (a delimited export is
//!   also accepted)
//! - **AXI Coefficient**: month-over-month change of the price index, zero for the
//!   first month and wherever the index has a gap
//! - **Restatement**: a per-account left-to-right scan producing, for each month,
//!   the constant balance, monthly and cumulative historical figures, and monthly
//!   and cumulative adjustments
//! - **Results Accounts**: accounts `500000..700000`, the only ones adjusted; they are
//!   grouped by two-digit prefix with subtotals and a grand total
//!
//! ## Example
//!
//! ```rust,ignore
//! use adjusted_balance_builder::*;
//!
//! let reporter = AdjustmentReporter::new(SourceConfig::with_data_dir("data"));
//! let filters = ReportFilters::new(vec!["0".to_string()], "2023-01", "2023-12");
//!
//! let bundle = reporter.generate_report(&filters)?;
//! for entry in &bundle.toc {
//!     println!("{} {} {}", entry.sheet_name, entry.num_entidad, entry.nombre_entidad);
//! }
//! ```

pub mod assembler;
pub mod coefficients;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod ledger;
pub mod report;
pub mod schema;
pub mod utils;

pub use assembler::{assemble, Lookups};
pub use coefficients::build_coefficients;
pub use config::{DecimalSeparator, SourceConfig};
pub use engine::{
    group_prefix, is_adjustable, pivot_accounts, restate, DerivedRow, MonthFigures,
    PivotedAccount, PivotedAccounts, Restater, ScanState,
};
pub use error::{AdjustmentReportError, Result, SourceKind};
pub use ingestion::{
    load_accounts, load_entities, load_index, AccountMap, EntityMap, IndexMap,
};
pub use ledger::{filter_ledger, LedgerScan, ScanStats};
pub use report::*;
pub use schema::*;
pub use utils::*;

use log::{debug, info};
use std::thread;

/// Entry point for the two operations the HTTP layer exposes.
pub struct AdjustmentReporter {
    config: SourceConfig,
}

impl AdjustmentReporter {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// The full roster, ascending by entity number.
    pub fn list_entities(&self) -> Result<Vec<Entity>> {
        let path = self.config.require(SourceKind::Entities)?;
        Ok(load_entities(path)?.into_values().collect())
    }

    pub fn generate_report(&self, filters: &ReportFilters) -> Result<ReportBundle> {
        self.config.check_sources()?;

        let range = filters.period()?;
        let selector = filters.selector();
        info!(
            "Generating adjusted report for {} to {} ({:?})",
            filters.balhist_desde, filters.balhist_hasta, selector
        );

        let (accounts, entities, index, scan) = thread::scope(|s| {
            let accounts = s.spawn(|| load_accounts(&self.config.accounts_path));
            let entities = s.spawn(|| load_entities(&self.config.entities_path));
            let index = s.spawn(|| load_index(&self.config));
            let scan = filter_ledger(&self.config.ledger_path, &selector, range);
            (
                join_loader(accounts),
                join_loader(entities),
                join_loader(index),
                scan,
            )
        });

        let scan = scan?;
        let lookups = Lookups {
            accounts: accounts?,
            entities: entities?,
        };

        if scan.records.is_empty() {
            info!("No ledger records matched the filters");
            return Err(no_data(filters));
        }
        if index.is_empty() {
            info!("Price index is empty; refusing to build an unadjusted report");
            return Err(no_data(filters));
        }

        let months = range.months();
        let coefficients = build_coefficients(&months, &index);
        debug!(
            "{} months, {} matching records, {} index points",
            months.len(),
            scan.records.len(),
            index.len()
        );

        let tables = assemble(&scan.records, &lookups, &months, &coefficients);
        let bundle = ReportBundle::new(
            report_file_name(&range.start.range_key(), &range.end.range_key()),
            tables,
        );
        if bundle.is_empty() {
            return Err(no_data(filters));
        }

        info!(
            "Report {} assembled with {} entity tables",
            bundle.file_name,
            bundle.tables.len()
        );
        Ok(bundle)
    }
}

pub fn generate_report(config: &SourceConfig, filters: &ReportFilters) -> Result<ReportBundle> {
    AdjustmentReporter::new(config.clone()).generate_report(filters)
}

pub fn list_entities(config: &SourceConfig) -> Result<Vec<Entity>> {
    AdjustmentReporter::new(config.clone()).list_entities()
}

fn join_loader<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}

fn no_data(filters: &ReportFilters) -> AdjustmentReportError {
    AdjustmentReportError::NoData {
        desde: filters.balhist_desde.clone(),
        hasta: filters.balhist_hasta.clone(),
    }
}
