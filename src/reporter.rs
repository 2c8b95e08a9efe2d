//! # Synchronous Reporter Bridge
//!
//! Test harnesses call back at fixed lifecycle points and cannot await. [`GasReporter`]
//! owns a tokio runtime and blocks on the async pipeline at each hook:
//!
//! - [`GasReporter::on_run_begin`]: remembers the latest block as the start of the run.
//! - [`GasReporter::on_unit_begin`]: resets address bindings.
//! - [`GasReporter::record_transaction`]: pushes one transaction when collection happens
//!   outside the end-of-run scan.
//! - [`GasReporter::on_run_end`]: scans from the start block to the latest block and
//!   finalizes the report.

use crate::catalog::Catalog;
use crate::error::ReporterError;
use crate::report::{GasReport, ReportOptions};
use crate::scanner::{GasWatcher, ScanSummary, TxOutcome};
use crate::settings::Settings;
use ethers::types::H256;
use log::info;
use tokio::runtime::{Builder, Runtime};

pub struct GasReporter {
    runtime: Runtime,
    watcher: GasWatcher,
    report_options: ReportOptions,
    collected_outside: bool,
    start_block: Option<u64>,
}

impl GasReporter {
    pub fn new(
        watcher: GasWatcher,
        report_options: ReportOptions,
        collected_outside: bool,
    ) -> Result<Self, ReporterError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime,
            watcher,
            report_options,
            collected_outside,
            start_block: None,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ReporterError> {
        let catalog = Catalog::from_settings(settings)?;
        let watcher = GasWatcher::from_settings(settings, &catalog)?;
        Self::new(
            watcher,
            ReportOptions::from_settings(settings),
            settings.reporter.collected_outside,
        )
    }

    pub fn watcher(&self) -> &GasWatcher {
        &self.watcher
    }

    pub fn start_block(&self) -> Option<u64> {
        self.start_block
    }

    pub fn on_run_begin(&mut self) -> Result<u64, ReporterError> {
        let chain = self.watcher.chain();
        let start = self.runtime.block_on(chain.block_number())?;
        info!("🚀 Gas reporter run begins at block {}", start);
        self.start_block = Some(start);
        Ok(start)
    }

    pub fn on_unit_begin(&mut self) {
        self.watcher.begin_unit();
    }

    pub fn record_transaction(&mut self, hash: H256) -> Result<TxOutcome, ReporterError> {
        if self.start_block.is_none() {
            return Err(ReporterError::RunNotStarted);
        }
        Ok(self.runtime.block_on(self.watcher.record_transaction(hash))?)
    }

    /// Blocks until the run's block range is fully recorded, then finalizes.
    pub fn on_run_end(&mut self) -> Result<GasReport, ReporterError> {
        let start = self.start_block.ok_or(ReporterError::RunNotStarted)?;

        if !self.collected_outside {
            let summary = self.scan_to_latest(start)?;
            info!(
                "🏁 Run complete: {} blocks, {} transactions recorded",
                summary.blocks_scanned,
                summary.transactions()
            );
        }

        Ok(self.watcher.ledger().finalize(&self.report_options))
    }

    fn scan_to_latest(&mut self, start: u64) -> Result<ScanSummary, ReporterError> {
        let chain = self.watcher.chain();
        let watcher = &mut self.watcher;
        let summary = self.runtime.block_on(async {
            let end = chain.block_number().await?;
            watcher
                .collect_gas_usage(start, end)
                .await
                .map_err(ReporterError::from)
        })?;
        Ok(summary)
    }
}
