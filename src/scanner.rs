//! # Block Scanner
//!
//! [`GasWatcher`] walks an inclusive block range, pairs every transaction with its
//! receipt, drops failed transactions and feeds the survivors to the ledger: deployments
//! by creation-bytecode prefix, calls through the [`IdentityResolver`].
//!
//! ## Execution model
//!
//! A scan runs in two stages:
//!
//! 1. **Fetch**: up to `max_concurrency` blocks are fetched at once, receipts (and L1
//!    fees, when enabled) fanned out per block. Output keeps block order.
//! 2. **Aggregate**: a single ordered pass appends samples, block order then
//!    transaction order.
//!
//! Any fetch failure aborts the scan before the ledger is touched, so a failed scan
//! never leaves partial samples behind.

use crate::catalog::Catalog;
use crate::chain::{ChainClient, MiddlewareClient};
use crate::error::{ChainError, ScanError};
use crate::fee_oracle::{serialize_for_l1, FeeOracle, GasPriceOracleFee};
use crate::ledger::GasLedger;
use crate::metrics;
use crate::resolver::{EtherRouterResolver, IdentityResolver, ProxyResolver};
use crate::settings::{ProxyResolverKind, Settings};
use ethers::types::{Transaction, TransactionReceipt, H256, U256};
use futures::future::try_join_all;
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub include_failed_transactions: bool,
    /// Blocks fetched concurrently
    pub max_concurrency: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            include_failed_transactions: false,
            max_concurrency: 4,
        }
    }
}

impl ScanOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            include_failed_transactions: settings.reporter.include_failed_transactions,
            max_concurrency: settings.reporter.max_concurrency.max(1),
        }
    }
}

/// What happened to one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Deployment,
    /// Deployment whose creation code matches no catalog contract
    UnmatchedDeployment,
    Method,
    Unresolved,
    /// Value transfer without call data to an unresolvable address
    Transfer,
    /// Reverted and skipped
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub blocks_scanned: u64,
    /// Blocks the node did not return (not mined yet)
    pub blocks_missing: u64,
    pub deployments: u64,
    pub unmatched_deployments: u64,
    pub method_calls: u64,
    pub unresolved: u64,
    pub transfers: u64,
    pub failed: u64,
}

impl ScanSummary {
    fn record(&mut self, outcome: TxOutcome) {
        match outcome {
            TxOutcome::Deployment => self.deployments += 1,
            TxOutcome::UnmatchedDeployment => self.unmatched_deployments += 1,
            TxOutcome::Method => self.method_calls += 1,
            TxOutcome::Unresolved => self.unresolved += 1,
            TxOutcome::Transfer => self.transfers += 1,
            TxOutcome::Failed => self.failed += 1,
        }
    }

    pub fn transactions(&self) -> u64 {
        self.deployments
            + self.unmatched_deployments
            + self.method_calls
            + self.unresolved
            + self.transfers
            + self.failed
    }
}

/// Transaction paired with everything the aggregation stage needs.
#[derive(Debug, Clone)]
struct FetchedTx {
    tx: Transaction,
    receipt: TransactionReceipt,
    gas_used: u64,
    calldata_fee: Option<U256>,
    failed: bool,
}

pub struct GasWatcher {
    ledger: GasLedger,
    resolver: IdentityResolver,
    chain: Arc<dyn ChainClient>,
    fee_oracle: Option<Arc<dyn FeeOracle>>,
    options: ScanOptions,
}

impl GasWatcher {
    pub fn new(ledger: GasLedger, chain: Arc<dyn ChainClient>, options: ScanOptions) -> Self {
        Self {
            ledger,
            resolver: IdentityResolver::new(Arc::clone(&chain)),
            chain,
            fee_oracle: None,
            options,
        }
    }

    /// Connects to `rpc.url`, builds the ledger from `catalog` and wires the configured
    /// proxy resolver and L1 fee oracle.
    pub fn from_settings(settings: &Settings, catalog: &Catalog) -> Result<Self, ChainError> {
        let timeout = Duration::from_millis(settings.rpc.request_timeout_ms);
        let chain: Arc<dyn ChainClient> =
            Arc::new(MiddlewareClient::connect(&settings.rpc.url, timeout)?);

        let ledger = catalog.build_ledger(settings.reporter.block_limit);
        let mut watcher =
            Self::new(ledger, Arc::clone(&chain), ScanOptions::from_settings(settings));

        if settings.reporter.proxy_resolver == ProxyResolverKind::EtherRouter {
            watcher = watcher
                .with_proxy_resolver(Box::new(EtherRouterResolver::new(Arc::clone(&chain))));
        }

        if settings.l1_fee.enabled {
            let oracle_chain: Arc<dyn ChainClient> = match settings.l1_fee.rpc_url.as_deref() {
                Some(url) if url != settings.rpc.url => {
                    Arc::new(MiddlewareClient::connect(url, timeout)?)
                }
                _ => chain,
            };
            info!(
                "⛽ L1 fee accounting enabled (oracle {:?} via {})",
                settings.l1_fee.oracle_address,
                settings.l1_fee_rpc_url()
            );
            watcher = watcher.with_fee_oracle(Arc::new(GasPriceOracleFee::new(
                oracle_chain,
                settings.l1_fee.oracle_address,
            )));
        }

        Ok(watcher)
    }

    pub fn with_proxy_resolver(mut self, proxy: Box<dyn ProxyResolver>) -> Self {
        self.resolver = self.resolver.with_proxy_resolver(proxy);
        self
    }

    pub fn with_fee_oracle(mut self, oracle: Arc<dyn FeeOracle>) -> Self {
        self.fee_oracle = Some(oracle);
        self
    }

    pub fn ledger(&self) -> &GasLedger {
        &self.ledger
    }

    pub fn into_ledger(self) -> GasLedger {
        self.ledger
    }

    pub fn chain(&self) -> Arc<dyn ChainClient> {
        Arc::clone(&self.chain)
    }

    /// Unit-of-work boundary: address bindings from the previous unit are dropped.
    pub fn begin_unit(&mut self) {
        self.ledger.reset_address_cache();
    }

    /// Scans `[start, end]` inclusive. Returns only once every transaction in the range
    /// has been classified and recorded.
    pub async fn collect_gas_usage(
        &mut self,
        start: u64,
        end: u64,
    ) -> Result<ScanSummary, ScanError> {
        let mut summary = ScanSummary::default();
        if start > end {
            return Ok(summary);
        }

        let started = Instant::now();
        let chain = Arc::clone(&self.chain);
        let fee_oracle = self.fee_oracle.clone();
        let options = self.options.clone();

        let blocks: Vec<Option<Vec<FetchedTx>>> = stream::iter(start..=end)
            .map(|number| fetch_block(chain.as_ref(), fee_oracle.as_deref(), &options, number))
            .buffered(options.max_concurrency.max(1))
            .try_collect()
            .await?;

        for block in blocks {
            let Some(transactions) = block else {
                summary.blocks_missing += 1;
                metrics::increment_blocks("missing");
                continue;
            };
            summary.blocks_scanned += 1;
            metrics::increment_blocks("scanned");

            for fetched in transactions {
                let outcome = self.aggregate(fetched).await;
                summary.record(outcome);
            }
        }

        info!(
            "✅ Scanned blocks {}..={} in {:?}: {} txs \
             ({} deployments, {} calls, {} unresolved, {} failed skipped)",
            start,
            end,
            started.elapsed(),
            summary.transactions(),
            summary.deployments,
            summary.method_calls,
            summary.unresolved,
            summary.failed
        );
        Ok(summary)
    }

    /// Records a single transaction pushed by the caller instead of found by a range scan.
    pub async fn record_transaction(&mut self, hash: H256) -> Result<TxOutcome, ScanError> {
        let tx = self
            .chain
            .transaction(hash)
            .await
            .map_err(|source| ScanError::Transaction { tx: hash, source })?
            .ok_or(ScanError::MissingTransaction { tx: hash })?;
        let block = tx.block_number.map(|n| n.as_u64()).unwrap_or_default();

        let fetched = fetch_transaction(
            self.chain.as_ref(),
            self.fee_oracle.as_deref(),
            &self.options,
            block,
            tx,
        )
        .await?;
        Ok(self.aggregate(fetched).await)
    }

    async fn aggregate(&mut self, fetched: FetchedTx) -> TxOutcome {
        if fetched.failed {
            debug!("Skipping failed tx {:?}", fetched.tx.hash);
            return TxOutcome::Failed;
        }

        let FetchedTx {
            tx,
            receipt,
            gas_used,
            calldata_fee,
            ..
        } = fetched;
        let input = tx.input.as_ref();

        if let Some(address) = receipt.contract_address {
            return match self
                .ledger
                .record_deployment_sample(input, address, gas_used, calldata_fee)
            {
                Some(name) => {
                    debug!("Deployment of {} at {:?} ({} gas)", name, address, gas_used);
                    metrics::increment_samples_recorded("deployment");
                    TxOutcome::Deployment
                }
                None => TxOutcome::UnmatchedDeployment,
            };
        }

        // Creation that left no contract behind.
        let Some(to) = tx.to else {
            return TxOutcome::UnmatchedDeployment;
        };

        // Value transfer to an address nothing in this unit has named.
        if input.is_empty() && self.ledger.lookup_address(&to).is_none() {
            return TxOutcome::Transfer;
        }

        match self.resolver.resolve(&self.ledger, to, input).await {
            Some(resolution) => {
                if let Some(address) = resolution.bind {
                    self.ledger.bind_address(address, resolution.contract.clone());
                }
                if self
                    .ledger
                    .record_method_sample(&resolution.contract, input, gas_used, calldata_fee)
                {
                    metrics::increment_samples_recorded("method");
                    TxOutcome::Method
                } else {
                    metrics::increment_unresolved_calls();
                    TxOutcome::Unresolved
                }
            }
            None if input.is_empty() => TxOutcome::Transfer,
            None => {
                self.ledger.mark_unresolved();
                metrics::increment_unresolved_calls();
                TxOutcome::Unresolved
            }
        }
    }
}

/// `Ok(None)` when the node has no such block.
async fn fetch_block(
    chain: &dyn ChainClient,
    fee_oracle: Option<&dyn FeeOracle>,
    options: &ScanOptions,
    number: u64,
) -> Result<Option<Vec<FetchedTx>>, ScanError> {
    let block = chain
        .block_with_transactions(number)
        .await
        .map_err(|source| ScanError::Block { block: number, source })?;

    let Some(block) = block else {
        debug!("Block {} not available, skipping", number);
        return Ok(None);
    };

    let fetched = try_join_all(
        block
            .transactions
            .into_iter()
            .map(|tx| fetch_transaction(chain, fee_oracle, options, number, tx)),
    )
    .await?;
    Ok(Some(fetched))
}

async fn fetch_transaction(
    chain: &dyn ChainClient,
    fee_oracle: Option<&dyn FeeOracle>,
    options: &ScanOptions,
    block: u64,
    tx: Transaction,
) -> Result<FetchedTx, ScanError> {
    let hash = tx.hash;
    let receipt = chain
        .transaction_receipt(hash)
        .await
        .map_err(|source| ScanError::Receipt { block, tx: hash, source })?
        .ok_or(ScanError::MissingReceipt { block, tx: hash })?;

    // Pre-Byzantium receipts carry no status.
    let failed = !options.include_failed_transactions
        && receipt.status.map_or(false, |status| status.as_u64() == 0);

    let gas_used = receipt.gas_used.unwrap_or_default();
    if gas_used > U256::from(u64::MAX) {
        return Err(ScanError::GasOverflow { block, tx: hash });
    }

    let calldata_fee = match fee_oracle {
        Some(oracle) if !failed => Some(
            oracle
                .l1_fee(serialize_for_l1(&tx))
                .await
                .map_err(|source| ScanError::FeeOracle { block, tx: hash, source })?,
        ),
        _ => None,
    };

    Ok(FetchedTx {
        gas_used: gas_used.as_u64(),
        tx,
        receipt,
        calldata_fee,
        failed,
    })
}
