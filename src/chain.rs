//! # Chain Queries
//!
//! The block/transaction/receipt/code interface the scanner and resolver depend on.
//! [`MiddlewareClient`] backs it with any ethers [`Middleware`]; tests substitute an
//! in-memory implementation.

use crate::error::ChainError;
use crate::metrics;
use async_trait::async_trait;
use ethers::prelude::{Http, Middleware, Provider};
use ethers::types::{
    Address, Block, Bytes, Transaction, TransactionReceipt, TransactionRequest, H256,
};
use log::debug;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn block_number(&self) -> Result<u64, ChainError>;

    /// `Ok(None)` when the block does not exist (yet).
    async fn block_with_transactions(
        &self,
        number: u64,
    ) -> Result<Option<Block<Transaction>>, ChainError>;

    async fn transaction(&self, hash: H256) -> Result<Option<Transaction>, ChainError>;

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, ChainError>;

    /// Runtime bytecode at `address`; empty for externally owned accounts.
    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError>;

    /// Read-only `eth_call` against the latest block.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;
}

/// [`ChainClient`] over an ethers middleware, with a per-request timeout.
#[derive(Debug, Clone)]
pub struct MiddlewareClient<M> {
    provider: Arc<M>,
    timeout: Duration,
}

impl<M: Middleware + 'static> MiddlewareClient<M> {
    pub fn new(provider: Arc<M>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn provider(&self) -> Arc<M> {
        Arc::clone(&self.provider)
    }

    async fn timed<T, E, F>(&self, method: &'static str, request: F) -> Result<T, ChainError>
    where
        E: std::fmt::Display,
        F: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, request).await;
        let elapsed = start.elapsed();
        metrics::record_rpc_call_latency(method, elapsed);

        match result {
            Ok(Ok(value)) => {
                debug!("[RPC] {} ok in {:?}", method, elapsed);
                Ok(value)
            }
            Ok(Err(e)) => {
                metrics::increment_rpc_error(method);
                Err(ChainError::Rpc {
                    method,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                metrics::increment_rpc_error(method);
                Err(ChainError::Timeout {
                    method,
                    after_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }
}

impl MiddlewareClient<Provider<Http>> {
    /// HTTP provider for `url`.
    pub fn connect(url: &str, timeout: Duration) -> Result<Self, ChainError> {
        let provider = Provider::<Http>::try_from(url).map_err(|e| ChainError::Rpc {
            method: "connect",
            message: format!("{}: {}", url, e),
        })?;
        Ok(Self::new(Arc::new(provider), timeout))
    }
}

#[async_trait]
impl<M: Middleware + 'static> ChainClient for MiddlewareClient<M> {
    async fn block_number(&self) -> Result<u64, ChainError> {
        self.timed("eth_blockNumber", self.provider.get_block_number())
            .await
            .map(|n| n.as_u64())
    }

    async fn block_with_transactions(
        &self,
        number: u64,
    ) -> Result<Option<Block<Transaction>>, ChainError> {
        self.timed("eth_getBlockByNumber", self.provider.get_block_with_txs(number))
            .await
    }

    async fn transaction(&self, hash: H256) -> Result<Option<Transaction>, ChainError> {
        self.timed("eth_getTransactionByHash", self.provider.get_transaction(hash))
            .await
    }

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, ChainError> {
        self.timed(
            "eth_getTransactionReceipt",
            self.provider.get_transaction_receipt(hash),
        )
        .await
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
        self.timed("eth_getCode", self.provider.get_code(address, None))
            .await
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        let request = TransactionRequest::new().to(to).data(data).into();
        self.timed("eth_call", self.provider.call(&request, None))
            .await
    }
}
