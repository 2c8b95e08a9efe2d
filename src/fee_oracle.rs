//! # L1 Calldata Fee Oracle
//!
//! Roll-ups charge an extra fee for posting transaction data to L1. The fee is
//! estimated by the `GasPriceOracle` predeploy from the serialized transaction and
//! tracked next to gas usage as a calldata-fee sample.

use crate::chain::ChainClient;
use crate::contracts::{GetL1FeeCall, GetL1FeeReturn};
use crate::error::ChainError;
use async_trait::async_trait;
use ethers::abi::{AbiDecode, AbiEncode};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Transaction, TransactionRequest, U256};
use std::sync::Arc;

#[async_trait]
pub trait FeeOracle: Send + Sync {
    /// Estimated L1 fee, in wei, for posting `serialized_tx`.
    async fn l1_fee(&self, serialized_tx: Bytes) -> Result<U256, ChainError>;
}

/// Queries `getL1Fee(bytes)` on a GasPriceOracle contract.
pub struct GasPriceOracleFee {
    client: Arc<dyn ChainClient>,
    oracle: Address,
}

impl GasPriceOracleFee {
    pub fn new(client: Arc<dyn ChainClient>, oracle: Address) -> Self {
        Self { client, oracle }
    }
}

#[async_trait]
impl FeeOracle for GasPriceOracleFee {
    async fn l1_fee(&self, serialized_tx: Bytes) -> Result<U256, ChainError> {
        let call = GetL1FeeCall {
            data: serialized_tx,
        };
        let raw = self.client.call(self.oracle, call.encode().into()).await?;
        GetL1FeeReturn::decode(raw.as_ref())
            .map(|ret| ret.0)
            .map_err(|e| ChainError::Rpc {
                method: "getL1Fee",
                message: format!("undecodable oracle response: {}", e),
            })
    }
}

/// Unsigned legacy RLP of the fields the oracle prices: to, data, nonce, gas price, gas limit.
pub fn serialize_for_l1(tx: &Transaction) -> Bytes {
    let mut request = TransactionRequest::new()
        .nonce(tx.nonce)
        .gas(tx.gas)
        .data(tx.input.clone());
    if let Some(to) = tx.to {
        request = request.to(to);
    }
    if let Some(gas_price) = tx.gas_price {
        request = request.gas_price(gas_price);
    }
    TypedTransaction::Legacy(request).rlp()
}
