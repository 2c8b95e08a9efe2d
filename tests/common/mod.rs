//! In-memory chain shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use ethers::types::{Address, Block, Bytes, Transaction, TransactionReceipt, H256, U256, U64};
use gas_attribution_sdk::artifacts::{ContractArtifact, MethodSignature};
use gas_attribution_sdk::error::ChainError;
use gas_attribution_sdk::ChainClient;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub const TOKEN_CREATION: &str = "0x6080604052aaaa";
pub const TOKEN_RUNTIME: &str = "0x6080604052bbbb";
pub const PROXY_CREATION: &str = "0x6080604052cccc";
pub const PROXY_RUNTIME: &str = "0x6080604052dddd";

#[derive(Default)]
pub struct MemoryChain {
    latest: AtomicU64,
    blocks: Mutex<HashMap<u64, Block<Transaction>>>,
    transactions: Mutex<HashMap<H256, Transaction>>,
    receipts: Mutex<HashMap<H256, TransactionReceipt>>,
    code: Mutex<HashMap<Address, Bytes>>,
    failing_blocks: Mutex<Vec<u64>>,
}

impl MemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_latest(&self, block: u64) {
        self.latest.store(block, Ordering::SeqCst);
    }

    /// Adds a block holding `txs`; receipts are stored as given.
    pub fn push_block(&self, number: u64, txs: Vec<(Transaction, TransactionReceipt)>) {
        let mut transactions = Vec::new();
        for (mut tx, receipt) in txs {
            tx.block_number = Some(U64::from(number));
            self.receipts.lock().unwrap().insert(tx.hash, receipt);
            self.transactions.lock().unwrap().insert(tx.hash, tx.clone());
            transactions.push(tx);
        }
        let block = Block {
            number: Some(U64::from(number)),
            transactions,
            ..Default::default()
        };
        self.blocks.lock().unwrap().insert(number, block);
        self.latest.fetch_max(number, Ordering::SeqCst);
    }

    /// Adds a block whose transaction has no receipt on the node.
    pub fn push_block_without_receipt(&self, number: u64, tx: Transaction) {
        let block = Block {
            number: Some(U64::from(number)),
            transactions: vec![tx],
            ..Default::default()
        };
        self.blocks.lock().unwrap().insert(number, block);
    }

    pub fn fail_block(&self, number: u64) {
        self.failing_blocks.lock().unwrap().push(number);
    }

    pub fn set_code(&self, address: Address, code: &str) {
        let bytes: Bytes = code.parse().unwrap();
        self.code.lock().unwrap().insert(address, bytes);
    }
}

#[async_trait]
impl ChainClient for MemoryChain {
    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.latest.load(Ordering::SeqCst))
    }

    async fn block_with_transactions(
        &self,
        number: u64,
    ) -> Result<Option<Block<Transaction>>, ChainError> {
        if self.failing_blocks.lock().unwrap().contains(&number) {
            return Err(ChainError::Timeout {
                method: "eth_getBlockByNumber",
                after_ms: 10,
            });
        }
        Ok(self.blocks.lock().unwrap().get(&number).cloned())
    }

    async fn transaction(&self, hash: H256) -> Result<Option<Transaction>, ChainError> {
        Ok(self.transactions.lock().unwrap().get(&hash).cloned())
    }

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, ChainError> {
        Ok(self.receipts.lock().unwrap().get(&hash).cloned())
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
        Ok(self
            .code
            .lock()
            .unwrap()
            .get(&address)
            .cloned()
            .unwrap_or_default())
    }

    async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes, ChainError> {
        Err(ChainError::Rpc {
            method: "eth_call",
            message: "not supported".to_string(),
        })
    }
}

pub fn hash(n: u64) -> H256 {
    H256::from_low_u64_be(n)
}

pub fn address(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

pub fn token_artifact() -> ContractArtifact {
    ContractArtifact::new(
        "Token",
        TOKEN_CREATION.parse().unwrap(),
        TOKEN_RUNTIME.parse().unwrap(),
        vec![
            MethodSignature::new("transfer", "transfer(address,uint256)"),
            MethodSignature::new("approve", "approve(address,uint256)"),
        ],
    )
}

pub fn proxy_artifact() -> ContractArtifact {
    ContractArtifact::new(
        "Proxy",
        PROXY_CREATION.parse().unwrap(),
        PROXY_RUNTIME.parse().unwrap(),
        vec![MethodSignature::new("upgradeTo", "upgradeTo(address)")],
    )
}

/// `transfer(address,uint256)` call data.
pub fn transfer_input() -> Bytes {
    let mut input = ethers::utils::id("transfer(address,uint256)").to_vec();
    input.extend_from_slice(&[0u8; 64]);
    input.into()
}

pub fn call_tx(n: u64, to: Address, input: Bytes) -> Transaction {
    Transaction {
        hash: hash(n),
        to: Some(to),
        input,
        ..Default::default()
    }
}

pub fn deploy_tx(n: u64, creation: &str) -> Transaction {
    let mut input: Vec<u8> = creation.parse::<Bytes>().unwrap().to_vec();
    // constructor arguments
    input.extend_from_slice(&[0u8; 32]);
    Transaction {
        hash: hash(n),
        to: None,
        input: input.into(),
        ..Default::default()
    }
}

pub fn receipt(n: u64, gas_used: u64, contract_address: Option<Address>) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: hash(n),
        status: Some(U64::from(1)),
        gas_used: Some(U256::from(gas_used)),
        contract_address,
        ..Default::default()
    }
}

pub fn failed_receipt(n: u64, gas_used: u64) -> TransactionReceipt {
    TransactionReceipt {
        status: Some(U64::zero()),
        ..receipt(n, gas_used, None)
    }
}
