//! Error types for the attribution pipeline.
//!
//! Unresolvable attribution is not an error: it is counted by the ledger. Everything
//! here is a real failure that the caller must be able to tell apart from a scan that
//! succeeded with unresolved calls.

use ethers::types::H256;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single chain query.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("rpc `{method}` failed: {message}")]
    Rpc { method: &'static str, message: String },
    #[error("rpc `{method}` timed out after {after_ms}ms")]
    Timeout { method: &'static str, after_ms: u64 },
}

/// A scan either completes for the whole range or fails with one of these.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to fetch block {block}: {source}")]
    Block {
        block: u64,
        #[source]
        source: ChainError,
    },
    #[error("failed to fetch receipt for tx {tx:?} in block {block}: {source}")]
    Receipt {
        block: u64,
        tx: H256,
        #[source]
        source: ChainError,
    },
    #[error("no receipt for tx {tx:?} in block {block}")]
    MissingReceipt { block: u64, tx: H256 },
    #[error("L1 fee oracle failed for tx {tx:?} in block {block}: {source}")]
    FeeOracle {
        block: u64,
        tx: H256,
        #[source]
        source: ChainError,
    },
    #[error("gas used by tx {tx:?} in block {block} does not fit in 64 bits")]
    GasOverflow { block: u64, tx: H256 },
    #[error("failed to fetch tx {tx:?}: {source}")]
    Transaction {
        tx: H256,
        #[source]
        source: ChainError,
    },
    #[error("tx {tx:?} not found")]
    MissingTransaction { tx: H256 },
}

/// Malformed or unreadable contract artifacts. Raised before any scanning begins.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifacts at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid artifact json in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid artifact search pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("artifact {path} is missing `{field}`")]
    MissingField { path: PathBuf, field: &'static str },
    #[error("invalid bytecode for contract {contract}: {reason}")]
    InvalidBytecode { contract: String, reason: String },
}

/// Errors surfaced by the synchronous reporter bridge.
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("run has not been started")]
    RunNotStarted,
}
