//! # Gas Attribution SDK
//!
//! Attributes gas usage observed on chain to the contracts and methods that caused it.
//! Given a catalog of known contract artifacts and a block range, the SDK walks every
//! transaction, decides which contract (and which method) it belongs to, and aggregates
//! per-method and per-deployment gas statistics for an external reporter to render.
//!
//! ## Overview
//!
//! - **Catalog**: contract artifacts become method and deployment records
//! - **Ledger**: append-only gas samples, a per-unit address cache, unresolved-call count
//! - **Identity resolution**: ranked heuristics for proxies, factory deployments and
//!   unknown targets
//! - **Block scanning**: fetch blocks and receipts, skip failed transactions, optionally
//!   price L1 calldata through a fee oracle
//!
//! ## Architecture
//!
//! ### Scanning
//! [`scanner::GasWatcher`] fetches a block range concurrently and aggregates it in a
//! single ordered stage. A scan either completes or fails as a whole.
//!
//! ### Resolution
//! [`resolver::IdentityResolver`] tries direct binding, proxy resolution, deployed
//! bytecode and method-signature fallback, in that order.
//!
//! ### Reporting
//! [`ledger::GasLedger::finalize`] produces a [`report::GasReport`] snapshot. Test
//! harnesses that cannot await drive everything through [`reporter::GasReporter`].

// Catalog & Data Model
/// Selector extraction and bytecode patterns with linker placeholders
pub mod bytecode;
/// Contract artifact loading
pub mod artifacts;
/// Method/deployment catalog
pub mod catalog;
/// Gas ledger (records, address cache)
pub mod ledger;
/// Finalized statistics and cost conversion
pub mod report;
/// Common types and conversions
pub mod types;

// Attribution Pipeline
/// Identity resolution strategies
pub mod resolver;
/// Block scanner
pub mod scanner;
/// Synchronous lifecycle bridge
pub mod reporter;
/// L1 calldata fee oracle
pub mod fee_oracle;

// Infrastructure
/// Chain query interface and ethers-backed client
pub mod chain;
/// Error types
pub mod error;
/// Metrics and observability
pub mod metrics;

// Contracts (Public ABIs Only)
/// Smart contract ABIs
pub mod contracts;

// Settings & Configuration
/// Configuration management
pub mod settings;

// Re-exports for convenience
pub use catalog::Catalog;
pub use chain::{ChainClient, MiddlewareClient};
pub use ledger::GasLedger;
pub use report::GasReport;
pub use reporter::GasReporter;
pub use resolver::IdentityResolver;
pub use scanner::GasWatcher;
pub use settings::Settings;
