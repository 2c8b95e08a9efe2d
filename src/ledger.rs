//! # Gas Ledger
//!
//! Aggregation store for one run: per-method and per-deployment gas samples, the
//! per-unit address cache and the unresolved-call counter.
//!
//! The ledger is single-writer. The scanner owns it for the whole run and appends
//! samples in processing order (block order, then transaction order). Statistics are
//! derived in [`GasLedger::finalize`] and never stored.

use crate::bytecode::{selector_hex, selector_of, BytecodePattern, Selector};
use crate::report::{GasReport, ReportOptions};
use ethers::types::{Address, U256};
use indexmap::IndexMap;
use log::debug;
use std::collections::HashMap;
use std::fmt;

/// Identity of a method record: contract name plus selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey {
    pub contract: String,
    pub selector: Selector,
}

impl MethodKey {
    pub fn new(contract: impl Into<String>, selector: Selector) -> Self {
        Self {
            contract: contract.into(),
            selector,
        }
    }

    /// Key for a call into `contract` with `input`; `None` if the input has no selector.
    pub fn for_call(contract: &str, input: &[u8]) -> Option<Self> {
        selector_of(input).map(|selector| Self::new(contract, selector))
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.contract, selector_hex(&self.selector))
    }
}

/// Samples for one contract method.
#[derive(Debug, Clone)]
pub struct MethodRecord {
    pub contract: String,
    /// Short method name
    pub method: String,
    /// Canonical signature used when `show_method_sig` is set
    pub signature: String,
    pub selector: Selector,
    pub gas_samples: Vec<u64>,
    pub calldata_fee_samples: Vec<U256>,
}

impl MethodRecord {
    pub fn new(
        contract: impl Into<String>,
        method: impl Into<String>,
        signature: impl Into<String>,
        selector: Selector,
    ) -> Self {
        Self {
            contract: contract.into(),
            method: method.into(),
            signature: signature.into(),
            selector,
            gas_samples: Vec::new(),
            calldata_fee_samples: Vec::new(),
        }
    }

    pub fn calls(&self) -> usize {
        self.gas_samples.len()
    }

    fn push(&mut self, gas_used: u64, calldata_fee: Option<U256>) {
        self.gas_samples.push(gas_used);
        if let Some(fee) = calldata_fee {
            self.calldata_fee_samples.push(fee);
        }
    }
}

/// Samples for one deployable contract.
#[derive(Debug, Clone)]
pub struct DeploymentRecord {
    pub name: String,
    /// Creation bytecode, matched as a prefix of deployment input
    pub bytecode: BytecodePattern,
    /// Runtime bytecode, matched against code fetched from the chain
    pub deployed_bytecode: BytecodePattern,
    pub gas_samples: Vec<u64>,
    pub calldata_fee_samples: Vec<U256>,
}

impl DeploymentRecord {
    pub fn new(
        name: impl Into<String>,
        bytecode: BytecodePattern,
        deployed_bytecode: BytecodePattern,
    ) -> Self {
        Self {
            name: name.into(),
            bytecode,
            deployed_bytecode,
            gas_samples: Vec::new(),
            calldata_fee_samples: Vec::new(),
        }
    }

    fn push(&mut self, gas_used: u64, calldata_fee: Option<U256>) {
        self.gas_samples.push(gas_used);
        if let Some(fee) = calldata_fee {
            self.calldata_fee_samples.push(fee);
        }
    }
}

/// Address → contract name bindings, valid for one unit of work.
///
/// Chain state can be reverted between units (snapshots), after which the same
/// address may host a different contract.
#[derive(Debug, Clone, Default)]
pub struct AddressCache {
    names: HashMap<Address, String>,
}

impl AddressCache {
    pub fn get(&self, address: &Address) -> Option<&str> {
        self.names.get(address).map(String::as_str)
    }

    pub fn insert(&mut self, address: Address, name: String) {
        self.names.insert(address, name);
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Owner of every record, the address cache and the unresolved counter.
#[derive(Debug, Clone)]
pub struct GasLedger {
    methods: IndexMap<MethodKey, MethodRecord>,
    deployments: Vec<DeploymentRecord>,
    addresses: AddressCache,
    block_limit: u64,
    unresolved_calls: u64,
}

impl GasLedger {
    pub fn new(block_limit: u64) -> Self {
        Self {
            methods: IndexMap::new(),
            deployments: Vec::new(),
            addresses: AddressCache::default(),
            block_limit,
            unresolved_calls: 0,
        }
    }

    /// Registers a method. An existing record under the same key is replaced.
    pub fn insert_method(&mut self, record: MethodRecord) {
        let key = MethodKey::new(record.contract.clone(), record.selector);
        self.methods.insert(key, record);
    }

    pub fn insert_deployment(&mut self, record: DeploymentRecord) {
        self.deployments.push(record);
    }

    /// Appends a method sample under `(contract, selector(input))`.
    ///
    /// Unknown keys are not an error: the call is counted as unresolved and the
    /// sample is dropped. Returns whether the sample was recorded.
    pub fn record_method_sample(
        &mut self,
        contract: &str,
        input: &[u8],
        gas_used: u64,
        calldata_fee: Option<U256>,
    ) -> bool {
        let record =
            MethodKey::for_call(contract, input).and_then(|key| self.methods.get_mut(&key));
        match record {
            Some(record) => {
                record.push(gas_used, calldata_fee);
                true
            }
            None => {
                debug!("No method record for {} (input {} bytes)", contract, input.len());
                self.unresolved_calls += 1;
                false
            }
        }
    }

    /// Appends a deployment sample to the contract whose creation bytecode prefixes `input`
    /// and binds `contract_address` to it. Unmatched deployments are left unattributed.
    pub fn record_deployment_sample(
        &mut self,
        input: &[u8],
        contract_address: Address,
        gas_used: u64,
        calldata_fee: Option<U256>,
    ) -> Option<&str> {
        let idx = self
            .deployments
            .iter()
            .position(|d| d.bytecode.is_prefix_of(input))?;

        let record = &mut self.deployments[idx];
        record.push(gas_used, calldata_fee);
        self.addresses.insert(contract_address, record.name.clone());
        Some(record.name.as_str())
    }

    pub fn lookup_address(&self, address: &Address) -> Option<&str> {
        self.addresses.get(address)
    }

    pub fn bind_address(&mut self, address: Address, name: impl Into<String>) {
        self.addresses.insert(address, name.into());
    }

    /// Drops every address binding. Called once per unit boundary.
    pub fn reset_address_cache(&mut self) {
        self.addresses.clear();
    }

    /// Counts a call that no resolution strategy could attribute.
    pub fn mark_unresolved(&mut self) {
        self.unresolved_calls += 1;
    }

    pub fn unresolved_calls(&self) -> u64 {
        self.unresolved_calls
    }

    pub fn block_limit(&self) -> u64 {
        self.block_limit
    }

    pub fn has_method(&self, contract: &str, selector: &Selector) -> bool {
        self.methods.contains_key(&MethodKey::new(contract, *selector))
    }

    pub fn method(&self, key: &MethodKey) -> Option<&MethodRecord> {
        self.methods.get(key)
    }

    /// Method records in catalog registration order.
    pub fn methods(&self) -> impl Iterator<Item = &MethodRecord> {
        self.methods.values()
    }

    pub fn deployments(&self) -> &[DeploymentRecord] {
        &self.deployments
    }

    pub fn deployment(&self, name: &str) -> Option<&DeploymentRecord> {
        self.deployments.iter().find(|d| d.name == name)
    }

    /// Contract names exposing `selector`, in catalog registration order, without duplicates.
    pub fn contracts_with_selector(&self, selector: &Selector) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for record in self.methods.values() {
            if &record.selector == selector && !names.contains(&record.contract.as_str()) {
                names.push(record.contract.as_str());
            }
        }
        names
    }

    /// First contract whose runtime bytecode matches `code` (linker placeholders masked).
    pub fn contract_by_deployed_code(&self, code: &[u8]) -> Option<&str> {
        self.deployments
            .iter()
            .find(|d| d.deployed_bytecode.matches_exact(code))
            .map(|d| d.name.as_str())
    }

    /// Computes statistics over everything recorded so far.
    pub fn finalize(&self, options: &ReportOptions) -> GasReport {
        GasReport::from_ledger(self, options)
    }
}
