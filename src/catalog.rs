//! # Method/Deployment Catalog
//!
//! Turns contract artifacts into the initial ledger entries: one [`MethodRecord`] per ABI
//! function and one [`DeploymentRecord`] per contract. Construction is pure; the catalog
//! never talks to the chain.

use crate::artifacts::{load_artifacts, ContractArtifact};
use crate::error::ArtifactError;
use crate::ledger::{DeploymentRecord, GasLedger, MethodKey, MethodRecord};
use crate::settings::Settings;
use log::{info, warn};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    artifacts: Vec<ContractArtifact>,
    exclude: HashSet<String>,
}

impl Catalog {
    pub fn new(artifacts: Vec<ContractArtifact>) -> Self {
        Self {
            artifacts,
            exclude: HashSet::new(),
        }
    }

    /// Loads `artifacts.dir` and applies `artifacts.exclude_contracts`.
    pub fn from_settings(settings: &Settings) -> Result<Self, ArtifactError> {
        let artifacts = load_artifacts(&settings.artifacts.dir)?;
        let catalog =
            Self::new(artifacts).excluding(settings.artifacts.exclude_contracts.iter().cloned());
        info!(
            "📚 Catalog loaded: {} contracts from {}",
            catalog.len(),
            settings.artifacts.dir.display()
        );
        Ok(catalog)
    }

    pub fn excluding(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.exclude.extend(names);
        self
    }

    /// Contracts that will be entered into the ledger.
    pub fn contracts(&self) -> impl Iterator<Item = &ContractArtifact> {
        self.artifacts
            .iter()
            .filter(|a| !self.exclude.contains(&a.name))
    }

    pub fn len(&self) -> usize {
        self.contracts().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fresh ledger populated with every catalogued method and deployment.
    ///
    /// A selector appearing twice for the same contract name (overloads hashing to the
    /// same selector, or two artifacts sharing a name) keeps the last registration.
    pub fn build_ledger(&self, block_limit: u64) -> GasLedger {
        let mut ledger = GasLedger::new(block_limit);

        for artifact in self.contracts() {
            for method in &artifact.methods {
                let key = MethodKey::new(artifact.name.clone(), method.selector);
                if let Some(previous) = ledger.method(&key) {
                    warn!(
                        "⚠️ Selector collision on {}: {} replaced by {}",
                        key, previous.signature, method.signature
                    );
                }
                ledger.insert_method(MethodRecord::new(
                    artifact.name.clone(),
                    method.name.clone(),
                    method.signature.clone(),
                    method.selector,
                ));
            }

            ledger.insert_deployment(DeploymentRecord::new(
                artifact.name.clone(),
                artifact.bytecode.clone(),
                artifact.deployed_bytecode.clone(),
            ));
        }

        ledger
    }
}
