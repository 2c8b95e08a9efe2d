//! # Contract Artifacts
//!
//! Source of contract identities for the catalog: name, creation bytecode, runtime
//! bytecode and the method signatures exposed by the ABI.
//!
//! Artifacts are read from compiler output JSON. Both the flat Truffle/Hardhat layout
//! (`"bytecode": "0x..."`) and the Foundry layout (`"bytecode": { "object": "0x..." }`)
//! are accepted. JSON files without an `abi` (debug files, build info) are skipped.

use crate::bytecode::{BytecodePattern, Selector};
use crate::error::ArtifactError;
use ethers::abi::Abi;
use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One ABI function as seen by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    /// Short name, e.g. `transfer`
    pub name: String,
    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub signature: String,
    pub selector: Selector,
}

impl MethodSignature {
    /// Builds a method from its canonical signature; the selector is derived with keccak256.
    pub fn new(name: impl Into<String>, signature: impl Into<String>) -> Self {
        let signature = signature.into();
        let selector = ethers::utils::id(&signature);
        Self {
            name: name.into(),
            signature,
            selector,
        }
    }

    fn from_function(function: &ethers::abi::Function) -> Self {
        let inputs: Vec<String> = function.inputs.iter().map(|p| p.kind.to_string()).collect();
        Self {
            name: function.name.clone(),
            signature: format!("{}({})", function.name, inputs.join(",")),
            selector: function.short_signature(),
        }
    }
}

/// Compiled contract as consumed by [`crate::catalog::Catalog`].
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub name: String,
    pub bytecode: BytecodePattern,
    pub deployed_bytecode: BytecodePattern,
    pub methods: Vec<MethodSignature>,
}

impl ContractArtifact {
    pub fn new(
        name: impl Into<String>,
        bytecode: BytecodePattern,
        deployed_bytecode: BytecodePattern,
        methods: Vec<MethodSignature>,
    ) -> Self {
        Self {
            name: name.into(),
            bytecode,
            deployed_bytecode,
            methods,
        }
    }

    /// Parses a single artifact file.
    ///
    /// Returns `Ok(None)` for JSON that is not a contract artifact.
    pub fn from_json(path: &Path, raw: &str) -> Result<Option<Self>, ArtifactError> {
        let parsed: RawArtifact = serde_json::from_str(raw).map_err(|source| ArtifactError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let Some(abi_value) = parsed.abi else {
            debug!("Skipping {} (no abi)", path.display());
            return Ok(None);
        };

        let name = parsed
            .contract_name
            .or_else(|| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(|s| s.to_string())
            })
            .ok_or_else(|| ArtifactError::MissingField {
                path: path.to_path_buf(),
                field: "contractName",
            })?;

        let abi: Abi = serde_json::from_value(abi_value).map_err(|source| ArtifactError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let bytecode = parsed
            .bytecode
            .ok_or_else(|| ArtifactError::MissingField {
                path: path.to_path_buf(),
                field: "bytecode",
            })
            .and_then(|field| parse_pattern(&name, field.as_hex()))?;
        let deployed_bytecode = parsed
            .deployed_bytecode
            .ok_or_else(|| ArtifactError::MissingField {
                path: path.to_path_buf(),
                field: "deployedBytecode",
            })
            .and_then(|field| parse_pattern(&name, field.as_hex()))?;

        let methods = abi.functions().map(MethodSignature::from_function).collect();

        Ok(Some(Self {
            name,
            bytecode,
            deployed_bytecode,
            methods,
        }))
    }
}

fn parse_pattern(contract: &str, hex_str: &str) -> Result<BytecodePattern, ArtifactError> {
    hex_str
        .parse()
        .map_err(|e: hex::FromHexError| ArtifactError::InvalidBytecode {
            contract: contract.to_string(),
            reason: e.to_string(),
        })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    #[serde(default)]
    contract_name: Option<String>,
    #[serde(default)]
    abi: Option<serde_json::Value>,
    #[serde(default)]
    bytecode: Option<BytecodeField>,
    #[serde(default)]
    deployed_bytecode: Option<BytecodeField>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    Hex(String),
    Object { object: String },
}

impl BytecodeField {
    fn as_hex(&self) -> &str {
        match self {
            BytecodeField::Hex(s) => s,
            BytecodeField::Object { object } => object,
        }
    }
}

/// Loads every artifact under `dir` (recursively), in path order.
///
/// Path order matters: it is the catalog registration order used to break ties in
/// method-signature fallback resolution.
pub fn load_artifacts(dir: &Path) -> Result<Vec<ContractArtifact>, ArtifactError> {
    let mut files = collect_json_files(dir)?;
    files.sort();

    let mut artifacts = Vec::new();
    for path in files {
        let raw = fs::read_to_string(&path).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;
        if let Some(artifact) = ContractArtifact::from_json(&path, &raw)? {
            artifacts.push(artifact);
        }
    }

    debug!("Loaded {} artifacts from {}", artifacts.len(), dir.display());
    Ok(artifacts)
}

fn collect_json_files(dir: &Path) -> Result<Vec<PathBuf>, ArtifactError> {
    // An absent directory is a configuration error, not an empty catalog.
    fs::metadata(dir).map_err(|source| ArtifactError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let pattern = format!("{}/**/*.json", glob::Pattern::escape(&dir.to_string_lossy()));
    let entries = glob::glob(&pattern).map_err(|source| ArtifactError::Pattern {
        pattern: pattern.clone(),
        source,
    })?;

    entries
        .map(|entry| {
            entry.map_err(|e| ArtifactError::Io {
                path: e.path().to_path_buf(),
                source: e.into_error(),
            })
        })
        .filter(|entry| entry.as_ref().map_or(true, |path| path.is_file()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN_ARTIFACT: &str = r#"{
        "contractName": "Token",
        "abi": [
            {
                "type": "function",
                "name": "transfer",
                "inputs": [
                    { "name": "to", "type": "address" },
                    { "name": "amount", "type": "uint256" }
                ],
                "outputs": [{ "name": "", "type": "bool" }],
                "stateMutability": "nonpayable"
            },
            {
                "type": "event",
                "name": "Transfer",
                "inputs": [],
                "anonymous": false
            }
        ],
        "bytecode": "0xaabb",
        "deployedBytecode": "0xccdd"
    }"#;

    #[test]
    fn test_method_signature_selector() {
        let method = MethodSignature::new("transfer", "transfer(address,uint256)");
        assert_eq!(method.selector, [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn test_parse_truffle_artifact() {
        let artifact = ContractArtifact::from_json(Path::new("Token.json"), TOKEN_ARTIFACT)
            .unwrap()
            .unwrap();
        assert_eq!(artifact.name, "Token");
        assert_eq!(artifact.bytecode.len(), 2);
        assert_eq!(artifact.deployed_bytecode.len(), 2);
        assert_eq!(artifact.methods.len(), 1);
        assert_eq!(artifact.methods[0].signature, "transfer(address,uint256)");
        assert_eq!(artifact.methods[0].selector, [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn test_parse_foundry_artifact_uses_file_stem() {
        let raw = r#"{
            "abi": [],
            "bytecode": { "object": "0x6080" },
            "deployedBytecode": { "object": "0x6080" }
        }"#;
        let artifact = ContractArtifact::from_json(Path::new("out/Vault.json"), raw)
            .unwrap()
            .unwrap();
        assert_eq!(artifact.name, "Vault");
        assert!(artifact.methods.is_empty());
    }

    #[test]
    fn test_non_artifact_json_is_skipped() {
        let raw = r#"{ "_format": "hh-sol-dbg-1", "buildInfo": "../x.json" }"#;
        let parsed = ContractArtifact::from_json(Path::new("Token.dbg.json"), raw).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn test_missing_bytecode_is_fatal() {
        let raw = r#"{ "contractName": "Broken", "abi": [] }"#;
        let err = ContractArtifact::from_json(Path::new("Broken.json"), raw).unwrap_err();
        assert!(matches!(err, ArtifactError::MissingField { field: "bytecode", .. }));
    }

    #[test]
    fn test_invalid_bytecode_is_fatal() {
        let raw = r#"{ "contractName": "Broken", "abi": [], "bytecode": "0xzz", "deployedBytecode": "0x" }"#;
        let err = ContractArtifact::from_json(Path::new("Broken.json"), raw).unwrap_err();
        assert!(matches!(err, ArtifactError::InvalidBytecode { .. }));
    }

    #[test]
    fn test_collect_json_files_walks_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("contracts").join("Token.sol");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(dir.path().join("bundle.json")).unwrap();
        fs::write(nested.join("Token.json"), "{}").unwrap();
        fs::write(dir.path().join("Vault.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let mut files = collect_json_files(dir.path()).unwrap();
        files.sort();
        assert_eq!(
            files,
            vec![dir.path().join("Vault.json"), nested.join("Token.json")]
        );
    }

    #[test]
    fn test_collect_json_files_requires_directory() {
        let err = collect_json_files(Path::new("/nonexistent/artifacts")).unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }
}
