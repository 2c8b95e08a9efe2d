use crate::report::Pricing;
use config::{Config, ConfigError, File};
use ethers::types::Address;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone)]
pub struct Rpc {
    #[serde(default = "default_rpc_url")]
    pub url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for Rpc {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Artifacts {
    #[serde(default = "default_artifacts_dir")]
    pub dir: PathBuf,
    /// Contract names never entered into the catalog
    #[serde(default)]
    pub exclude_contracts: Vec<String>,
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

impl Default for Artifacts {
    fn default() -> Self {
        Self {
            dir: default_artifacts_dir(),
            exclude_contracts: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProxyResolverKind {
    /// Implementation is the only catalog contract exposing the selector
    #[default]
    UniqueSelector,
    /// EtherRouter proxies: `resolver()` then `lookup(bytes4)`
    EtherRouter,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Reporter {
    #[serde(default = "default_block_limit")]
    pub block_limit: u64,
    #[serde(default = "default_false")]
    pub show_all_entries: bool,
    #[serde(default = "default_false")]
    pub show_method_sig: bool,
    #[serde(default = "default_false")]
    pub include_failed_transactions: bool,
    /// Transactions are pushed by the caller instead of scanned at end of run
    #[serde(default = "default_false")]
    pub collected_outside: bool,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub proxy_resolver: ProxyResolverKind,
}

fn default_false() -> bool {
    false
}
fn default_block_limit() -> u64 {
    6_718_946
}
fn default_max_concurrency() -> usize {
    4
}

impl Default for Reporter {
    fn default() -> Self {
        Self {
            block_limit: default_block_limit(),
            show_all_entries: default_false(),
            show_method_sig: default_false(),
            include_failed_transactions: default_false(),
            collected_outside: default_false(),
            max_concurrency: default_max_concurrency(),
            proxy_resolver: ProxyResolverKind::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PricingSettings {
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_token")]
    pub token: String,
    #[serde(default)]
    pub gas_price_gwei: Option<Decimal>,
    #[serde(default)]
    pub token_price: Option<Decimal>,
}

fn default_currency() -> String {
    "EUR".to_string()
}
fn default_token() -> String {
    "ETH".to_string()
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            token: default_token(),
            gas_price_gwei: None,
            token_price: None,
        }
    }
}

impl PricingSettings {
    /// Quotes are only usable when both prices are present.
    pub fn quotes(&self) -> Option<Pricing> {
        Some(Pricing {
            currency: self.currency.clone(),
            token: self.token.clone(),
            gas_price_gwei: self.gas_price_gwei?,
            token_price: self.token_price?,
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct L1Fee {
    #[serde(default = "default_false")]
    pub enabled: bool,
    /// Chain hosting the oracle; defaults to `rpc.url` when unset
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default = "default_oracle_address")]
    pub oracle_address: Address,
}

fn default_oracle_address() -> Address {
    // OVM GasPriceOracle predeploy
    Address::from_str("0x420000000000000000000000000000000000000F").unwrap_or_default()
}

impl Default for L1Fee {
    fn default() -> Self {
        Self {
            enabled: default_false(),
            rpc_url: None,
            oracle_address: default_oracle_address(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Scan {
    #[serde(default)]
    pub from_block: Option<u64>,
    /// Latest block when unset
    #[serde(default)]
    pub to_block: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub enum LogFormat {
    #[serde(rename = "json")]
    Json,
    #[default]
    #[serde(rename = "pretty")]
    Pretty,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub rpc: Rpc,
    #[serde(default)]
    pub artifacts: Artifacts,
    #[serde(default)]
    pub reporter: Reporter,
    #[serde(default)]
    pub pricing: PricingSettings,
    #[serde(default)]
    pub l1_fee: L1Fee,
    #[serde(default)]
    pub scan: Scan,
    #[serde(default)]
    pub log: LogSettings,
}

impl Settings {
    /// Loads `Config.toml` from the working directory, then applies env overrides.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_path("Config.toml")
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;
        settings.apply_env_overrides()?;
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(url) = non_empty_env("GAS_REPORTER_RPC_URL") {
            self.rpc.url = url;
        }
        if let Some(url) = non_empty_env("GAS_REPORTER_L1_FEE_RPC_URL") {
            self.l1_fee.rpc_url = Some(url);
        }
        if let Some(raw) = non_empty_env("GAS_REPORTER_GAS_PRICE_GWEI") {
            self.pricing.gas_price_gwei = Some(parse_decimal("GAS_REPORTER_GAS_PRICE_GWEI", &raw)?);
        }
        if let Some(raw) = non_empty_env("GAS_REPORTER_TOKEN_PRICE") {
            self.pricing.token_price = Some(parse_decimal("GAS_REPORTER_TOKEN_PRICE", &raw)?);
        }
        Ok(())
    }

    /// RPC endpoint for the L1 fee oracle.
    pub fn l1_fee_rpc_url(&self) -> &str {
        self.l1_fee.rpc_url.as_deref().unwrap_or(&self.rpc.url)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_decimal(key: &str, raw: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(raw).map_err(|e| ConfigError::Message(format!("{}: {}", key, e)))
}
