//! # Gas Report
//!
//! Finalized snapshot of a [`GasLedger`]: per-method and per-deployment statistics,
//! the unresolved-call count and the block limit. Rendering is left to the consumer;
//! the snapshot serializes to JSON.
//!
//! All statistics are order-independent (min, max, truncated integer mean).

use crate::bytecode::selector_hex;
use crate::ledger::GasLedger;
use crate::settings::Settings;
use crate::types::conversions::u256_to_decimal;
use chrono::{DateTime, Utc};
use ethers::types::U256;
use rust_decimal::Decimal;
use serde::Serialize;

const NATIVE_DECIMALS: u8 = 18;

/// Quotes used to convert gas into a currency amount. Fetching them is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pricing {
    pub currency: String,
    pub token: String,
    pub gas_price_gwei: Decimal,
    pub token_price: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Include catalog entries that never received a sample
    pub show_all_entries: bool,
    /// Display methods by full signature instead of short name
    pub show_method_sig: bool,
    pub pricing: Option<Pricing>,
}

impl ReportOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            show_all_entries: settings.reporter.show_all_entries,
            show_method_sig: settings.reporter.show_method_sig,
            pricing: settings.pricing.quotes(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleStats {
    pub min: u64,
    pub max: u64,
    pub mean: u64,
    pub calls: usize,
}

impl SampleStats {
    /// `None` for an empty sample set.
    pub fn from_samples(samples: &[u64]) -> Option<Self> {
        let min = *samples.iter().min()?;
        let max = *samples.iter().max()?;
        let total: u128 = samples.iter().map(|s| *s as u128).sum();
        let mean = (total / samples.len() as u128) as u64;
        Some(Self {
            min,
            max,
            mean,
            calls: samples.len(),
        })
    }

    pub fn is_uniform(&self) -> bool {
        self.min == self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodStats {
    pub contract: String,
    /// Short name or full signature, per [`ReportOptions::show_method_sig`]
    pub method: String,
    pub signature: String,
    pub selector: String,
    pub gas: Option<SampleStats>,
    pub mean_calldata_fee: Option<U256>,
    pub cost: Option<Decimal>,
    pub calldata_cost: Option<Decimal>,
}

impl MethodStats {
    pub fn calls(&self) -> usize {
        self.gas.map_or(0, |g| g.calls)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentStats {
    pub name: String,
    pub gas: Option<SampleStats>,
    /// Mean gas as a percentage of the block limit, one decimal
    pub percent_of_limit: Option<f64>,
    pub mean_calldata_fee: Option<U256>,
    pub cost: Option<Decimal>,
    pub calldata_cost: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GasReport {
    pub generated_at: DateTime<Utc>,
    pub block_limit: u64,
    pub unresolved_calls: u64,
    pub pricing: Option<Pricing>,
    pub methods: Vec<MethodStats>,
    pub deployments: Vec<DeploymentStats>,
}

impl GasReport {
    pub(crate) fn from_ledger(ledger: &GasLedger, options: &ReportOptions) -> Self {
        let pricing = options.pricing.as_ref();

        let mut methods: Vec<MethodStats> = ledger
            .methods()
            .filter(|m| options.show_all_entries || !m.gas_samples.is_empty())
            .map(|m| {
                let gas = SampleStats::from_samples(&m.gas_samples);
                let mean_calldata_fee = mean_fee(&m.calldata_fee_samples);
                MethodStats {
                    contract: m.contract.clone(),
                    method: if options.show_method_sig {
                        m.signature.clone()
                    } else {
                        m.method.clone()
                    },
                    signature: m.signature.clone(),
                    selector: selector_hex(&m.selector),
                    gas,
                    mean_calldata_fee,
                    cost: gas.zip(pricing).map(|(g, p)| gas_to_cost(g.mean, p)),
                    calldata_cost: mean_calldata_fee
                        .zip(pricing)
                        .and_then(|(fee, p)| fee_to_cost(fee, p)),
                }
            })
            .collect();
        methods.sort_by(|a, b| a.contract.cmp(&b.contract).then_with(|| a.method.cmp(&b.method)));

        let mut deployments: Vec<DeploymentStats> = ledger
            .deployments()
            .iter()
            .filter(|d| options.show_all_entries || !d.gas_samples.is_empty())
            .map(|d| {
                let gas = SampleStats::from_samples(&d.gas_samples);
                let mean_calldata_fee = mean_fee(&d.calldata_fee_samples);
                DeploymentStats {
                    name: d.name.clone(),
                    gas,
                    percent_of_limit: gas.map(|g| percent_of_limit(g.mean, ledger.block_limit())),
                    mean_calldata_fee,
                    cost: gas.zip(pricing).map(|(g, p)| gas_to_cost(g.mean, p)),
                    calldata_cost: mean_calldata_fee
                        .zip(pricing)
                        .and_then(|(fee, p)| fee_to_cost(fee, p)),
                }
            })
            .collect();
        deployments.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            generated_at: Utc::now(),
            block_limit: ledger.block_limit(),
            unresolved_calls: ledger.unresolved_calls(),
            pricing: options.pricing.clone(),
            methods,
            deployments,
        }
    }

    pub fn method(&self, contract: &str, method: &str) -> Option<&MethodStats> {
        self.methods
            .iter()
            .find(|m| m.contract == contract && m.method == method)
    }

    pub fn deployment(&self, name: &str) -> Option<&DeploymentStats> {
        self.deployments.iter().find(|d| d.name == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Truncated mean of fee samples.
pub fn mean_fee(samples: &[U256]) -> Option<U256> {
    if samples.is_empty() {
        return None;
    }
    let total = samples
        .iter()
        .fold(U256::zero(), |acc, fee| acc.saturating_add(*fee));
    Some(total / U256::from(samples.len()))
}

/// `gas * gwei * 1e-9 * token_price`, two decimals.
pub fn gas_to_cost(gas: u64, pricing: &Pricing) -> Decimal {
    (Decimal::from(gas) * pricing.gas_price_gwei * Decimal::new(1, 9) * pricing.token_price)
        .round_dp(2)
}

/// Converts a fee in wei into the configured currency, two decimals.
pub fn fee_to_cost(fee_wei: U256, pricing: &Pricing) -> Option<Decimal> {
    let native = u256_to_decimal(fee_wei, NATIVE_DECIMALS).ok()?;
    native
        .checked_mul(pricing.token_price)
        .map(|cost| cost.round_dp(2))
}

/// `round(1000 * gas / limit) / 10`; zero when no limit is configured.
pub fn percent_of_limit(gas: u64, block_limit: u64) -> f64 {
    if block_limit == 0 {
        return 0.0;
    }
    (1000.0 * gas as f64 / block_limit as f64).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{DeploymentRecord, MethodRecord};
    use std::str::FromStr;

    const TRANSFER: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
    const APPROVE: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

    fn ledger() -> GasLedger {
        let mut ledger = GasLedger::new(10_000_000);
        ledger.insert_method(MethodRecord::new(
            "Token",
            "transfer",
            "transfer(address,uint256)",
            TRANSFER,
        ));
        ledger.insert_method(MethodRecord::new(
            "Token",
            "approve",
            "approve(address,uint256)",
            APPROVE,
        ));
        ledger.insert_deployment(DeploymentRecord::new(
            "Token",
            "0xaa".parse().unwrap(),
            "0xbb".parse().unwrap(),
        ));
        ledger.insert_deployment(DeploymentRecord::new(
            "Abstract",
            "0x".parse().unwrap(),
            "0x".parse().unwrap(),
        ));
        ledger
    }

    fn pricing() -> Pricing {
        Pricing {
            currency: "USD".to_string(),
            token: "ETH".to_string(),
            gas_price_gwei: Decimal::from(20),
            token_price: Decimal::from(2000),
        }
    }

    #[test]
    fn test_sample_stats_truncated_mean() {
        let stats = SampleStats::from_samples(&[10, 11, 11]).unwrap();
        assert_eq!(stats.min, 10);
        assert_eq!(stats.max, 11);
        assert_eq!(stats.mean, 10);
        assert_eq!(stats.calls, 3);
        assert!(stats.min <= stats.mean && stats.mean <= stats.max);
        assert!(SampleStats::from_samples(&[]).is_none());
    }

    #[test]
    fn test_sample_stats_order_independent() {
        let a = SampleStats::from_samples(&[51_000, 29_000, 34_500]).unwrap();
        let b = SampleStats::from_samples(&[34_500, 51_000, 29_000]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.mean, 38_166);
    }

    #[test]
    fn test_only_called_entries_by_default() {
        let mut ledger = ledger();
        let mut input = TRANSFER.to_vec();
        input.extend_from_slice(&[0u8; 64]);
        ledger.record_method_sample("Token", &input, 51_000, None);

        let report = ledger.finalize(&ReportOptions::default());
        assert_eq!(report.methods.len(), 1);
        assert_eq!(report.methods[0].method, "transfer");
        assert!(report.deployments.is_empty());
    }

    #[test]
    fn test_show_all_entries_and_signatures() {
        let ledger = ledger();
        let report = ledger.finalize(&ReportOptions {
            show_all_entries: true,
            show_method_sig: true,
            pricing: None,
        });

        let names: Vec<&str> = report.methods.iter().map(|m| m.method.as_str()).collect();
        assert_eq!(names, vec!["approve(address,uint256)", "transfer(address,uint256)"]);
        assert!(report.methods.iter().all(|m| m.gas.is_none() && m.calls() == 0));

        let deployments: Vec<&str> = report.deployments.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(deployments, vec!["Abstract", "Token"]);
    }

    #[test]
    fn test_deployment_percent_and_cost() {
        let mut ledger = ledger();
        ledger.record_deployment_sample(&[0xaa, 0x01], Default::default(), 500_000, None);
        ledger.record_deployment_sample(&[0xaa, 0x02], Default::default(), 700_000, None);

        let report = ledger.finalize(&ReportOptions {
            pricing: Some(pricing()),
            ..Default::default()
        });
        let token = report.deployment("Token").unwrap();
        let gas = token.gas.unwrap();
        assert_eq!((gas.min, gas.max, gas.mean), (500_000, 700_000, 600_000));
        assert_eq!(token.percent_of_limit, Some(6.0));
        // 600k gas * 20 gwei = 0.012 ETH at 2000
        assert_eq!(token.cost, Some(Decimal::from(24)));
        assert_eq!(token.mean_calldata_fee, None);
    }

    #[test]
    fn test_calldata_fee_mean_and_cost() {
        let fees = [
            U256::from(1_000_000_000_000_000u64),
            U256::from(2_000_000_000_000_000u64),
        ];
        let mean = mean_fee(&fees).unwrap();
        assert_eq!(mean, U256::from(1_500_000_000_000_000u64));
        assert_eq!(fee_to_cost(mean, &pricing()), Some(Decimal::from(3)));
        assert_eq!(mean_fee(&[]), None);
    }

    #[test]
    fn test_gas_to_cost_rounding() {
        let cost = gas_to_cost(21_000, &pricing());
        assert_eq!(cost, Decimal::from_str("0.84").unwrap());
    }

    #[test]
    fn test_percent_of_limit() {
        assert_eq!(percent_of_limit(671_895, 6_718_946), 10.0);
        assert_eq!(percent_of_limit(1, 0), 0.0);
    }

    #[test]
    fn test_report_serializes() {
        let report = ledger().finalize(&ReportOptions::default());
        let json = report.to_json().unwrap();
        assert!(json.contains("\"unresolved_calls\": 0"));
        assert!(json.contains("\"block_limit\": 10000000"));
    }
}
