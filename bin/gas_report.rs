//! # Gas Report
//!
//! Scans a block range and prints per-method and per-deployment gas statistics.
//!
//! ## Overview
//!
//! Everything is driven by `Config.toml` (plus `.env` overrides):
//! - Contract artifacts from `artifacts.dir`
//! - Block range from `scan.from_block` / `scan.to_block` (latest block when unset)
//! - Costs from `pricing.gas_price_gwei` / `pricing.token_price`, when both are set
//!
//! The finalized report is written to stdout as JSON; a human summary goes to stderr.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin gas_report > gas-report.json
//! ```

use anyhow::{Context, Result};
use colored::Colorize;
use gas_attribution_sdk::{
    metrics,
    report::{GasReport, ReportOptions},
    settings::Settings,
    Catalog, GasWatcher,
};
use std::time::Instant;

fn init_logging(settings: &Settings) {
    match settings.log.format {
        #[cfg(feature = "observability")]
        gas_attribution_sdk::settings::LogFormat::Json => {
            let level = settings
                .log
                .level
                .parse::<tracing::Level>()
                .unwrap_or(tracing::Level::INFO);
            tracing_subscriber::fmt().json().with_max_level(level).init();
        }
        _ => {
            env_logger::Builder::new()
                .parse_filters(&settings.log.level)
                .init();
        }
    }
}

fn print_summary(report: &GasReport) {
    eprintln!("\n{}", "⛽ Gas usage".bold());
    eprintln!("═══════════════════════════════════════════════════════════════════");

    for method in &report.methods {
        let label = format!("{}.{}", method.contract, method.method);
        match method.gas {
            Some(gas) => {
                let cost = method
                    .cost
                    .zip(report.pricing.as_ref())
                    .map(|(c, p)| format!(" {} {}", c, p.currency))
                    .unwrap_or_default();
                eprintln!(
                    "  {:<48} min {:>9} max {:>9} avg {:>9} calls {:>5}{}",
                    label,
                    gas.min,
                    gas.max,
                    gas.mean.to_string().green(),
                    gas.calls,
                    cost
                );
            }
            None => eprintln!("  {:<48} {}", label, "no calls".dimmed()),
        }
    }

    if !report.deployments.is_empty() {
        eprintln!("\n{}", "📦 Deployments".bold());
        for deployment in &report.deployments {
            match (deployment.gas, deployment.percent_of_limit) {
                (Some(gas), Some(pct)) => eprintln!(
                    "  {:<48} avg {:>9} ({}% of {})",
                    deployment.name,
                    gas.mean.to_string().green(),
                    pct,
                    report.block_limit
                ),
                _ => eprintln!("  {:<48} {}", deployment.name, "not deployed".dimmed()),
            }
        }
    }

    if report.unresolved_calls > 0 {
        eprintln!(
            "\n{}",
            format!("⚠️ {} calls could not be attributed", report.unresolved_calls).yellow()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let settings = Settings::new().context("failed to load Config.toml")?;
    init_logging(&settings);
    metrics::describe_metrics();

    // 1. Catalog
    let catalog = Catalog::from_settings(&settings)?;
    if catalog.is_empty() {
        log::warn!(
            "⚠️ No contract artifacts found in {}",
            settings.artifacts.dir.display()
        );
    }

    // 2. Watcher
    let mut watcher = GasWatcher::from_settings(&settings, &catalog)?;
    let latest = watcher.chain().block_number().await?;
    let from = settings.scan.from_block.unwrap_or(0);
    let to = settings.scan.to_block.unwrap_or(latest);

    // 3. Scan
    let started = Instant::now();
    let summary = watcher
        .collect_gas_usage(from, to)
        .await
        .with_context(|| format!("scan of blocks {}..={} failed", from, to))?;
    log::info!(
        "📊 {} blocks scanned ({} missing) in {:?}",
        summary.blocks_scanned,
        summary.blocks_missing,
        started.elapsed()
    );

    // 4. Report
    let report = watcher.ledger().finalize(&ReportOptions::from_settings(&settings));
    println!("{}", report.to_json()?);
    print_summary(&report);

    Ok(())
}
