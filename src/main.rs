// OVM ETH Genesis Reconciliation
//
// This tool:
// 1. Loads a genesis file and collects the OVM ETH predeploy's balance slots
// 2. Hashes every candidate address to its balance slot and flags hits
// 3. Persists the matched set and writes a genesis carrying those balances forward
//
// Batch order: previous matched set → genesis alloc addresses → --addresses lists

use clap::Parser;
use eyre::WrapErr;
use ovm_genesis_reconcile::{
    address::to_unprefixed_hex, load_address_list, load_matched_addresses,
    save_matched_addresses, AddressBatch, AddressReconciler, Genesis,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(version, about = "Reconcile address lists against OVM ETH balances in a genesis file")]
struct Cli {
    /// Genesis file whose alloc holds the OVM ETH predeploy storage
    #[arg(long, env = "RECONCILE_GENESIS")]
    genesis: PathBuf,

    /// Candidate address lists (.json arrays or delimited text), processed in order
    #[arg(long = "addresses", env = "RECONCILE_ADDRESSES", value_delimiter = ',')]
    addresses: Vec<PathBuf>,

    /// Matched set from an earlier run, processed first
    #[arg(long, env = "RECONCILE_MATCHED_IN")]
    matched_in: Option<PathBuf>,

    /// Where to persist the matched set
    #[arg(long, env = "RECONCILE_MATCHED_OUT")]
    matched_out: Option<PathBuf>,

    /// Where to write the genesis with carried-forward balances
    #[arg(long, env = "RECONCILE_GENESIS_OUT")]
    genesis_out: Option<PathBuf>,

    /// Number of unmatched slots to list in the final summary
    #[arg(long, env = "RECONCILE_SHOW_MISSING", default_value_t = 0)]
    show_missing: usize,
}

fn main() -> eyre::Result<()> {
    enable_tracer()?;
    let cli = Cli::parse();
    run(cli)
}

fn enable_tracer() -> eyre::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()
        .wrap_err("invalid RUST_LOG filter")?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber).wrap_err("tracing subscriber already set")
}

fn run(cli: Cli) -> eyre::Result<()> {
    info!(
        genesis = %cli.genesis.display(),
        lists = cli.addresses.len(),
        matched_in = ?cli.matched_in,
        matched_out = ?cli.matched_out,
        genesis_out = ?cli.genesis_out,
        "reconcile config"
    );

    // ── Genesis ─────────────────────────────────────────────────────────

    let mut genesis = Genesis::load(&cli.genesis)
        .wrap_err_with(|| format!("failed to load genesis {}", cli.genesis.display()))?;
    let mut reconciler = AddressReconciler::from_genesis(&genesis)
        .wrap_err("genesis has nothing to reconcile against")?;
    info!(slots = reconciler.len(), "collected OVM ETH balance slots");

    // ── Batches ─────────────────────────────────────────────────────────

    let mut batches = Vec::new();
    if let Some(path) = &cli.matched_in {
        batches.push(
            load_matched_addresses(path)
                .wrap_err_with(|| format!("failed to load matched set {}", path.display()))?,
        );
    }
    batches.push(AddressBatch::new("genesis alloc", genesis.account_addresses()));
    for path in &cli.addresses {
        batches.push(
            load_address_list(path)
                .wrap_err_with(|| format!("failed to load address list {}", path.display()))?,
        );
    }

    for batch in &batches {
        let report = reconciler.process_batch(batch);
        if report.matched == 0 && !batch.is_empty() {
            warn!(source = %report.source, "batch matched no OVM ETH balances");
        }
    }

    // ── Outputs ─────────────────────────────────────────────────────────

    // Balances are carried forward before any output file is written.
    if cli.genesis_out.is_some() {
        genesis
            .carry_forward_balances(reconciler.matched_addresses())
            .wrap_err("failed to carry forward balances")?;
    }

    if let Some(path) = &cli.matched_out {
        save_matched_addresses(path, reconciler.matched_addresses())
            .wrap_err_with(|| format!("failed to persist matched set {}", path.display()))?;
    }

    if let Some(path) = &cli.genesis_out {
        genesis
            .save(path)
            .wrap_err_with(|| format!("failed to write genesis {}", path.display()))?;
    }

    let counts = reconciler.counts();
    info!(
        found = counts.found,
        missing = counts.missing,
        matched_addresses = reconciler.matched_addresses().len(),
        "reconciliation complete"
    );
    for slot in reconciler.missing_slots().into_iter().take(cli.show_missing) {
        info!(slot = %to_unprefixed_hex(slot.as_slice()), "unmatched OVM ETH balance slot");
    }

    Ok(())
}
