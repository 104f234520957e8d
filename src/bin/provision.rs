use alloy_primitives::{Address, U256};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use signet::config::LedgerConfig;
use signet::crypto::KeyPair;
use signet::encoding::{CallPayload, CanonicalSerialize};
use signet::error::SignetError;
use signet::factory::{deterministic, install_prototypes};
use signet::ledger::{Call, Ledger};

/// Provision a batch of identity/controller pairs on a fresh in-memory
/// ledger and print their derived addresses.
#[derive(Parser)]
#[command(name = "provision")]
#[command(about = "Deploy identity/controller pairs through a deterministic factory", long_about = None)]
struct Args {
    /// How many pairs to provision
    #[arg(long, default_value_t = 3)]
    pairs: u64,
    /// Recovery address shared by the batch (defaults to a fresh key)
    #[arg(long)]
    recovery: Option<Address>,
    /// Optional TOML config path (created with defaults if missing)
    #[arg(long)]
    config: Option<String>,
    /// Write the resulting ledger state to this JSON file
    #[arg(long)]
    out: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Provisioning failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), SignetError> {
    let config = match &args.config {
        Some(path) => LedgerConfig::load_or_default(path),
        None => LedgerConfig::default(),
    };

    let owner = KeyPair::generate();
    let owner_addr = owner.address();
    let recovery = args
        .recovery
        .unwrap_or_else(|| KeyPair::generate().address());
    info!(owner = %owner_addr, recovery = %recovery, pairs = args.pairs, "provisioning");

    let mut ledger = Ledger::new(config);
    ledger.register_account(owner_addr, U256::ZERO)?;

    let protos = install_prototypes(&mut ledger, owner_addr)?;
    let factory = deterministic::install(&mut ledger, owner_addr, protos)?;

    let costs = &ledger.config.costs;
    let budget = costs.base_call + args.pairs * costs.pair_cost();
    let receipt = ledger.execute(
        Call {
            caller: owner_addr,
            target: factory,
            value: U256::ZERO,
            payload: CallPayload::DeployMulti { recovery }.to_bytes(),
        },
        budget,
    )?;

    println!("Factory: {}", factory);
    println!("Owner:   {} (secret in memory only)", owner_addr);
    println!(
        "Spent:   {} budget units for {} pairs\n",
        receipt.budget_spent, args.pairs
    );
    for n in 0..args.pairs {
        let (identity, controller) = deterministic::nth_pair(factory, n);
        println!("pair {}: identity {} controller {}", n, identity, controller);
    }

    if let Some(path) = &args.out {
        ledger.save_to_json(path)?;
        println!("\n✓ Ledger state written to {}", path);
    }
    Ok(())
}
