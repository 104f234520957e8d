use alloy_primitives::Address;
use clap::Parser;
use signet::factory::deterministic;

/// Compute the addresses a deterministic factory's deployments occupy,
/// without touching any ledger.
#[derive(Parser)]
#[command(name = "derive_address")]
#[command(about = "Derive instance addresses from a factory address and counter", long_about = None)]
struct Args {
    /// Factory address (0x-prefixed)
    factory: Address,
    /// Deployment counter of the first slot to derive
    #[arg(long, default_value_t = 1)]
    counter: u64,
    /// How many consecutive pairs to print
    #[arg(long, default_value_t = 1)]
    pairs: u64,
}

fn main() {
    let args = Args::parse();

    for n in 0..args.pairs {
        let identity = deterministic::derive_address(args.factory, args.counter + 2 * n);
        let controller = deterministic::derive_address(args.factory, args.counter + 2 * n + 1);
        println!("pair {}: identity {} controller {}", n, identity, controller);
    }
}
