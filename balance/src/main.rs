use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use ore_balance::cli::WalletArgs;
use ore_balance::logging::init_tracing;
use ore_balance::report::{render_json, render_table};
use ore_balance::collect_snapshots;

/// Fetch ORE & SOL balances for every keypair
#[derive(Parser, Debug)]
#[command(name = "ore-balance", version, about)]
struct Cli {
    #[command(flatten)]
    wallet: WalletArgs,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.wallet.verbose);

    let keypairs = cli.wallet.keypair_source().discover()?;
    let wallet = cli.wallet.wallet();
    info!(count = keypairs.len(), "querying balances");

    let snapshots = collect_snapshots(&wallet, &keypairs);

    if cli.json {
        println!("{}", render_json(&snapshots).context("encoding balances")?);
    } else {
        print!("{}", render_table(&snapshots));
    }
    Ok(())
}
