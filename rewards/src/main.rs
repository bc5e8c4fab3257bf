use std::path::PathBuf;

use anyhow::Result;
use chrono::{Local, Timelike};
use clap::Parser;

use ore_balance::cli::WalletArgs;
use ore_balance::config::base_dir;
use ore_balance::logging::init_tracing;
use ore_rewards::tracker::{render_line, render_summary};
use ore_rewards::{run_rewards, StatePaths};

/// Track ORE reward deltas and the reward rate between runs
#[derive(Parser, Debug)]
#[command(name = "ore-rewards", version, about)]
struct Cli {
    #[command(flatten)]
    wallet: WalletArgs,

    /// Directory holding last_execution.json and keypair_rewards.json [default: next to the executable]
    #[arg(long)]
    state_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.wallet.verbose);

    let keypairs = cli.wallet.keypair_source().discover()?;
    let wallet = cli.wallet.wallet();
    let paths = StatePaths::in_dir(&cli.state_dir.unwrap_or_else(base_dir));

    let now = Local::now().naive_local();
    let now = now.with_nanosecond(0).unwrap_or(now);

    let run = run_rewards(&wallet, &keypairs, &paths, now, |line| {
        println!("{}", render_line(line))
    });
    print!("{}", render_summary(&run.summary));

    for e in &run.state_errors {
        eprintln!("warning: {}", e);
    }
    Ok(())
}
