use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args};

use crate::config::{default_keypair_dir, DEFAULT_TIMEOUT_SECS, DEFAULT_WALLET_BIN, WALLET_BIN_ENV};
use crate::invoker::WalletCli;
use crate::keypairs::KeypairSource;

/// Options common to every tool that drives the wallet binary.
#[derive(Args, Debug, Clone)]
pub struct WalletArgs {
    /// Single keypair file; skips directory discovery
    #[arg(long)]
    pub keypair: Option<PathBuf>,

    /// Directory scanned for *.json keypairs [default: keypairs/ next to the executable]
    #[arg(long)]
    pub keypairs_dir: Option<PathBuf>,

    /// Seconds before a wallet invocation is killed
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Wallet executable
    #[arg(long, env = WALLET_BIN_ENV, default_value = DEFAULT_WALLET_BIN)]
    pub wallet_bin: PathBuf,

    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl WalletArgs {
    pub fn wallet(&self) -> WalletCli {
        WalletCli::new(&self.wallet_bin, Duration::from_secs(self.timeout))
    }

    pub fn keypair_source(&self) -> KeypairSource {
        let dir = self.keypairs_dir.clone().unwrap_or_else(default_keypair_dir);
        KeypairSource::from_args(self.keypair.clone(), dir)
    }
}
