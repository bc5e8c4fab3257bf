//! Balance queries for ORE keypairs through the `ore` wallet binary.
//!
//! The wallet is run once per keypair and its coloured, human-readable
//! output is scraped into [`BalanceSnapshot`]s. The rewards tool builds on
//! the same invoker and keypair discovery.

pub mod cli;
pub mod config;
pub mod error;
pub mod invoker;
pub mod keypairs;
pub mod logging;
pub mod parser;
pub mod report;
pub mod snapshot;

pub use error::WalletError;
pub use invoker::{Query, WalletBackend, WalletCli};
pub use keypairs::{Keypair, KeypairSource};
pub use snapshot::{collect_snapshots, fetch_snapshot, BalanceSnapshot, Totals};
