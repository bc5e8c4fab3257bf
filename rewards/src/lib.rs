//! Reward-delta tracking across runs.
//!
//! Each run asks the wallet for every keypair's cumulative reward, diffs it
//! against the last value seen for that keypair, and compares the overall
//! total with the previous run to get a rewards-per-second rate.

pub mod state;
pub mod tracker;

pub use state::{RewardMap, RunRecord, StateError, StatePaths};
pub use tracker::{run_rewards, RewardLine, RewardRun, RunSummary};
