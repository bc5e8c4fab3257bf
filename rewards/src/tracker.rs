use std::fmt::Write;
use std::path::Path;

use chrono::NaiveDateTime;
use ore_balance::parser::parse_reward_output;
use ore_balance::report::RULE_WIDTH;
use ore_balance::{Keypair, Query, WalletBackend, WalletError};
use tracing::{info, warn};

use crate::state::{
    append_run, load_last_run, load_rewards, save_rewards, RewardMap, RunRecord, StateError,
    StatePaths, TIME_FORMAT,
};

/// Reward for one keypair this run and the change since it was last seen.
#[derive(Debug, Clone, PartialEq)]
pub struct KeypairReward {
    pub current: f64,
    pub delta: f64,
}

#[derive(Debug)]
pub struct RewardLine {
    pub name: String,
    pub result: Result<KeypairReward, WalletError>,
}

/// Totals at the previous and current run and the rate between them.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub previous: Option<RunRecord>,
    pub previous_time: NaiveDateTime,
    pub previous_total: f64,
    pub current_time: NaiveDateTime,
    pub current_total: f64,
    pub diff: f64,
    pub elapsed_secs: f64,
    /// ORE per second.
    pub rate: f64,
}

impl RunSummary {
    /// With no previous run the baseline is zero at `now`, and the rate is
    /// taken over one second.
    pub fn new(previous: Option<RunRecord>, current_total: f64, now: NaiveDateTime) -> Self {
        let (previous_time, previous_total) = match &previous {
            Some(record) => (record.time, record.total_rewards),
            None => (now, 0.0),
        };
        let diff = current_total - previous_total;
        let elapsed_secs = (now - previous_time).num_seconds() as f64;
        let rate = diff / elapsed_secs.max(1.0);

        RunSummary {
            previous,
            previous_time,
            previous_total,
            current_time: now,
            current_total,
            diff,
            elapsed_secs,
            rate,
        }
    }

    pub fn record(&self) -> RunRecord {
        RunRecord {
            time: self.current_time,
            total_rewards: self.current_total,
        }
    }
}

#[derive(Debug)]
pub struct RewardRun {
    pub summary: RunSummary,
    pub rewards: RewardMap,
    /// State that couldn't be read or written. The run itself still completed.
    pub state_errors: Vec<StateError>,
}

/// Record `current` for `name` and return how much it moved. Unknown names start at zero.
pub fn apply_reward(rewards: &mut RewardMap, name: &str, current: f64) -> f64 {
    let last = rewards.get(name).copied().unwrap_or(0.0);
    rewards.insert(name.to_string(), current);
    current - last
}

pub fn fetch_reward<W: WalletBackend + ?Sized>(wallet: &W, keypair: &Keypair) -> Result<f64, WalletError> {
    let output = wallet.query(Query::Rewards, keypair.path())?;
    parse_reward_output(&output)
}

/// Query every keypair in order, updating `rewards` in place. Each finished
/// keypair is handed to `on_line` right away. Returns the sum of current rewards.
pub fn collect_rewards<W, F>(
    wallet: &W,
    keypairs: &[Keypair],
    rewards: &mut RewardMap,
    mut on_line: F,
) -> f64
where
    W: WalletBackend + ?Sized,
    F: FnMut(&RewardLine),
{
    let mut total = 0.0;
    for keypair in keypairs {
        let name = keypair.name();
        let result = fetch_reward(wallet, keypair).map(|current| {
            let delta = apply_reward(rewards, &name, current);
            total += current;
            KeypairReward { current, delta }
        });

        match &result {
            Ok(r) => info!(keypair = %name, current = r.current, delta = r.delta, "reward"),
            Err(e) => warn!(keypair = %name, kind = e.kind(), error = %e, "reward query failed"),
        }
        on_line(&RewardLine { name, result });
    }
    total
}

/// One complete reward-delta run: load state, query, summarise, persist.
pub fn run_rewards<W, F>(
    wallet: &W,
    keypairs: &[Keypair],
    paths: &StatePaths,
    now: NaiveDateTime,
    on_line: F,
) -> RewardRun
where
    W: WalletBackend + ?Sized,
    F: FnMut(&RewardLine),
{
    let mut state_errors = Vec::new();

    let previous = load_last_run(&paths.run_log).unwrap_or_else(|e| {
        warn!(error = %e, "ignoring previous run, using zero baseline");
        state_errors.push(e);
        None
    });
    let mut rewards = load_rewards(&paths.reward_map).unwrap_or_else(|e| {
        warn!(error = %e, "ignoring stored rewards");
        state_errors.push(e);
        RewardMap::new()
    });

    let total = collect_rewards(wallet, keypairs, &mut rewards, on_line);
    let summary = RunSummary::new(previous, total, now);

    persist(&paths.reward_map, &mut state_errors, |p| save_rewards(p, &rewards));
    persist(&paths.run_log, &mut state_errors, |p| append_run(p, &summary.record()));

    RewardRun {
        summary,
        rewards,
        state_errors,
    }
}

fn persist<F>(path: &Path, errors: &mut Vec<StateError>, write: F)
where
    F: FnOnce(&Path) -> Result<(), StateError>,
{
    match write(path) {
        Ok(()) => info!(path = %path.display(), "state saved"),
        Err(e) => {
            warn!(error = %e, "failed to save state");
            errors.push(e);
        }
    }
}

pub fn render_line(line: &RewardLine) -> String {
    match &line.result {
        Ok(r) => format!("{:<16} {:>15.9} {:>+16.9}", line.name, r.current, r.delta),
        Err(e) => format!("{:<16} error: {}", line.name, e),
    }
}

pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
    let baseline = if summary.previous.is_some() { "" } else { "  (no previous run)" };
    let _ = writeln!(
        out,
        "Previous  {}  {:.9} ORE{}",
        summary.previous_time.format(TIME_FORMAT),
        summary.previous_total,
        baseline
    );
    let _ = writeln!(
        out,
        "Current   {}  {:.9} ORE",
        summary.current_time.format(TIME_FORMAT),
        summary.current_total
    );
    let _ = writeln!(out, "Change    {:.9} ORE", summary.diff);
    let _ = writeln!(out, "Elapsed   {:.0} s", summary.elapsed_secs);
    let _ = writeln!(out, "Rate      {:.9} ORE/s", summary.rate);
    out
}
