use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use ore_balance::{Keypair, Query, WalletBackend, WalletError};
use ore_rewards::state::{load_last_run, load_rewards, RUN_LOG_FILE};
use ore_rewards::tracker::render_line;
use ore_rewards::{run_rewards, StatePaths};
use tempfile::TempDir;

/// Wallet whose `rewards` answers can be changed between runs.
struct ScriptedWallet {
    answers: RefCell<HashMap<PathBuf, Result<String, String>>>,
    calls: RefCell<Vec<(Query, PathBuf)>>,
}

impl ScriptedWallet {
    fn new() -> Self {
        ScriptedWallet {
            answers: RefCell::new(HashMap::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn answer(&self, keypair: &str, output: Result<&str, &str>) {
        self.answers.borrow_mut().insert(
            PathBuf::from(keypair),
            output.map(str::to_string).map_err(str::to_string),
        );
    }
}

impl WalletBackend for ScriptedWallet {
    fn query(&self, query: Query, keypair: &Path) -> Result<String, WalletError> {
        self.calls.borrow_mut().push((query, keypair.to_path_buf()));
        match self.answers.borrow().get(keypair) {
            Some(Ok(out)) => Ok(out.clone()),
            Some(Err(msg)) => Err(WalletError::ProcessFailure(msg.clone())),
            None => Err(WalletError::Timeout),
        }
    }
}

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

fn keypairs() -> Vec<Keypair> {
    vec![Keypair::new("keys/a.json"), Keypair::new("keys/b.json")]
}

#[test]
fn test_two_runs_compute_deltas_and_rate() {
    let dir = TempDir::new().unwrap();
    let paths = StatePaths::in_dir(dir.path());
    let wallet = ScriptedWallet::new();

    wallet.answer("keys/a.json", Ok("Rewards: 10 ORE"));
    wallet.answer("keys/b.json", Ok("Rewards: 90 ORE"));
    let first = run_rewards(&wallet, &keypairs(), &paths, t0(), |_| {});
    assert!(first.state_errors.is_empty());
    assert_eq!(first.summary.current_total, 100.0);
    assert_eq!(first.summary.previous, None);

    wallet.answer("keys/a.json", Ok("Rewards: 12.5 ORE"));
    wallet.answer("keys/b.json", Ok("Rewards: 137.5 ORE"));
    let mut lines = Vec::new();
    let second = run_rewards(
        &wallet,
        &keypairs(),
        &paths,
        t0() + Duration::seconds(3600),
        |line| lines.push(render_line(line)),
    );

    assert!(second.state_errors.is_empty());
    assert_eq!(second.summary.previous_total, 100.0);
    assert_eq!(second.summary.current_total, 150.0);
    assert!((second.summary.rate - 50.0 / 3600.0).abs() < 1e-12);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("a.json"));
    assert!(lines[0].ends_with("+2.500000000"));

    let stored = load_rewards(&paths.reward_map).unwrap();
    assert_eq!(stored.get("a.json"), Some(&12.5));
    assert_eq!(stored.get("b.json"), Some(&137.5));

    let log = fs::read_to_string(dir.path().join(RUN_LOG_FILE)).unwrap();
    assert_eq!(log.lines().count(), 2);
    let last = load_last_run(&paths.run_log).unwrap().unwrap();
    assert_eq!(last.total_rewards, 150.0);
    assert_eq!(last.time, t0() + Duration::seconds(3600));

}

#[test]
fn test_failed_keypair_keeps_stale_reward_and_run_continues() {
    let dir = TempDir::new().unwrap();
    let paths = StatePaths::in_dir(dir.path());
    fs::write(&paths.reward_map, r#"{"a.json": 10.0, "b.json": 5.0, "gone.json": 1.0}"#).unwrap();

    let wallet = ScriptedWallet::new();
    wallet.answer("keys/a.json", Err("rpc unavailable"));
    wallet.answer("keys/b.json", Ok("Rewards: 6 ORE"));

    let mut lines = Vec::new();
    let run = run_rewards(&wallet, &keypairs(), &paths, t0(), |line| {
        lines.push((line.name.clone(), line.result.is_ok()))
    });

    assert_eq!(
        lines,
        vec![("a.json".to_string(), false), ("b.json".to_string(), true)]
    );
    assert_eq!(run.summary.current_total, 6.0);
    assert_eq!(run.rewards.get("a.json"), Some(&10.0));
    assert_eq!(run.rewards.get("b.json"), Some(&6.0));
    assert_eq!(run.rewards.get("gone.json"), Some(&1.0));

    let calls = wallet.calls.borrow();
    assert!(calls.iter().all(|(q, _)| *q == Query::Rewards));
    assert_eq!(calls.len(), 2);

}

#[test]
fn test_unparsable_reward_is_reported_inline() {
    let dir = TempDir::new().unwrap();
    let paths = StatePaths::in_dir(dir.path());
    let wallet = ScriptedWallet::new();
    wallet.answer("keys/a.json", Ok("no rewards yet"));
    wallet.answer("keys/b.json", Ok("Rewards: 2 ORE"));

    let mut kinds = Vec::new();
    let run = run_rewards(&wallet, &keypairs(), &paths, t0(), |line| {
        kinds.push(line.result.as_ref().err().map(|e| e.kind()))
    });

    assert_eq!(kinds, vec![Some("parse-failure"), None]);
    assert_eq!(run.summary.current_total, 2.0);

}

#[test]
fn test_corrupt_run_log_falls_back_to_zero_baseline() {
    let dir = TempDir::new().unwrap();
    let paths = StatePaths::in_dir(dir.path());
    fs::write(&paths.run_log, "{\"time\": \"2024-05-01 07:00:00\", \"total_rewards\": 40.0}\nnot json\n").unwrap();

    let wallet = ScriptedWallet::new();
    wallet.answer("keys/a.json", Ok("Rewards: 1 ORE"));
    wallet.answer("keys/b.json", Ok("Rewards: 2 ORE"));

    let run = run_rewards(&wallet, &keypairs(), &paths, t0(), |_| {});
    assert_eq!(run.state_errors.len(), 1);
    assert_eq!(run.summary.previous, None);
    assert_eq!(run.summary.previous_total, 0.0);
    assert_eq!(run.summary.diff, 3.0);

    // The new record is still appended after the bad line.
    let log = fs::read_to_string(&paths.run_log).unwrap();
    assert_eq!(log.lines().count(), 3);
    assert_eq!(load_last_run(&paths.run_log).unwrap().unwrap().total_rewards, 3.0);

}
