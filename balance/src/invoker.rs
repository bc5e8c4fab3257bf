use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::WalletError;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// The two wallet subcommands this tool knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    /// `account --keypair <path>`: address and balances.
    Account,
    /// `--keypair <path> rewards`: cumulative reward.
    Rewards,
}

impl Query {
    pub fn args(&self, keypair: &Path) -> Vec<OsString> {
        let keypair = keypair.as_os_str().to_owned();
        match self {
            Query::Account => vec!["account".into(), "--keypair".into(), keypair],
            Query::Rewards => vec!["--keypair".into(), keypair, "rewards".into()],
        }
    }
}

/// Anything that can answer a wallet query for a keypair with its text output.
pub trait WalletBackend {
    fn query(&self, query: Query, keypair: &Path) -> Result<String, WalletError>;
}

/// Captured result of one finished wallet process.
#[derive(Debug)]
pub struct Invocation {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl Invocation {
    /// Exit 0 hands stdout on; anything else becomes a process failure carrying
    /// the trimmed stderr, or `exit=<code>` when stderr is empty.
    pub fn into_output(self) -> Result<String, WalletError> {
        if self.status.success() {
            return Ok(self.stdout);
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return Err(WalletError::ProcessFailure(stderr.to_string()));
        }
        let code = match self.status.code() {
            Some(code) => code.to_string(),
            None => "signal".to_string(),
        };
        Err(WalletError::ProcessFailure(format!("exit={}", code)))
    }
}

/// The external wallet executable, run once per query under a timeout.
#[derive(Debug, Clone)]
pub struct WalletCli {
    program: PathBuf,
    base_args: Vec<OsString>,
    timeout: Duration,
}

impl WalletCli {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        WalletCli {
            program: program.into(),
            base_args: Vec::new(),
            timeout,
        }
    }

    /// Arguments placed before the query arguments, for wrappers in front of the wallet.
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn invoke(&self, query: Query, keypair: &Path) -> Result<Invocation, WalletError> {
        let args = query.args(keypair);
        debug!(program = %self.program.display(), ?args, "running wallet");

        let mut child = Command::new(&self.program)
            .args(&self.base_args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                WalletError::ProcessFailure(format!(
                    "failed to start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        // Drain both pipes on their own threads so a chatty child can't fill a
        // pipe buffer and stall while we wait for it to exit.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        // No deadline when the timeout is too large to represent.
        let deadline = Instant::now().checked_add(self.timeout);

        let status = match wait_with_deadline(&mut child, deadline) {
            Ok(Some(status)) => status,
            Ok(None) => {
                debug!(timeout = ?self.timeout, "wallet timed out, killing it");
                abort(&mut child);
                return Err(WalletError::Timeout);
            }
            Err(e) => {
                abort(&mut child);
                return Err(e.into());
            }
        };

        // A background process left behind by the wallet can hold the pipes
        // open after it exits; the deadline covers reading them too.
        let stdout = collect(&stdout, deadline)?;
        let stderr = collect(&stderr, deadline)?;

        Ok(Invocation {
            status,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}

impl WalletBackend for WalletCli {
    fn query(&self, query: Query, keypair: &Path) -> Result<String, WalletError> {
        self.invoke(query, keypair)?.into_output()
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });
    rx
}

fn collect(rx: &Receiver<Vec<u8>>, deadline: Option<Instant>) -> Result<Vec<u8>, WalletError> {
    let received = match deadline {
        Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
        Ok(buf) => Ok(buf),
        Err(RecvTimeoutError::Timeout) => Err(WalletError::Timeout),
        // Reader thread died; treat the stream as empty.
        Err(RecvTimeoutError::Disconnected) => Ok(Vec::new()),
    }
}

/// Kill and reap, ignoring errors: the child may already be gone.
fn abort(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn wait_with_deadline(
    child: &mut Child,
    deadline: Option<Instant>,
) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(None);
                }
                POLL_INTERVAL.min(deadline - now)
            }
            None => POLL_INTERVAL,
        };
        thread::sleep(pause);
    }
}

#[cfg(all(test, unix))]
mod test {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> WalletCli {
        // `sh -c <script> ore <args...>`: the query args land in $1, $2, ...
        WalletCli::new("/bin/sh", timeout).with_base_args(["-c", script, "ore"])
    }

    #[test]
    fn test_query_args() {
        let kp = Path::new("keypairs/a.json");
        assert_eq!(
            Query::Account.args(kp),
            vec![
                OsString::from("account"),
                OsString::from("--keypair"),
                OsString::from("keypairs/a.json")
            ]
        );
        assert_eq!(
            Query::Rewards.args(kp),
            vec![
                OsString::from("--keypair"),
                OsString::from("keypairs/a.json"),
                OsString::from("rewards")
            ]
        );
    }

    #[test]
    fn test_success_passes_args_and_stdout() {
        let cli = sh(r#"echo "$1 $2 $3""#, Duration::from_secs(5));
        let out = cli.query(Query::Account, Path::new("k.json")).unwrap();
        assert_eq!(out, "account --keypair k.json\n");
    }

    #[test]
    fn test_nonzero_exit_uses_stderr() {
        let cli = sh("echo '  boom  ' >&2; exit 3", Duration::from_secs(5));
        let err = cli.query(Query::Account, Path::new("k.json")).unwrap_err();
        assert_eq!(err.kind(), "process-failure");
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_nonzero_exit_without_stderr() {
        let cli = sh("exit 7", Duration::from_secs(5));
        let err = cli.query(Query::Rewards, Path::new("k.json")).unwrap_err();
        assert_eq!(err.to_string(), "exit=7");
    }

    #[test]
    fn test_timeout() {
        let cli = sh("echo partial; sleep 5", Duration::from_millis(200));
        let started = Instant::now();
        let err = cli.query(Query::Account, Path::new("k.json")).unwrap_err();
        assert!(matches!(err, WalletError::Timeout));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_timeout_covers_pipes_held_by_background_process() {
        let cli = sh("sleep 3 & echo 'Balance 1 ORE'", Duration::from_millis(300));
        let started = Instant::now();
        let err = cli.query(Query::Account, Path::new("k.json")).unwrap_err();
        assert!(matches!(err, WalletError::Timeout));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_huge_timeout_means_no_deadline() {
        let cli = sh("echo ok", Duration::from_secs(u64::MAX));
        let out = cli.query(Query::Account, Path::new("k.json")).unwrap();
        assert_eq!(out, "ok\n");
    }

    #[test]
    fn test_abort_kills_and_reaps() {
        let mut child = Command::new("/bin/sh")
            .args(["-c", "sleep 5"])
            .spawn()
            .unwrap();
        let started = Instant::now();
        abort(&mut child);
        assert!(child.try_wait().unwrap().is_some());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let cli = sh(r"printf 'Balance \377 1 ORE'", Duration::from_secs(5));
        let out = cli.query(Query::Account, Path::new("k.json")).unwrap();
        assert!(out.starts_with("Balance "));
        assert!(out.ends_with(" 1 ORE"));
    }

    #[test]
    fn test_missing_binary() {
        let cli = WalletCli::new("/nonexistent/ore-wallet", Duration::from_secs(1));
        let err = cli.query(Query::Account, Path::new("k.json")).unwrap_err();
        assert_eq!(err.kind(), "process-failure");
    }
}
