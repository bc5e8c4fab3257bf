//! Persisted state between reward runs.
//!
//! * `last_execution.json`: append-only, one [`RunRecord`] JSON object per line.
//! * `keypair_rewards.json`: one JSON object, keypair name to last reward,
//!   rewritten in full every run.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

pub const RUN_LOG_FILE: &str = "last_execution.json";
pub const REWARD_MAP_FILE: &str = "keypair_rewards.json";
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Keypair name to last observed cumulative reward.
pub type RewardMap = BTreeMap<String, f64>;

#[derive(Debug)]
pub enum StateError {
    Io(PathBuf, io::Error),
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    Encode(serde_json::Error),
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::Io(path, e) => write!(f, "IO error on {}: {}", path.display(), e),
            StateError::Corrupt { path, line, reason } => {
                write!(f, "corrupt state in {} line {}: {}", path.display(), line, reason)
            }
            StateError::Encode(e) => write!(f, "failed to encode state: {}", e),
        }
    }
}

impl std::error::Error for StateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StateError::Io(_, e) => Some(e),
            StateError::Encode(e) => Some(e),
            StateError::Corrupt { .. } => None,
        }
    }
}

impl From<serde_json::Error> for StateError {
    fn from(e: serde_json::Error) -> Self {
        StateError::Encode(e)
    }
}

/// Total reward across all keypairs at the end of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    #[serde(with = "local_time")]
    pub time: NaiveDateTime,
    pub total_rewards: f64,
}

mod local_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIME_FORMAT;

    pub fn serialize<S: Serializer>(time: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format(TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Both state files, normally side by side in one directory.
#[derive(Debug, Clone)]
pub struct StatePaths {
    pub run_log: PathBuf,
    pub reward_map: PathBuf,
}

impl StatePaths {
    pub fn in_dir(dir: &Path) -> Self {
        StatePaths {
            run_log: dir.join(RUN_LOG_FILE),
            reward_map: dir.join(REWARD_MAP_FILE),
        }
    }
}

fn io_err(path: &Path, e: io::Error) -> StateError {
    StateError::Io(path.to_path_buf(), e)
}

/// The most recent run. Missing file means no previous run; a last line
/// that doesn't parse is an error, earlier bad lines are skipped.
pub fn load_last_run(path: &Path) -> Result<Option<RunRecord>, StateError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(path, e)),
    };

    let mut last = None;
    let mut corrupt_tail = None;
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<RunRecord>(line) {
            Ok(record) => {
                last = Some(record);
                corrupt_tail = None;
            }
            Err(e) => {
                debug!(line = idx + 1, error = %e, "skipping bad run record");
                corrupt_tail = Some((idx + 1, e.to_string()));
            }
        }
    }

    match corrupt_tail {
        Some((line, reason)) => Err(StateError::Corrupt {
            path: path.to_path_buf(),
            line,
            reason,
        }),
        None => Ok(last),
    }
}

/// Add one line to the run log, creating it if needed. Earlier lines are never touched.
pub fn append_run(path: &Path, record: &RunRecord) -> Result<(), StateError> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .map_err(|e| io_err(path, e))?;

    if !ends_with_newline(&mut file).map_err(|e| io_err(path, e))? {
        line.insert(0, '\n');
    }

    file.write_all(line.as_bytes()).map_err(|e| io_err(path, e))?;
    file.flush().map_err(|e| io_err(path, e))?;
    Ok(())
}

// An empty file counts as terminated.
fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Missing file is an empty map.
pub fn load_rewards(path: &Path) -> Result<RewardMap, StateError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RewardMap::new()),
        Err(e) => return Err(io_err(path, e)),
    };
    serde_json::from_str(&content).map_err(|e| StateError::Corrupt {
        path: path.to_path_buf(),
        line: e.line(),
        reason: e.to_string(),
    })
}

/// Replace the reward map. Written to a temp file in the same directory and
/// renamed over the old one, so a failed write leaves the previous contents in place.
pub fn save_rewards(path: &Path, rewards: &RewardMap) -> Result<(), StateError> {
    let body = serde_json::to_string_pretty(rewards)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| io_err(path, e))?;
    tmp.write_all(body.as_bytes()).map_err(|e| io_err(path, e))?;
    tmp.as_file().sync_all().map_err(|e| io_err(path, e))?;
    tmp.persist(path).map_err(|e| io_err(path, e.error))?;
    Ok(())
}
