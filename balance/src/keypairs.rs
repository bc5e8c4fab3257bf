use std::path::{Path, PathBuf};

use glob::{glob_with, MatchOptions, Pattern};
use tracing::debug;

use crate::config::KEYPAIR_EXTENSION;
use crate::error::WalletError;

/// A wallet key file. Only ever handed to the wallet binary as a path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Keypair {
    path: PathBuf,
}

impl Keypair {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Keypair { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File base name, used as the row label and the reward map key.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Where to find keypairs: one explicit file, or every `*.json` in a directory.
#[derive(Debug, Clone)]
pub enum KeypairSource {
    Single(PathBuf),
    Dir(PathBuf),
}

impl KeypairSource {
    pub fn from_args(single: Option<PathBuf>, dir: PathBuf) -> Self {
        match single {
            Some(path) => KeypairSource::Single(path),
            None => KeypairSource::Dir(dir),
        }
    }

    /// Sorted by path. An empty (or unreadable) directory is a config failure.
    pub fn discover(&self) -> Result<Vec<Keypair>, WalletError> {
        let dir = match self {
            KeypairSource::Single(path) => return Ok(vec![Keypair::new(path)]),
            KeypairSource::Dir(dir) => dir,
        };
        let pattern = Path::new(&Pattern::escape(&dir.to_string_lossy()))
            .join(format!("*.{}", KEYPAIR_EXTENSION))
            .to_string_lossy()
            .into_owned();

        // Dot-files are skipped, like a shell glob.
        let options = MatchOptions {
            require_literal_leading_dot: true,
            ..MatchOptions::new()
        };
        let paths = glob_with(&pattern, options).map_err(|e| {
            WalletError::Config(format!("bad keypair pattern {}: {}", pattern, e))
        })?;

        let mut keypairs = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => keypairs.push(Keypair::new(path)),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "skipping unreadable keypair entry"),
            }
        }

        if keypairs.is_empty() {
            return Err(WalletError::Config(format!("no keypairs found: {}", pattern)));
        }
        keypairs.sort();
        debug!(count = keypairs.len(), dir = %dir.display(), "discovered keypairs");
        Ok(keypairs)
    }
}
