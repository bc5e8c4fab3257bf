use std::{fmt, io};

/// Everything that can go wrong while talking to the wallet binary for one keypair,
/// plus the single run-level failure (no keypairs to work on).
#[derive(Debug)]
pub enum WalletError {
    Timeout,
    ProcessFailure(String),
    Parse(String),
    Io(io::Error),
    Config(String),
}

impl WalletError {
    pub fn kind(&self) -> &'static str {
        match self {
            WalletError::Timeout => "timeout",
            WalletError::ProcessFailure(_) => "process-failure",
            WalletError::Parse(_) => "parse-failure",
            WalletError::Io(_) => "io-failure",
            WalletError::Config(_) => "config-failure",
        }
    }
}

impl From<io::Error> for WalletError {
    fn from(e: io::Error) -> Self {
        WalletError::Io(e)
    }
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletError::Timeout => write!(f, "timeout"),
            WalletError::ProcessFailure(msg) => write!(f, "{}", msg),
            WalletError::Parse(msg) => write!(f, "unparsable wallet output: {}", msg),
            WalletError::Io(e) => write!(f, "IO error: {}", e),
            WalletError::Config(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for WalletError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WalletError::Io(e) => Some(e),
            _ => None,
        }
    }
}
