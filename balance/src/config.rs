//! Defaults shared by the balance and rewards tools.

use std::env;
use std::path::PathBuf;

/// Wallet executable, looked up on `PATH` unless overridden.
pub const DEFAULT_WALLET_BIN: &str = "ore";

/// Environment variable overriding `DEFAULT_WALLET_BIN`.
pub const WALLET_BIN_ENV: &str = "ORE_BIN";

/// Seconds a single wallet invocation may run before it is killed.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Directory scanned for keypairs, relative to the executable.
pub const KEYPAIR_DIR: &str = "keypairs";

pub const KEYPAIR_EXTENSION: &str = "json";

/// Directory containing the running executable; falls back to the working directory.
pub fn base_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_keypair_dir() -> PathBuf {
    base_dir().join(KEYPAIR_DIR)
}
