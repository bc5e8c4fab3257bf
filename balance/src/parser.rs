// Turns the human-readable output of the wallet binary into typed fields.
//
// `ore account` prints something like
//
//     Address   7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU
//     Balance   12.500000000 ORE
//     SOL       0.002039280 SOL
//
// usually wrapped in terminal colour codes. `ore rewards` prints a short
// sentence whose second-to-last word is the reward amount.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::WalletError;

/// Note attached to a snapshot whenever the wallet says the account does not exist.
pub const ACCOUNT_NOT_FOUND: &str = "account not found";

/// Raw string captures from `ore account`. Numbers stay as text until `to_float`.
#[derive(Debug, Default, PartialEq, Clone)]
pub struct AccountFields {
    pub address: Option<String>,
    pub ore: Option<String>,
    pub sol: Option<String>,
    pub note: Option<String>,
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    // Patterns are literals below; a failure here is a programming error.
    cell.get_or_init(|| Regex::new(pattern).expect("invalid built-in pattern"))
}

fn ansi_re() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    regex(&CACHED, r"\x1B\[[0-9;]*[A-Za-z]")
}

fn address_re() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    regex(&CACHED, r"(?m)^\s*Address\s+([A-Za-z0-9]+)")
}

fn ore_re() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    regex(&CACHED, r"(?m)^\s*Balance\s+([0-9.]+)\s+ORE\b")
}

fn sol_re() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    regex(&CACHED, r"(?m)^\s*SOL\s+([0-9.]+)\s+SOL\b")
}

fn not_found_re() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    regex(&CACHED, r"(?i)Not\s+found")
}

/// Remove ANSI escape sequences (`ESC [ params letter`). `None` yields an empty string.
pub fn strip_ansi(output: Option<&str>) -> String {
    match output {
        Some(s) => ansi_re().replace_all(s, "").into_owned(),
        None => String::new(),
    }
}

/// Malformed or missing numbers become 0.0 rather than an error.
pub fn to_float(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn parse_account_output(output: Option<&str>) -> AccountFields {
    let clean = strip_ansi(output);

    let note = if not_found_re().is_match(&clean) {
        Some(ACCOUNT_NOT_FOUND.to_string())
    } else {
        None
    };

    AccountFields {
        address: first_capture(address_re(), &clean),
        ore: first_capture(ore_re(), &clean),
        sol: first_capture(sol_re(), &clean),
        note,
    }
}

/// Legacy `rewards` parsing: the second-to-last whitespace token is the amount.
/// Only holds for the exact sentence shape the wallet prints today.
pub fn parse_reward_output(output: &str) -> Result<f64, WalletError> {
    let tokens: Vec<&str> = output.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err(WalletError::Parse(format!(
            "expected at least 2 tokens, got {}",
            tokens.len()
        )));
    }

    let token = tokens[tokens.len() - 2];
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(WalletError::Parse(format!("{:?} is not a number", token))),
    }
}
