use serde::Serialize;
use tracing::{info, warn};

use crate::invoker::{Query, WalletBackend};
use crate::keypairs::Keypair;
use crate::parser::{parse_account_output, to_float};

/// Balances for one keypair as of this run. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceSnapshot {
    pub keypair: String,
    #[serde(skip)]
    pub name: String,
    pub address: Option<String>,
    pub ore_balance: f64,
    pub sol_balance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BalanceSnapshot {
    fn empty(keypair: &Keypair) -> Self {
        BalanceSnapshot {
            keypair: keypair.path().display().to_string(),
            name: keypair.name(),
            address: None,
            ore_balance: 0.0,
            sol_balance: 0.0,
            note: None,
            error: None,
        }
    }

    /// Text for the table's last column: the note wins over the error.
    pub fn remark(&self) -> &str {
        self.note
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Totals {
    pub ore: f64,
    pub sol: f64,
}

impl Totals {
    pub fn of(snapshots: &[BalanceSnapshot]) -> Self {
        snapshots.iter().fold(Totals::default(), |acc, s| Totals {
            ore: acc.ore + s.ore_balance,
            sol: acc.sol + s.sol_balance,
        })
    }
}

/// Query one keypair. Failures end up in `error`, never as an `Err`.
pub fn fetch_snapshot<W: WalletBackend + ?Sized>(wallet: &W, keypair: &Keypair) -> BalanceSnapshot {
    let mut snapshot = BalanceSnapshot::empty(keypair);

    match wallet.query(Query::Account, keypair.path()) {
        Ok(output) => {
            let fields = parse_account_output(Some(&output));
            snapshot.ore_balance = to_float(fields.ore.as_deref());
            snapshot.sol_balance = to_float(fields.sol.as_deref());
            snapshot.address = fields.address;
            snapshot.note = fields.note;
            info!(
                keypair = %snapshot.name,
                ore = snapshot.ore_balance,
                sol = snapshot.sol_balance,
                "fetched balance"
            );
        }
        Err(e) => {
            warn!(keypair = %snapshot.name, kind = e.kind(), error = %e, "balance query failed");
            snapshot.error = Some(e.to_string());
        }
    }
    snapshot
}

/// One query per keypair, in order.
pub fn collect_snapshots<W: WalletBackend + ?Sized>(
    wallet: &W,
    keypairs: &[Keypair],
) -> Vec<BalanceSnapshot> {
    keypairs.iter().map(|kp| fetch_snapshot(wallet, kp)).collect()
}
