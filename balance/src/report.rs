use std::fmt::Write;

use crate::snapshot::{BalanceSnapshot, Totals};

/// Width of the horizontal rules in every report.
pub const RULE_WIDTH: usize = 60;

fn row(out: &mut String, name: &str, ore: f64, sol: f64, remark: &str) {
    let _ = writeln!(out, "{:<16} {:>15.9} {:>15.9} {:>16}", name, ore, sol, remark);
}

/// Fixed-width table with a totals row.
pub fn render_table(snapshots: &[BalanceSnapshot]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<16} {:>15} {:>15} {:>16}", "Keypair", "ORE", "SOL", "Note");
    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push('\n');

    for s in snapshots {
        row(&mut out, &s.name, s.ore_balance, s.sol_balance, s.remark());
    }

    let totals = Totals::of(snapshots);
    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push('\n');
    row(&mut out, "Total", totals.ore, totals.sol, "");
    out
}

/// One object for a single keypair, an array otherwise.
pub fn render_json(snapshots: &[BalanceSnapshot]) -> serde_json::Result<String> {
    match snapshots {
        [single] => serde_json::to_string_pretty(single),
        many => serde_json::to_string_pretty(many),
    }
}
