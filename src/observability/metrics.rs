//! Metrics collection.
//!
//! # Metrics
//! - `whitelist_phase_transitions_total` (counter): session transitions by target phase
//! - `whitelist_reads_total` (counter): contract reads by call, outcome
//! - `whitelist_transactions_total` (counter): submitted / confirmed / reverted / rejected
//! - `whitelist_chain_checks_total` (counter): chain verifications by outcome
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - Labels are static strings

use metrics::counter;

pub fn record_phase_transition(to: &'static str) {
    counter!("whitelist_phase_transitions_total", "to" => to).increment(1);
}

pub fn record_read(call: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("whitelist_reads_total", "call" => call, "outcome" => outcome).increment(1);
}

pub fn record_transaction(outcome: &'static str) {
    counter!("whitelist_transactions_total", "outcome" => outcome).increment(1);
}

pub fn record_chain_check(matched: bool) {
    let outcome = if matched { "match" } else { "mismatch" };
    counter!("whitelist_chain_checks_total", "outcome" => outcome).increment(1);
}
