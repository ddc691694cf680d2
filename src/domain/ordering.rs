//! Stable transaction ordering for deterministic replay.

use crate::domain::Transaction;

/// Stable ordering key for transactions.
///
/// Ordering: time_ms -> seq (store-assigned creation sequence). Two events on
/// the same timestamp always resolve by insertion order, so a replay over the
/// log is deterministic regardless of query batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TxOrderingKey {
    pub time_ms: i64,
    pub seq: i64,
}

impl TxOrderingKey {
    pub fn from_tx(tx: &Transaction) -> Self {
        TxOrderingKey {
            time_ms: tx.time_ms.as_i64(),
            seq: tx.seq,
        }
    }
}

/// Sort transactions oldest-first with the deterministic tie-break.
pub fn sort_transactions_deterministic(txs: &mut [Transaction]) {
    txs.sort_by_key(TxOrderingKey::from_tx);
}

/// The most recent transaction by `(time_ms, seq)` descending.
pub fn latest<'a>(txs: &'a [Transaction]) -> Option<&'a Transaction> {
    txs.iter().max_by_key(|tx| TxOrderingKey::from_tx(tx))
}
