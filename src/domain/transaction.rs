//! Immutable ledger events.

use crate::domain::{AccountId, Decimal, Direction, TimeMs};
use serde::{Deserialize, Serialize};

/// Kind of ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    /// Capital moved into (positive) or out of (negative) the venue account.
    Funding,
    /// Derived profit event (broker owes client).
    Profit,
    /// Derived loss event (client owes broker).
    Loss,
    /// A validated settlement payment.
    Settlement,
    /// Marker for an asserted point-in-time balance.
    BalanceRecord,
}

impl std::fmt::Display for TxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TxKind::Funding => "funding",
            TxKind::Profit => "profit",
            TxKind::Loss => "loss",
            TxKind::Settlement => "settlement",
            TxKind::BalanceRecord => "balance_record",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for TxKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "funding" => Ok(TxKind::Funding),
            "profit" => Ok(TxKind::Profit),
            "loss" => Ok(TxKind::Loss),
            "settlement" => Ok(TxKind::Settlement),
            "balance_record" => Ok(TxKind::BalanceRecord),
            other => Err(format!("unknown transaction kind: {}", other)),
        }
    }
}

/// An immutable event in an account's transaction log.
///
/// `seq` is the store-assigned creation sequence (0 before insertion). The
/// canonical ordering key is `(time_ms, seq)`; ties on `time_ms` are always
/// broken by insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Stable unique identifier for this event.
    ///
    /// Priority: external `reference` (if present) > hash of deterministic fields.
    pub event_key: String,
    #[serde(skip, default)]
    pub seq: i64,
    pub account_id: AccountId,
    pub kind: TxKind,
    pub time_ms: TimeMs,
    /// Signed magnitude: signed capital for funding, |net| for profit/loss,
    /// payment amount for settlements, asserted balance for markers.
    pub amount: Decimal,
    /// Client-facing share (total share for profit/loss, paid amount for settlements).
    pub client_share: Decimal,
    /// Broker's cut of the share.
    pub broker_share: Decimal,
    /// Company partner's cut of the share.
    pub company_share: Decimal,
    /// Who pays; settlements only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Transaction {
    /// Create a transaction and compute its `event_key`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account_id: AccountId,
        kind: TxKind,
        time_ms: TimeMs,
        amount: Decimal,
        client_share: Decimal,
        broker_share: Decimal,
        company_share: Decimal,
        direction: Option<Direction>,
        note: Option<String>,
        reference: Option<&str>,
    ) -> Self {
        let event_key = Self::compute_event_key(&account_id, kind, time_ms, &amount, reference);
        Self {
            event_key,
            seq: 0,
            account_id,
            kind,
            time_ms,
            amount,
            client_share,
            broker_share,
            company_share,
            direction,
            note,
        }
    }

    /// A funding event with no share components.
    pub fn funding(
        account_id: AccountId,
        time_ms: TimeMs,
        amount: Decimal,
        note: Option<String>,
        reference: Option<&str>,
    ) -> Self {
        Self::new(
            account_id,
            TxKind::Funding,
            time_ms,
            amount,
            Decimal::zero(),
            Decimal::zero(),
            Decimal::zero(),
            None,
            note,
            reference,
        )
    }

    /// Compute a stable unique key for this event.
    ///
    /// Priority: `reference` (e.g. a bank transfer id, if present) > hash of
    /// deterministic fields. Identical re-submissions dedupe on this key.
    ///
    /// When no reference is available the key is a SHA-256 hash truncated to
    /// 128 bits; the birthday bound gives ~2^64 collision resistance, far
    /// beyond the event volume of a single brokerage.
    pub fn compute_event_key(
        account_id: &AccountId,
        kind: TxKind,
        time_ms: TimeMs,
        amount: &Decimal,
        reference: Option<&str>,
    ) -> String {
        if let Some(r) = reference.map(str::trim).filter(|s| !s.is_empty()) {
            return r.to_lowercase();
        }

        use sha2::{Digest, Sha256};

        fn hash_var(hasher: &mut Sha256, data: &str) {
            hasher.update((data.len() as u32).to_le_bytes());
            hasher.update(data.as_bytes());
        }

        let mut hasher = Sha256::new();
        hash_var(&mut hasher, account_id.as_str());
        hash_var(&mut hasher, &kind.to_string());
        hasher.update(time_ms.as_i64().to_le_bytes());
        hash_var(&mut hasher, &amount.to_canonical_string());

        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }
}
