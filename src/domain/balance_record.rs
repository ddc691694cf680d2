//! Point-in-time asserted venue balances.

use crate::domain::{AccountId, Decimal, TimeMs};
use serde::{Deserialize, Serialize};

/// An asserted actual balance for an account on a date.
///
/// Records represent physical venue state only; the settlement engine never
/// writes one. `is_settlement_adjustment` marks legacy adjustment rows, which
/// the balance resolver skips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub account_id: AccountId,
    pub time_ms: TimeMs,
    pub remaining_balance: Decimal,
    pub extra_adjustment: Decimal,
    pub is_settlement_adjustment: bool,
}

impl BalanceRecord {
    pub fn new(
        account_id: AccountId,
        time_ms: TimeMs,
        remaining_balance: Decimal,
        extra_adjustment: Decimal,
    ) -> Self {
        BalanceRecord {
            account_id,
            time_ms,
            remaining_balance,
            extra_adjustment,
            is_settlement_adjustment: false,
        }
    }

    /// The balance this record asserts.
    pub fn effective_balance(&self) -> Decimal {
        self.remaining_balance + self.extra_adjustment
    }
}
