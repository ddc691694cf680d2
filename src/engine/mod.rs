//! Pure computation engines for the exposure ledger.

use crate::domain::{Decimal, Direction};

pub mod balance;
pub mod baseline;
pub mod ledger_update;
pub mod pnl;
pub mod settlement;
pub mod tally;

pub use balance::BalanceResolver;
pub use baseline::OldBalanceCalculator;
pub use ledger_update::LedgerUpdater;
pub use pnl::{derive_pnl, pending_for, split_payment, split_shares, PaymentSplit, PnlEvent, ShareSplit};
pub use settlement::{
    EngineError, InconsistentStateError, SettlementEngine, SettlementOutcome, SettlementRequest,
    ValidationError,
};
pub use tally::{net_tally, NetTally};

/// The unpaid portion of a share obligation.
///
/// The amount is always non-negative; the variant carries the direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    /// Nothing owed in either direction.
    None,
    /// Client owes the broker (loss side).
    Loss(Decimal),
    /// Broker owes the client (profit side).
    Profit(Decimal),
}

impl Pending {
    pub fn amount(&self) -> Decimal {
        match self {
            Pending::None => Decimal::zero(),
            Pending::Loss(a) | Pending::Profit(a) => *a,
        }
    }

    /// The direction a settlement of this obligation must take.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Pending::None => None,
            Pending::Loss(_) => Some(Direction::ClientPays),
            Pending::Profit(_) => Some(Direction::BrokerPays),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Pending::None)
    }
}
