//! Domain types and determinism layer for the broker exposure ledger.
//!
//! This module provides:
//! - Lossless numeric handling via a Decimal wrapper with money rounding
//! - Domain primitives: TimeMs, AccountId, Venue, ClientKind, Direction
//! - Account, Transaction, BalanceRecord and ledger entry types
//! - Stable transaction ordering key for deterministic replay

pub mod account;
pub mod balance_record;
pub mod decimal;
pub mod ledger;
pub mod ordering;
pub mod primitives;
pub mod transaction;

pub use account::{validate_shares, Account, ShareConfigError};
pub use balance_record::BalanceRecord;
pub use decimal::Decimal;
pub use ledger::{LedgerSnapshot, OutstandingEntry, TallyEntry};
pub use ordering::TxOrderingKey;
pub use primitives::{AccountId, ClientKind, Direction, TimeMs, Venue};
pub use transaction::{Transaction, TxKind};
