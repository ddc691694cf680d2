//! Stateful flows built on the engines: per-account locking, the
//! balance-recording write path, and the background ledger reconciler.

pub mod locks;
pub mod reconciler;
pub mod recorder;

pub use locks::AccountLocks;
pub use reconciler::{Reconciler, ReconcileReport};
pub use recorder::{BalanceRecordRequest, BalanceRecorder, RecordOutcome};
