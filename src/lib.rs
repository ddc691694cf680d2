pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Account, AccountId, BalanceRecord, ClientKind, Decimal, Direction, LedgerSnapshot,
    OutstandingEntry, TallyEntry, TimeMs, Transaction, TxKind, Venue,
};
pub use error::AppError;
