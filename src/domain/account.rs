//! Account: one client × venue link with its share configuration.

use crate::domain::{AccountId, ClientKind, Decimal, TimeMs, Venue};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShareConfigError {
    #[error("broker share percent must be in (0, 100], got {0}")]
    BrokerShareOutOfRange(Decimal),
    #[error("company share percent must be in (0, 100], got {0}")]
    CompanyShareOutOfRange(Decimal),
    #[error("individual accounts must have zero company share, got {0}")]
    IndividualWithCompanyShare(Decimal),
    #[error("company accounts need broker share ({0}) below company share ({1})")]
    BrokerShareNotBelowCompanyShare(Decimal, Decimal),
}

/// A client's account at one venue.
///
/// `old_balance` is the persisted capital baseline; it is written by the
/// settlement engine and treated as a hint only — the calculator always
/// replays the log. `cached_current_balance`/`cache_updated_ms` back the
/// balance resolver's TTL fast path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub client_name: String,
    pub venue: Venue,
    pub client_kind: ClientKind,
    pub broker_share_pct: Decimal,
    pub company_share_pct: Decimal,
    pub active: bool,
    pub old_balance: Decimal,
    pub cached_current_balance: Decimal,
    pub cache_updated_ms: Option<TimeMs>,
}

impl Account {
    /// Create a new active account with validated share percentages.
    pub fn new(
        client_name: String,
        venue: Venue,
        client_kind: ClientKind,
        broker_share_pct: Decimal,
        company_share_pct: Decimal,
    ) -> Result<Self, ShareConfigError> {
        validate_shares(client_kind, broker_share_pct, company_share_pct)?;
        Ok(Account {
            id: AccountId::generate(),
            client_name,
            venue,
            client_kind,
            broker_share_pct,
            company_share_pct,
            active: true,
            old_balance: Decimal::zero(),
            cached_current_balance: Decimal::zero(),
            cache_updated_ms: None,
        })
    }

    pub fn is_company(&self) -> bool {
        self.client_kind == ClientKind::Company
    }

    /// The client-facing share percentage: company share for company
    /// accounts, broker share otherwise.
    pub fn total_share_pct(&self) -> Decimal {
        if self.is_company() {
            self.company_share_pct
        } else {
            self.broker_share_pct
        }
    }
}

/// Validate a share configuration for the given client kind.
///
/// Individual accounts carry only a broker share. Company accounts split the
/// client-facing share between the broker (small cut) and the company partner
/// (the remainder), so the broker percentage must stay strictly below the
/// company percentage.
pub fn validate_shares(
    client_kind: ClientKind,
    broker_share_pct: Decimal,
    company_share_pct: Decimal,
) -> Result<(), ShareConfigError> {
    let hundred = Decimal::hundred();
    if !broker_share_pct.is_positive() || broker_share_pct > hundred {
        return Err(ShareConfigError::BrokerShareOutOfRange(broker_share_pct));
    }
    match client_kind {
        ClientKind::Individual => {
            if !company_share_pct.is_zero() {
                return Err(ShareConfigError::IndividualWithCompanyShare(
                    company_share_pct,
                ));
            }
        }
        ClientKind::Company => {
            if !company_share_pct.is_positive() || company_share_pct > hundred {
                return Err(ShareConfigError::CompanyShareOutOfRange(company_share_pct));
            }
            if broker_share_pct >= company_share_pct {
                return Err(ShareConfigError::BrokerShareNotBelowCompanyShare(
                    broker_share_pct,
                    company_share_pct,
                ));
            }
        }
    }
    Ok(())
}
