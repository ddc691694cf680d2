//! Per-account running obligation totals.
//!
//! Exactly one ledger kind exists per account, selected by client kind:
//! individual clients use the single-total outstanding ledger, company
//! clients the four-bucket tally ledger.

use crate::domain::{AccountId, Decimal};
use serde::{Deserialize, Serialize};

/// Running net obligation for an individual-client account.
///
/// Positive = client owes broker, negative = broker owes client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingEntry {
    pub account_id: AccountId,
    pub net_amount: Decimal,
}

impl OutstandingEntry {
    pub fn new(account_id: AccountId) -> Self {
        OutstandingEntry {
            account_id,
            net_amount: Decimal::zero(),
        }
    }
}

/// Four-bucket running totals for a company-client account.
///
/// All buckets are non-negative; the client/company nets are the differences
/// of the opposing buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyEntry {
    pub account_id: AccountId,
    pub client_owes_you: Decimal,
    pub company_owes_you: Decimal,
    pub you_owe_client: Decimal,
    pub you_owe_company: Decimal,
}

impl TallyEntry {
    pub fn new(account_id: AccountId) -> Self {
        TallyEntry {
            account_id,
            client_owes_you: Decimal::zero(),
            company_owes_you: Decimal::zero(),
            you_owe_client: Decimal::zero(),
            you_owe_company: Decimal::zero(),
        }
    }

    /// Signed client-facing net (positive = client owes you).
    pub fn net_client(&self) -> Decimal {
        self.client_owes_you - self.you_owe_client
    }

    /// Signed company-facing net (positive = company owes you).
    pub fn net_company(&self) -> Decimal {
        self.company_owes_you - self.you_owe_company
    }
}

/// Snapshot of whichever ledger an account carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ledger", rename_all = "snake_case")]
pub enum LedgerSnapshot {
    Outstanding(OutstandingEntry),
    Tally(TallyEntry),
}
