//! Stateless "who owes what" recomputation from the full transaction log.

use crate::domain::{Decimal, Direction, Transaction, TxKind};

/// Net obligations recomputed directly from the log.
///
/// Positive = owed to the broker. `client` covers the client-facing share,
/// `company` the company partner's share (always zero for individual
/// accounts). Used to cross-check the incrementally maintained ledgers and as
/// the basis for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetTally {
    pub client: Decimal,
    pub company: Decimal,
}

/// Fold an account's full history into its net tallies.
///
/// Losses add shares, profits subtract them; client-pays settlements subtract
/// the paid shares, broker-pays settlements add them back. Funding and
/// balance-record markers carry no shares and are ignored.
pub fn net_tally(transactions: &[Transaction]) -> NetTally {
    let mut tally = NetTally {
        client: Decimal::zero(),
        company: Decimal::zero(),
    };

    for tx in transactions {
        match tx.kind {
            TxKind::Loss => {
                tally.client = tally.client + tx.client_share;
                tally.company = tally.company + tx.company_share;
            }
            TxKind::Profit => {
                tally.client = tally.client - tx.client_share;
                tally.company = tally.company - tx.company_share;
            }
            TxKind::Settlement => match tx.direction {
                Some(Direction::BrokerPays) => {
                    tally.client = tally.client + tx.client_share;
                    tally.company = tally.company + tx.company_share;
                }
                // Settlements default to the client paying.
                _ => {
                    tally.client = tally.client - tx.client_share;
                    tally.company = tally.company - tx.company_share;
                }
            },
            TxKind::Funding | TxKind::BalanceRecord => {}
        }
    }

    tally
}
