//! Profit/loss derivation and share splitting.
//!
//! All functions here are pure; the orchestration layer decides which
//! balances to feed in and persists the resulting events.

use crate::domain::{Account, Decimal, TxKind};
use crate::engine::Pending;

/// How a derived share amount divides between the broker and the company
/// partner. `broker_cut + company_cut == total_share` always holds: the
/// company cut is computed as the remainder, never rounded independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareSplit {
    pub total_share: Decimal,
    pub broker_cut: Decimal,
    pub company_cut: Decimal,
}

/// A derived profit or loss event, ready to be appended to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PnlEvent {
    /// `TxKind::Loss` or `TxKind::Profit`.
    pub kind: TxKind,
    /// |net| balance movement.
    pub amount: Decimal,
    pub split: ShareSplit,
}

/// How a settlement payment divides between broker and company.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentSplit {
    pub broker: Decimal,
    pub company: Decimal,
}

/// Split a |net| balance movement into share amounts.
///
/// Company accounts: the client-facing total is the company percentage of the
/// movement, the broker keeps its own (smaller) percentage, and the company
/// partner gets the remainder. Individual accounts: the broker keeps the
/// whole share.
pub fn split_shares(account: &Account, net_abs: Decimal) -> ShareSplit {
    let total_share = net_abs.pct(account.total_share_pct());
    if account.is_company() {
        let broker_cut = net_abs.pct(account.broker_share_pct);
        ShareSplit {
            total_share,
            broker_cut,
            company_cut: total_share - broker_cut,
        }
    } else {
        ShareSplit {
            total_share,
            broker_cut: total_share,
            company_cut: Decimal::zero(),
        }
    }
}

/// Split a settlement payment amount with the same proportions as
/// [`split_shares`], again giving the company the exact remainder.
pub fn split_payment(account: &Account, amount: Decimal) -> PaymentSplit {
    if account.is_company() {
        let broker =
            (amount * account.broker_share_pct / account.total_share_pct()).round_money();
        PaymentSplit {
            broker,
            company: amount - broker,
        }
    } else {
        PaymentSplit {
            broker: amount,
            company: Decimal::zero(),
        }
    }
}

/// Derive a profit/loss event from a baseline and a current balance.
///
/// Returns None when the movement is below the minor currency unit.
pub fn derive_pnl(account: &Account, baseline: Decimal, current: Decimal) -> Option<PnlEvent> {
    let net = current - baseline;
    if !net.is_material() {
        return None;
    }
    let amount = net.abs();
    let kind = if net.is_negative() {
        TxKind::Loss
    } else {
        TxKind::Profit
    };
    Some(PnlEvent {
        kind,
        amount,
        split: split_shares(account, amount),
    })
}

/// The pending share obligation implied by a baseline and current balance.
pub fn pending_for(account: &Account, baseline: Decimal, current: Decimal) -> Pending {
    let net = current - baseline;
    if !net.is_material() {
        return Pending::None;
    }
    let amount = net.abs().pct(account.total_share_pct());
    if net.is_negative() {
        Pending::Loss(amount)
    } else {
        Pending::Profit(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClientKind, Direction, Venue};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn individual(broker_pct: &str) -> Account {
        Account::new(
            "alice".to_string(),
            Venue::new("venue-a".to_string()),
            ClientKind::Individual,
            dec(broker_pct),
            Decimal::zero(),
        )
        .unwrap()
    }

    fn company(broker_pct: &str, company_pct: &str) -> Account {
        Account::new(
            "acme".to_string(),
            Venue::new("venue-a".to_string()),
            ClientKind::Company,
            dec(broker_pct),
            dec(company_pct),
        )
        .unwrap()
    }

    #[test]
    fn test_individual_split_keeps_full_share() {
        // Loss of 180 at 10% -> share 18, all broker.
        let split = split_shares(&individual("10"), dec("180"));
        assert_eq!(split.total_share, dec("18"));
        assert_eq!(split.broker_cut, dec("18"));
        assert!(split.company_cut.is_zero());
    }

    #[test]
    fn test_company_split_sums_exactly() {
        // Loss of 200, broker 1%, company 10% -> 20 total, 2 broker, 18 company.
        let split = split_shares(&company("1", "10"), dec("200"));
        assert_eq!(split.total_share, dec("20"));
        assert_eq!(split.broker_cut, dec("2"));
        assert_eq!(split.company_cut, dec("18"));
        assert_eq!(split.broker_cut + split.company_cut, split.total_share);
    }

    #[test]
    fn test_company_split_remainder_absorbs_rounding() {
        // Awkward magnitudes: broker cut rounds, company takes the remainder.
        let acct = company("1", "10");
        let split = split_shares(&acct, dec("333.33"));
        assert_eq!(split.total_share, dec("33.33"));
        assert_eq!(split.broker_cut, dec("3.33"));
        assert_eq!(split.broker_cut + split.company_cut, split.total_share);
    }

    #[test]
    fn test_payment_split_company() {
        let payment = split_payment(&company("1", "10"), dec("10"));
        assert_eq!(payment.broker, dec("1"));
        assert_eq!(payment.company, dec("9"));
    }

    #[test]
    fn test_payment_split_individual() {
        let payment = split_payment(&individual("10"), dec("10"));
        assert_eq!(payment.broker, dec("10"));
        assert!(payment.company.is_zero());
    }

    #[test]
    fn test_derive_loss_event() {
        let event = derive_pnl(&individual("10"), dec("1000"), dec("820")).unwrap();
        assert_eq!(event.kind, TxKind::Loss);
        assert_eq!(event.amount, dec("180"));
        assert_eq!(event.split.total_share, dec("18"));
    }

    #[test]
    fn test_derive_profit_event() {
        let event = derive_pnl(&individual("10"), dec("1000"), dec("1100")).unwrap();
        assert_eq!(event.kind, TxKind::Profit);
        assert_eq!(event.amount, dec("100"));
        assert_eq!(event.split.total_share, dec("10"));
    }

    #[test]
    fn test_no_event_below_minor_unit() {
        assert!(derive_pnl(&individual("10"), dec("1000"), dec("1000.005")).is_none());
        assert!(derive_pnl(&individual("10"), dec("1000"), dec("1000")).is_none());
    }

    #[test]
    fn test_pending_direction_follows_sign() {
        let acct = individual("10");
        assert_eq!(
            pending_for(&acct, dec("1000"), dec("820")),
            Pending::Loss(dec("18"))
        );
        assert_eq!(
            pending_for(&acct, dec("900"), dec("820")),
            Pending::Loss(dec("8"))
        );
        assert_eq!(
            pending_for(&acct, dec("1000"), dec("1100")),
            Pending::Profit(dec("10"))
        );
        assert_eq!(pending_for(&acct, dec("1000"), dec("1000")), Pending::None);
    }

    #[test]
    fn test_pending_uses_company_pct_for_company_accounts() {
        let pending = pending_for(&company("1", "10"), dec("1000"), dec("800"));
        assert_eq!(pending, Pending::Loss(dec("20")));
        assert_eq!(pending.direction(), Some(Direction::ClientPays));
    }
}
