//! Incremental maintenance of the per-account ledgers.

use crate::db::Repository;
use crate::domain::{Account, ClientKind, Decimal, Direction, OutstandingEntry, TallyEntry, TxKind};
use crate::engine::{PaymentSplit, Pending, PnlEvent};
use std::sync::Arc;

#[derive(Clone)]
pub struct LedgerUpdater {
    repo: Arc<Repository>,
}

impl LedgerUpdater {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Apply a derived profit/loss event to the account's ledger.
    ///
    /// Outstanding: the broker cut moves the single signed net. Tally: the
    /// client-facing total and the company cut accumulate into the owed-to
    /// buckets matching the event direction.
    pub async fn apply_pnl(&self, account: &Account, event: &PnlEvent) -> Result<(), sqlx::Error> {
        match account.client_kind {
            ClientKind::Individual => {
                let mut entry = self
                    .repo
                    .get_outstanding(&account.id)
                    .await?
                    .unwrap_or_else(|| OutstandingEntry::new(account.id.clone()));
                match event.kind {
                    TxKind::Loss => entry.net_amount = entry.net_amount + event.split.broker_cut,
                    TxKind::Profit => entry.net_amount = entry.net_amount - event.split.broker_cut,
                    _ => {}
                }
                self.repo.upsert_outstanding(&entry).await
            }
            ClientKind::Company => {
                let mut entry = self
                    .repo
                    .get_tally(&account.id)
                    .await?
                    .unwrap_or_else(|| TallyEntry::new(account.id.clone()));
                match event.kind {
                    TxKind::Loss => {
                        entry.client_owes_you = entry.client_owes_you + event.split.total_share;
                        entry.company_owes_you = entry.company_owes_you + event.split.company_cut;
                    }
                    TxKind::Profit => {
                        entry.you_owe_client = entry.you_owe_client + event.split.total_share;
                        entry.you_owe_company = entry.you_owe_company + event.split.company_cut;
                    }
                    _ => {}
                }
                self.repo.upsert_tally(&entry).await
            }
        }
    }

    /// Apply an accepted settlement to the account's ledger.
    ///
    /// Outstanding entries are *set* to the freshly recomputed pending (the
    /// baseline shift already reflects the payment); tally buckets are
    /// reduced by the paid amounts, floored at zero.
    pub async fn apply_settlement(
        &self,
        account: &Account,
        direction: Direction,
        amount: Decimal,
        payment: &PaymentSplit,
        recomputed_pending: &Pending,
    ) -> Result<(), sqlx::Error> {
        match account.client_kind {
            ClientKind::Individual => {
                let mut entry = self
                    .repo
                    .get_outstanding(&account.id)
                    .await?
                    .unwrap_or_else(|| OutstandingEntry::new(account.id.clone()));
                entry.net_amount = match recomputed_pending {
                    Pending::None => Decimal::zero(),
                    Pending::Loss(a) => *a,
                    Pending::Profit(a) => -*a,
                };
                self.repo.upsert_outstanding(&entry).await
            }
            ClientKind::Company => {
                let mut entry = self
                    .repo
                    .get_tally(&account.id)
                    .await?
                    .unwrap_or_else(|| TallyEntry::new(account.id.clone()));
                match direction {
                    Direction::ClientPays => {
                        entry.client_owes_you = floor_zero(entry.client_owes_you - amount);
                        entry.company_owes_you =
                            floor_zero(entry.company_owes_you - payment.company);
                    }
                    Direction::BrokerPays => {
                        entry.you_owe_client = floor_zero(entry.you_owe_client - amount);
                        entry.you_owe_company = floor_zero(entry.you_owe_company - payment.company);
                    }
                }
                self.repo.upsert_tally(&entry).await
            }
        }
    }
}

fn floor_zero(value: Decimal) -> Decimal {
    if value.is_negative() {
        Decimal::zero()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::test_support::setup_test_db;
    use crate::domain::Venue;
    use crate::engine::split_shares;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    async fn setup(kind: ClientKind) -> (Arc<Repository>, Account, tempfile::TempDir) {
        let (repo, temp) = setup_test_db().await;
        let repo = Arc::new(repo);
        let (broker, company) = match kind {
            ClientKind::Individual => ("10", "0"),
            ClientKind::Company => ("1", "10"),
        };
        let account = Account::new(
            "client".to_string(),
            Venue::new("venue-a".to_string()),
            kind,
            dec(broker),
            dec(company),
        )
        .unwrap();
        repo.insert_account(&account).await.unwrap();
        (repo, account, temp)
    }

    fn pnl(account: &Account, kind: TxKind, amount: &str) -> PnlEvent {
        PnlEvent {
            kind,
            amount: dec(amount),
            split: split_shares(account, dec(amount)),
        }
    }

    #[tokio::test]
    async fn test_outstanding_loss_then_profit() {
        let (repo, account, _temp) = setup(ClientKind::Individual).await;
        let updater = LedgerUpdater::new(repo.clone());

        updater
            .apply_pnl(&account, &pnl(&account, TxKind::Loss, "180"))
            .await
            .unwrap();
        updater
            .apply_pnl(&account, &pnl(&account, TxKind::Profit, "50"))
            .await
            .unwrap();

        let entry = repo.get_outstanding(&account.id).await.unwrap().unwrap();
        // +18 - 5
        assert_eq!(entry.net_amount, dec("13"));
    }

    #[tokio::test]
    async fn test_outstanding_settlement_sets_to_pending() {
        let (repo, account, _temp) = setup(ClientKind::Individual).await;
        let updater = LedgerUpdater::new(repo.clone());

        updater
            .apply_pnl(&account, &pnl(&account, TxKind::Loss, "180"))
            .await
            .unwrap();
        updater
            .apply_settlement(
                &account,
                Direction::ClientPays,
                dec("10"),
                &PaymentSplit {
                    broker: dec("10"),
                    company: Decimal::zero(),
                },
                &Pending::Loss(dec("8")),
            )
            .await
            .unwrap();

        let entry = repo.get_outstanding(&account.id).await.unwrap().unwrap();
        assert_eq!(entry.net_amount, dec("8"));
    }

    #[tokio::test]
    async fn test_tally_loss_and_profit_buckets() {
        let (repo, account, _temp) = setup(ClientKind::Company).await;
        let updater = LedgerUpdater::new(repo.clone());

        updater
            .apply_pnl(&account, &pnl(&account, TxKind::Loss, "200"))
            .await
            .unwrap();
        updater
            .apply_pnl(&account, &pnl(&account, TxKind::Profit, "100"))
            .await
            .unwrap();

        let entry = repo.get_tally(&account.id).await.unwrap().unwrap();
        assert_eq!(entry.client_owes_you, dec("20"));
        assert_eq!(entry.company_owes_you, dec("18"));
        assert_eq!(entry.you_owe_client, dec("10"));
        assert_eq!(entry.you_owe_company, dec("9"));
    }

    #[tokio::test]
    async fn test_tally_settlement_reduces_floored() {
        let (repo, account, _temp) = setup(ClientKind::Company).await;
        let updater = LedgerUpdater::new(repo.clone());

        updater
            .apply_pnl(&account, &pnl(&account, TxKind::Loss, "200"))
            .await
            .unwrap();
        updater
            .apply_settlement(
                &account,
                Direction::ClientPays,
                dec("10"),
                &PaymentSplit {
                    broker: dec("1"),
                    company: dec("9"),
                },
                &Pending::Loss(dec("10")),
            )
            .await
            .unwrap();

        let entry = repo.get_tally(&account.id).await.unwrap().unwrap();
        assert_eq!(entry.client_owes_you, dec("10"));
        assert_eq!(entry.company_owes_you, dec("9"));

        // Paying more than the bucket holds floors at zero instead of going negative.
        updater
            .apply_settlement(
                &account,
                Direction::ClientPays,
                dec("50"),
                &PaymentSplit {
                    broker: dec("5"),
                    company: dec("45"),
                },
                &Pending::None,
            )
            .await
            .unwrap();
        let entry = repo.get_tally(&account.id).await.unwrap().unwrap();
        assert!(entry.client_owes_you.is_zero());
        assert!(entry.company_owes_you.is_zero());
    }
}
