//! Append-only transaction log operations.

use crate::domain::{AccountId, Decimal, Direction, TimeMs, Transaction, TxKind};
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

use super::{parse_decimal_column, Repository};

impl Repository {
    /// Append a transaction to the log idempotently.
    ///
    /// Returns false when an event with the same `event_key` already exists.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_transaction(&self, tx: &Transaction) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO transactions (
                event_key, account_id, kind, time_ms, amount,
                client_share, broker_share, company_share, direction, note, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(event_key) DO NOTHING
            "#,
        )
        .bind(tx.event_key.as_str())
        .bind(tx.account_id.as_str())
        .bind(tx.kind.to_string())
        .bind(tx.time_ms.as_i64())
        .bind(tx.amount.to_canonical_string())
        .bind(tx.client_share.to_canonical_string())
        .bind(tx.broker_share.to_canonical_string())
        .bind(tx.company_share.to_canonical_string())
        .bind(tx.direction.map(|d| d.to_string()))
        .bind(tx.note.as_deref())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Query an account's transactions, oldest first, with optional kind and
    /// time-window filters. Ordering is the canonical `(time_ms, id)` key.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_transactions(
        &self,
        account_id: &AccountId,
        kind: Option<TxKind>,
        from_ms: Option<TimeMs>,
        to_ms: Option<TimeMs>,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        let from_ms = from_ms.map(|t| t.as_i64()).unwrap_or(i64::MIN);
        let to_ms = to_ms.map(|t| t.as_i64()).unwrap_or(i64::MAX);

        let rows = if let Some(kind) = kind {
            sqlx::query(
                r#"
                SELECT id, event_key, account_id, kind, time_ms, amount,
                       client_share, broker_share, company_share, direction, note
                FROM transactions
                WHERE account_id = ? AND kind = ? AND time_ms >= ? AND time_ms <= ?
                ORDER BY time_ms ASC, id ASC
                "#,
            )
            .bind(account_id.as_str())
            .bind(kind.to_string())
            .bind(from_ms)
            .bind(to_ms)
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query(
                r#"
                SELECT id, event_key, account_id, kind, time_ms, amount,
                       client_share, broker_share, company_share, direction, note
                FROM transactions
                WHERE account_id = ? AND time_ms >= ? AND time_ms <= ?
                ORDER BY time_ms ASC, id ASC
                "#,
            )
            .bind(account_id.as_str())
            .bind(from_ms)
            .bind(to_ms)
            .fetch_all(self.pool())
            .await?
        };

        Ok(rows.into_iter().map(transaction_from_row).collect())
    }

    /// Settlements at or before `at_ms`, oldest first.
    pub async fn settlements_up_to(
        &self,
        account_id: &AccountId,
        at_ms: TimeMs,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        self.query_transactions(account_id, Some(TxKind::Settlement), None, Some(at_ms))
            .await
    }

    /// Sum signed funding up to and including `at_ms`.
    ///
    /// # Implementation Note
    ///
    /// We iterate in Rust to preserve decimal precision. SQLite's SUM
    /// aggregate returns REAL (float), which would lose precision for
    /// financial calculations.
    pub async fn sum_funding_up_to(
        &self,
        account_id: &AccountId,
        at_ms: TimeMs,
    ) -> Result<Decimal, sqlx::Error> {
        self.sum_funding_in_window(account_id, i64::MIN, at_ms.as_i64())
            .await
    }

    /// Sum signed funding strictly after `after_ms` up to and including `to_ms`.
    pub async fn sum_funding_after(
        &self,
        account_id: &AccountId,
        after_ms: TimeMs,
        to_ms: TimeMs,
    ) -> Result<Decimal, sqlx::Error> {
        if after_ms.as_i64() == i64::MAX {
            return Ok(Decimal::zero());
        }
        self.sum_funding_in_window(account_id, after_ms.as_i64() + 1, to_ms.as_i64())
            .await
    }

    /// Sum all funding regardless of date.
    pub async fn sum_funding_total(&self, account_id: &AccountId) -> Result<Decimal, sqlx::Error> {
        self.sum_funding_in_window(account_id, i64::MIN, i64::MAX)
            .await
    }

    /// Count of funding events for the account.
    pub async fn count_funding(&self, account_id: &AccountId) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM transactions WHERE account_id = ? AND kind = 'funding'",
        )
        .bind(account_id.as_str())
        .fetch_one(self.pool())
        .await?;
        Ok(row.get("n"))
    }

    async fn sum_funding_in_window(
        &self,
        account_id: &AccountId,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Decimal, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT amount
            FROM transactions
            WHERE account_id = ? AND kind = 'funding' AND time_ms >= ? AND time_ms <= ?
            ORDER BY time_ms ASC, id ASC
            "#,
        )
        .bind(account_id.as_str())
        .bind(from_ms)
        .bind(to_ms)
        .fetch_all(self.pool())
        .await?;

        let mut sum = Decimal::zero();
        for row in rows {
            let amount_str: String = row.get("amount");
            sum = sum + parse_decimal_column("funding.amount", &amount_str);
        }
        Ok(sum)
    }
}

fn transaction_from_row(row: sqlx::sqlite::SqliteRow) -> Transaction {
    let event_key: String = row.get("event_key");
    let kind_str: String = row.get("kind");
    let kind = TxKind::from_str(&kind_str).unwrap_or_else(|e| {
        warn!(event_key = %event_key, error = %e, "Unknown transaction kind, treating as balance record");
        TxKind::BalanceRecord
    });

    let direction = row
        .get::<Option<String>, _>("direction")
        .and_then(|s| Direction::from_str(&s).ok());

    let amount: String = row.get("amount");
    let client_share: String = row.get("client_share");
    let broker_share: String = row.get("broker_share");
    let company_share: String = row.get("company_share");

    Transaction {
        event_key,
        seq: row.get("id"),
        account_id: AccountId::new(row.get("account_id")),
        kind,
        time_ms: TimeMs::new(row.get("time_ms")),
        amount: parse_decimal_column("amount", &amount),
        client_share: parse_decimal_column("client_share", &client_share),
        broker_share: parse_decimal_column("broker_share", &broker_share),
        company_share: parse_decimal_column("company_share", &company_share),
        direction,
        note: row.get("note"),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::setup_test_db;
    use super::*;
    use crate::domain::{Account, ClientKind, Venue};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    async fn insert_test_account(repo: &Repository) -> AccountId {
        let account = Account::new(
            "alice".to_string(),
            Venue::new("venue-a".to_string()),
            ClientKind::Individual,
            dec("10"),
            Decimal::zero(),
        )
        .unwrap();
        repo.insert_account(&account).await.unwrap();
        account.id
    }

    fn funding(account_id: &AccountId, time_ms: i64, amount: &str, reference: &str) -> Transaction {
        Transaction::funding(
            account_id.clone(),
            TimeMs::new(time_ms),
            dec(amount),
            None,
            Some(reference),
        )
    }

    #[tokio::test]
    async fn test_insert_duplicate_event_key_ignored() {
        let (repo, _temp) = setup_test_db().await;
        let account_id = insert_test_account(&repo).await;

        let tx = funding(&account_id, 1000, "500", "wire-1");
        assert!(repo.insert_transaction(&tx).await.unwrap());
        assert!(!repo.insert_transaction(&tx).await.unwrap());
    }

    #[tokio::test]
    async fn test_query_orders_by_time_then_seq() {
        let (repo, _temp) = setup_test_db().await;
        let account_id = insert_test_account(&repo).await;

        // Same timestamp; insertion order must win.
        repo.insert_transaction(&funding(&account_id, 1000, "1", "a"))
            .await
            .unwrap();
        repo.insert_transaction(&funding(&account_id, 1000, "2", "b"))
            .await
            .unwrap();
        repo.insert_transaction(&funding(&account_id, 500, "3", "c"))
            .await
            .unwrap();

        let txs = repo
            .query_transactions(&account_id, None, None, None)
            .await
            .unwrap();
        assert_eq!(txs.len(), 3);
        assert_eq!(txs[0].amount, dec("3"));
        assert_eq!(txs[1].amount, dec("1"));
        assert_eq!(txs[2].amount, dec("2"));
        assert!(txs[1].seq < txs[2].seq);
    }

    #[tokio::test]
    async fn test_sum_funding_windows() {
        let (repo, _temp) = setup_test_db().await;
        let account_id = insert_test_account(&repo).await;

        repo.insert_transaction(&funding(&account_id, 1000, "1000", "a"))
            .await
            .unwrap();
        repo.insert_transaction(&funding(&account_id, 2000, "-200", "b"))
            .await
            .unwrap();
        repo.insert_transaction(&funding(&account_id, 3000, "50", "c"))
            .await
            .unwrap();

        assert_eq!(
            repo.sum_funding_up_to(&account_id, TimeMs::new(2000))
                .await
                .unwrap(),
            dec("800")
        );
        // Strictly-after boundary excludes the event at 2000.
        assert_eq!(
            repo.sum_funding_after(&account_id, TimeMs::new(2000), TimeMs::new(5000))
                .await
                .unwrap(),
            dec("50")
        );
        assert_eq!(repo.sum_funding_total(&account_id).await.unwrap(), dec("850"));
        assert_eq!(repo.count_funding(&account_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_settlement_roundtrip_with_direction() {
        let (repo, _temp) = setup_test_db().await;
        let account_id = insert_test_account(&repo).await;

        let tx = Transaction::new(
            account_id.clone(),
            TxKind::Settlement,
            TimeMs::new(4000),
            dec("10"),
            dec("10"),
            dec("10"),
            Decimal::zero(),
            Some(Direction::ClientPays),
            Some("partial payment".to_string()),
            None,
        );
        repo.insert_transaction(&tx).await.unwrap();

        let settlements = repo
            .settlements_up_to(&account_id, TimeMs::new(5000))
            .await
            .unwrap();
        assert_eq!(settlements.len(), 1);
        assert_eq!(settlements[0].direction, Some(Direction::ClientPays));
        assert_eq!(settlements[0].amount, dec("10"));
        assert_eq!(settlements[0].note.as_deref(), Some("partial payment"));
        assert!(settlements[0].seq > 0);
    }
}
