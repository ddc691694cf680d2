//! Balance record operations.

use crate::domain::{AccountId, BalanceRecord, TimeMs};
use sqlx::Row;

use super::{parse_decimal_column, Repository};

impl Repository {
    /// Upsert a balance record for an exact (account, time_ms) key.
    ///
    /// Delete-then-insert keeps the newest assertion for a date
    /// authoritative while preserving insertion-order ids for ties.
    pub async fn upsert_balance_record(&self, record: &BalanceRecord) -> Result<(), sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r#"
            DELETE FROM balance_records
            WHERE account_id = ? AND time_ms = ?
            "#,
        )
        .bind(record.account_id.as_str())
        .bind(record.time_ms.as_i64())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO balance_records (
                account_id, time_ms, remaining_balance, extra_adjustment,
                is_settlement_adjustment, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.account_id.as_str())
        .bind(record.time_ms.as_i64())
        .bind(record.remaining_balance.to_canonical_string())
        .bind(record.extra_adjustment.to_canonical_string())
        .bind(record.is_settlement_adjustment as i64)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// The latest balance record at or before `at_ms`, excluding legacy
    /// settlement-adjustment markers. "Latest" is `(time_ms, id)` descending,
    /// so the most recently created record for a date wins.
    pub async fn latest_balance_record_at_or_before(
        &self,
        account_id: &AccountId,
        at_ms: TimeMs,
    ) -> Result<Option<BalanceRecord>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT account_id, time_ms, remaining_balance, extra_adjustment,
                   is_settlement_adjustment
            FROM balance_records
            WHERE account_id = ? AND time_ms <= ? AND is_settlement_adjustment = 0
            ORDER BY time_ms DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(account_id.as_str())
        .bind(at_ms.as_i64())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|r| {
            let remaining: String = r.get("remaining_balance");
            let extra: String = r.get("extra_adjustment");
            BalanceRecord {
                account_id: AccountId::new(r.get("account_id")),
                time_ms: TimeMs::new(r.get("time_ms")),
                remaining_balance: parse_decimal_column("remaining_balance", &remaining),
                extra_adjustment: parse_decimal_column("extra_adjustment", &extra),
                is_settlement_adjustment: r.get::<i64, _>("is_settlement_adjustment") != 0,
            }
        }))
    }
}
