//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `transactions.rs` - Append-only transaction log queries
//! - `balances.rs` - Balance record and cache operations
//! - `ledgers.rs` - Outstanding/tally ledger singletons

mod balances;
mod ledgers;
mod transactions;

use crate::domain::{Account, AccountId, ClientKind, Decimal, TimeMs, Venue};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

/// Parse a stored decimal string, logging and defaulting to zero on failure.
///
/// Stored values are written by us as canonical strings, so a parse failure
/// signals corruption rather than expected input.
pub(crate) fn parse_decimal_column(context: &str, raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap_or_else(|e| {
        warn!(
            column = context,
            value = raw,
            error = %e,
            "Failed to parse stored decimal, using zero"
        );
        Decimal::default()
    })
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // Account operations
    // =========================================================================

    /// Insert a new account row.
    ///
    /// # Errors
    /// Returns an error if the insert fails (e.g. duplicate id).
    pub async fn insert_account(&self, account: &Account) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, client_name, venue, client_kind, broker_share_pct,
                company_share_pct, active, old_balance, cached_current_balance,
                cache_updated_ms
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.as_str())
        .bind(&account.client_name)
        .bind(account.venue.as_str())
        .bind(account.client_kind.to_string())
        .bind(account.broker_share_pct.to_canonical_string())
        .bind(account.company_share_pct.to_canonical_string())
        .bind(account.active as i64)
        .bind(account.old_balance.to_canonical_string())
        .bind(account.cached_current_balance.to_canonical_string())
        .bind(account.cache_updated_ms.map(|t| t.as_i64()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch an account by id.
    pub async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, client_name, venue, client_kind, broker_share_pct,
                   company_share_pct, active, old_balance, cached_current_balance,
                   cache_updated_ms
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(account_from_row))
    }

    /// List all active accounts (used by the reconciler sweep).
    pub async fn list_active_accounts(&self) -> Result<Vec<Account>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, client_name, venue, client_kind, broker_share_pct,
                   company_share_pct, active, old_balance, cached_current_balance,
                   cache_updated_ms
            FROM accounts
            WHERE active = 1
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(account_from_row).collect())
    }

    /// Persist a new capital baseline for the account.
    ///
    /// This is the settlement engine's direct baseline write; it never goes
    /// through balance records.
    pub async fn update_baseline(
        &self,
        id: &AccountId,
        old_balance: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE accounts SET old_balance = ? WHERE id = ?")
            .bind(old_balance.to_canonical_string())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Refresh the cached current balance and its timestamp.
    pub async fn update_balance_cache(
        &self,
        id: &AccountId,
        balance: Decimal,
        at_ms: TimeMs,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE accounts SET cached_current_balance = ?, cache_updated_ms = ? WHERE id = ?",
        )
        .bind(balance.to_canonical_string())
        .bind(at_ms.as_i64())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn account_from_row(row: sqlx::sqlite::SqliteRow) -> Account {
    let id: String = row.get("id");
    let client_kind_str: String = row.get("client_kind");
    let client_kind = ClientKind::from_str(&client_kind_str).unwrap_or_else(|e| {
        warn!(account_id = %id, error = %e, "Unknown client kind, treating as individual");
        ClientKind::Individual
    });

    let broker_share_pct: String = row.get("broker_share_pct");
    let company_share_pct: String = row.get("company_share_pct");
    let old_balance: String = row.get("old_balance");
    let cached_current_balance: String = row.get("cached_current_balance");

    Account {
        id: AccountId::new(id),
        client_name: row.get("client_name"),
        venue: Venue::new(row.get("venue")),
        client_kind,
        broker_share_pct: parse_decimal_column("broker_share_pct", &broker_share_pct),
        company_share_pct: parse_decimal_column("company_share_pct", &company_share_pct),
        active: row.get::<i64, _>("active") != 0,
        old_balance: parse_decimal_column("old_balance", &old_balance),
        cached_current_balance: parse_decimal_column(
            "cached_current_balance",
            &cached_current_balance,
        ),
        cache_updated_ms: row
            .get::<Option<i64>, _>("cache_updated_ms")
            .map(TimeMs::new),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::db::migrations::init_db;
    use tempfile::TempDir;

    pub async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }
}
