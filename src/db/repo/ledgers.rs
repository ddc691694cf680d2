//! Singleton-per-account ledger operations.

use crate::domain::{AccountId, OutstandingEntry, TallyEntry};
use sqlx::Row;

use super::{parse_decimal_column, Repository};

impl Repository {
    /// Read the outstanding ledger entry, if one exists.
    pub async fn get_outstanding(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<OutstandingEntry>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT account_id, net_amount FROM outstanding_ledger WHERE account_id = ?",
        )
        .bind(account_id.as_str())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|r| {
            let net: String = r.get("net_amount");
            OutstandingEntry {
                account_id: AccountId::new(r.get("account_id")),
                net_amount: parse_decimal_column("net_amount", &net),
            }
        }))
    }

    /// Write the outstanding ledger entry (insert or overwrite).
    pub async fn upsert_outstanding(&self, entry: &OutstandingEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO outstanding_ledger (account_id, net_amount)
            VALUES (?, ?)
            ON CONFLICT(account_id) DO UPDATE SET net_amount = excluded.net_amount
            "#,
        )
        .bind(entry.account_id.as_str())
        .bind(entry.net_amount.to_canonical_string())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Read the tally ledger entry, if one exists.
    pub async fn get_tally(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<TallyEntry>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT account_id, client_owes_you, company_owes_you,
                   you_owe_client, you_owe_company
            FROM tally_ledger
            WHERE account_id = ?
            "#,
        )
        .bind(account_id.as_str())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|r| {
            let client_owes_you: String = r.get("client_owes_you");
            let company_owes_you: String = r.get("company_owes_you");
            let you_owe_client: String = r.get("you_owe_client");
            let you_owe_company: String = r.get("you_owe_company");
            TallyEntry {
                account_id: AccountId::new(r.get("account_id")),
                client_owes_you: parse_decimal_column("client_owes_you", &client_owes_you),
                company_owes_you: parse_decimal_column("company_owes_you", &company_owes_you),
                you_owe_client: parse_decimal_column("you_owe_client", &you_owe_client),
                you_owe_company: parse_decimal_column("you_owe_company", &you_owe_company),
            }
        }))
    }

    /// Write the tally ledger entry (insert or overwrite).
    pub async fn upsert_tally(&self, entry: &TallyEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO tally_ledger (
                account_id, client_owes_you, company_owes_you,
                you_owe_client, you_owe_company
            ) VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(account_id) DO UPDATE SET
                client_owes_you = excluded.client_owes_you,
                company_owes_you = excluded.company_owes_you,
                you_owe_client = excluded.you_owe_client,
                you_owe_company = excluded.you_owe_company
            "#,
        )
        .bind(entry.account_id.as_str())
        .bind(entry.client_owes_you.to_canonical_string())
        .bind(entry.company_owes_you.to_canonical_string())
        .bind(entry.you_owe_client.to_canonical_string())
        .bind(entry.you_owe_company.to_canonical_string())
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
