//! PostgreSQL ledger backend
//!
//! Balance mutations are single `UPDATE ... RETURNING` statements, so the
//! row lock taken by PostgreSQL covers the whole read-modify-write.

use async_trait::async_trait;
use futures::StreamExt;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::{AccountStore, ReconciliationLog, StoreError, TransactionLog, TransactionStream};
use crate::account::{Account, AccountId, AccountIdentity, NewAccount};
use crate::ledger::{NewTransaction, Transaction, TransactionId};
use crate::transfer::types::{NewReconciliationMarker, ReconciliationMarker, TransferId};

const ACCOUNT_COLUMNS: &str = "id, sort_code, account_number, bank_name, owner_name, \
                               current_balance, version, created_at";

fn row_to_account(row: &PgRow) -> Result<Account, StoreError> {
    Ok(Account {
        id: AccountId(row.try_get("id")?),
        sort_code: row.try_get("sort_code")?,
        account_number: row.try_get("account_number")?,
        bank_name: row.try_get("bank_name")?,
        owner_name: row.try_get("owner_name")?,
        current_balance: row.try_get("current_balance")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_transaction(row: &PgRow) -> Result<Transaction, StoreError> {
    Ok(Transaction {
        id: TransactionId(row.try_get("id")?),
        amount: row.try_get("amount")?,
        source_account_id: AccountId(row.try_get("source_account_id")?),
        target_account_id: AccountId(row.try_get("target_account_id")?),
        target_owner_name: row.try_get("target_owner_name")?,
        initiation_date: row.try_get("initiation_date")?,
        completion_date: row.try_get("completion_date")?,
        reference: row.try_get("reference")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
    })
}

fn row_to_marker(row: &PgRow) -> Result<ReconciliationMarker, StoreError> {
    let transfer_id: String = row.try_get("transfer_id")?;
    let transfer_id = transfer_id.parse::<TransferId>().map_err(|e| {
        StoreError::Database(format!("corrupt transfer_id '{}': {}", transfer_id, e))
    })?;

    Ok(ReconciliationMarker {
        id: row.try_get("id")?,
        transfer_id,
        account_id: AccountId(row.try_get("account_id")?),
        delta: row.try_get("delta")?,
        reason: row.try_get("reason")?,
        created_at: row.try_get("created_at")?,
        resolved_at: row.try_get("resolved_at")?,
    })
}

// ============================================================================
// Accounts
// ============================================================================

pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_identity(
        &self,
        sort_code: &str,
        account_number: &str,
    ) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE sort_code = $1 AND account_number = $2"
        ))
        .bind(sort_code)
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn find_by_account_number(
        &self,
        account_number: &str,
    ) -> Result<Option<Account>, StoreError> {
        // Two rows are enough to detect ambiguity
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_number = $1 ORDER BY id LIMIT 2"
        ))
        .bind(account_number)
        .fetch_all(&self.pool)
        .await?;

        match rows.as_slice() {
            [] => Ok(None),
            [row] => row_to_account(row).map(Some),
            _ => Err(StoreError::AmbiguousAccount(account_number.to_string())),
        }
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let result = sqlx::query(&format!(
            r#"
            INSERT INTO accounts (sort_code, account_number, bank_name, owner_name)
            VALUES ($1, $2, $3, $4)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(&account.sort_code)
        .bind(&account.account_number)
        .bind(&account.bank_name)
        .bind(&account.owner_name)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => row_to_account(&row),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                StoreError::DuplicateIdentity(AccountIdentity::new(
                    account.sort_code,
                    account.account_number,
                )),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_delta(&self, id: AccountId, delta: Decimal) -> Result<Account, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE accounts
            SET current_balance = current_balance + $1, version = version + 1
            WHERE id = $2
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(delta)
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row_to_account(&row),
            None => Err(StoreError::AccountNotFound(id)),
        }
    }

    async fn apply_delta_if(
        &self,
        id: AccountId,
        delta: Decimal,
        expected_version: i64,
    ) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE accounts
            SET current_balance = current_balance + $1, version = version + 1
            WHERE id = $2 AND version = $3
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(delta)
        .bind(id.0)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row_to_account(&row).map(Some),
            // Distinguish a stale version from a missing row
            None => match self.get(id).await? {
                Some(_) => Ok(None),
                None => Err(StoreError::AccountNotFound(id)),
            },
        }
    }
}

// ============================================================================
// Transactions
// ============================================================================

pub struct PgTransactionLog {
    pool: PgPool,
}

impl PgTransactionLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionLog for PgTransactionLog {
    async fn append(&self, record: NewTransaction) -> Result<Transaction, StoreError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO transactions
                (amount, source_account_id, target_account_id, target_owner_name,
                 initiation_date, completion_date, reference, latitude, longitude)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(record.amount)
        .bind(record.source_account_id.0)
        .bind(record.target_account_id.0)
        .bind(&record.target_owner_name)
        .bind(record.initiation_date)
        .bind(record.completion_date)
        .bind(&record.reference)
        .bind(record.latitude)
        .bind(record.longitude)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.with_id(TransactionId(id)))
    }

    fn list_by_source(&self, account_id: AccountId) -> TransactionStream<'_> {
        sqlx::query(
            r#"
            SELECT id, amount, source_account_id, target_account_id, target_owner_name,
                   initiation_date, completion_date, reference, latitude, longitude
            FROM transactions
            WHERE source_account_id = $1
            ORDER BY initiation_date ASC, id ASC
            "#,
        )
        .bind(account_id.0)
        .fetch(&self.pool)
        .map(|row| row.map_err(StoreError::from).and_then(|r| row_to_transaction(&r)))
        .boxed()
    }
}

// ============================================================================
// Reconciliation markers
// ============================================================================

pub struct PgReconciliationLog {
    pool: PgPool,
}

impl PgReconciliationLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReconciliationLog for PgReconciliationLog {
    async fn record(
        &self,
        marker: NewReconciliationMarker,
    ) -> Result<ReconciliationMarker, StoreError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO reconciliation_markers
                (transfer_id, account_id, delta, reason, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(marker.transfer_id.to_string())
        .bind(marker.account_id.0)
        .bind(marker.delta)
        .bind(&marker.reason)
        .bind(marker.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(marker.with_id(id))
    }

    async fn pending(&self, limit: usize) -> Result<Vec<ReconciliationMarker>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, transfer_id, account_id, delta, reason, created_at, resolved_at
            FROM reconciliation_markers
            WHERE resolved_at IS NULL
            ORDER BY id ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_marker).collect()
    }

    async fn resolve(&self, marker_id: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE reconciliation_markers
            SET resolved_at = COALESCE(resolved_at, NOW())
            WHERE id = $1
            "#,
        )
        .bind(marker_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Database(format!(
                "reconciliation marker {} not found",
                marker_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support;
    use crate::store::collect_by_source;
    use chrono::Utc;

    fn unique_account(suffix: u32) -> NewAccount {
        // Sort code derived from the clock keeps reruns from colliding
        let n = (Utc::now().timestamp_micros() % 1_000_000) as u32;
        NewAccount {
            sort_code: format!("{:02}-{:02}-{:02}", n / 10_000 % 100, n / 100 % 100, n % 100),
            account_number: format!("{:08}", suffix),
            bank_name: "Bank of Tests".to_string(),
            owner_name: "Ada".to_string(),
        }
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL database"]
    async fn test_pg_insert_lookup_and_delta() {
        let db = test_support::connect().await;
        let store = PgAccountStore::new(db.pool().clone());

        let account = store.insert(unique_account(1)).await.unwrap();
        let found = store
            .find_by_identity(&account.sort_code, &account.account_number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, account.id);

        let updated = store.apply_delta(account.id, Decimal::new(10000, 2)).await.unwrap();
        assert_eq!(updated.current_balance, Decimal::new(100, 0));
        assert_eq!(updated.version, account.version + 1);

        assert!(
            store
                .apply_delta_if(account.id, Decimal::ONE, account.version)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(
            store.apply_delta(AccountId(i64::MAX), Decimal::ONE).await,
            Err(StoreError::AccountNotFound(AccountId(i64::MAX)))
        );
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL database"]
    async fn test_pg_duplicate_identity() {
        let db = test_support::connect().await;
        let store = PgAccountStore::new(db.pool().clone());

        let account = store.insert(unique_account(2)).await.unwrap();
        let duplicate = NewAccount {
            sort_code: account.sort_code.clone(),
            account_number: account.account_number.clone(),
            bank_name: "Other".to_string(),
            owner_name: "Eve".to_string(),
        };
        assert!(matches!(
            store.insert(duplicate).await,
            Err(StoreError::DuplicateIdentity(_))
        ));
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL database"]
    async fn test_pg_transaction_log_order() {
        let db = test_support::connect().await;
        let store = PgAccountStore::new(db.pool().clone());
        let log = PgTransactionLog::new(db.pool().clone());

        let source = store.insert(unique_account(3)).await.unwrap();
        let target = store.insert(unique_account(4)).await.unwrap();

        let base = Utc::now();
        for offset in [30, 10, 20] {
            let at = base + chrono::Duration::seconds(offset);
            log.append(NewTransaction {
                amount: Decimal::new(500, 2),
                source_account_id: source.id,
                target_account_id: target.id,
                target_owner_name: target.owner_name.clone(),
                initiation_date: at,
                completion_date: at,
                reference: format!("t{offset}"),
                latitude: Some(51.5),
                longitude: None,
            })
            .await
            .unwrap();
        }

        let records = collect_by_source(&log, source.id).await.unwrap();
        let refs: Vec<&str> = records.iter().map(|t| t.reference.as_str()).collect();
        assert_eq!(refs, vec!["t10", "t20", "t30"]);
    }
}
