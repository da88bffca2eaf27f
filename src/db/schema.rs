use sqlx::PgPool;

/// Create ledger tables and indexes if they do not exist yet
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Initializing ledger schema...");

    for statement in SCHEMA {
        sqlx::query(*statement).execute(pool).await?;
    }

    tracing::info!("Ledger schema initialized successfully");
    Ok(())
}

// =============================================================================
// Ledger tables
// =============================================================================
//
// accounts: unique (sort_code, account_number) plus a plain index on
// account_number for lookups without a sort code.
// transactions: ordered retrieval by (source_account_id, initiation_date).
// reconciliation_markers: partial index keeps the pending scan cheap.
//
// Balances are NUMERIC(20, 2); never FLOAT.
// =============================================================================
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id BIGSERIAL PRIMARY KEY,
        sort_code VARCHAR(8) NOT NULL,
        account_number VARCHAR(8) NOT NULL,
        bank_name VARCHAR(100) NOT NULL,
        owner_name VARCHAR(100) NOT NULL,
        current_balance NUMERIC(20, 2) NOT NULL DEFAULT 0,
        version BIGINT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT accounts_identity_uq UNIQUE (sort_code, account_number)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS accounts_account_number_idx
        ON accounts (account_number)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
        id BIGSERIAL PRIMARY KEY,
        amount NUMERIC(20, 2) NOT NULL CHECK (amount > 0),
        source_account_id BIGINT NOT NULL REFERENCES accounts (id),
        target_account_id BIGINT NOT NULL REFERENCES accounts (id),
        target_owner_name VARCHAR(100) NOT NULL,
        initiation_date TIMESTAMPTZ NOT NULL,
        completion_date TIMESTAMPTZ NOT NULL,
        reference TEXT NOT NULL DEFAULT '',
        latitude DOUBLE PRECISION,
        longitude DOUBLE PRECISION
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS transactions_source_initiation_idx
        ON transactions (source_account_id, initiation_date)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reconciliation_markers (
        id BIGSERIAL PRIMARY KEY,
        transfer_id VARCHAR(26) NOT NULL,
        account_id BIGINT NOT NULL REFERENCES accounts (id),
        delta NUMERIC(20, 2) NOT NULL,
        reason TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        resolved_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS reconciliation_markers_pending_idx
        ON reconciliation_markers (id) WHERE resolved_at IS NULL
    "#,
];
