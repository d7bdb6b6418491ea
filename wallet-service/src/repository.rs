use crate::errors::{WalletError, WalletResult};
use crate::models::Wallet;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for wallet database operations: lookup-by-user and a
/// single optimistic-lock debit. No transfer/fund HTTP surface.
#[derive(Clone)]
pub struct WalletStore {
    pool: PgPool,
}

impl WalletStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: &str, email: &str, balance: Decimal) -> WalletResult<Wallet> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            INSERT INTO wallets (id, user_id, balance, email, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 0, $5, $5)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id, balance, email, version, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(balance)
        .bind(email)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(wallet)
    }

    pub async fn find_by_id(&self, wallet_id: &str) -> WalletResult<Wallet> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, user_id, balance, email, version, created_at, updated_at
            FROM wallets
            WHERE id = $1
            "#,
        )
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| WalletError::WalletNotFound(wallet_id.to_string()))?;

        Ok(wallet)
    }

    /// Mirrors the Go `GetBy("user_id", ...)` + take-the-first-row pattern.
    pub async fn find_by_user_id(&self, user_id: &str) -> WalletResult<Wallet> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, user_id, balance, email, version, created_at, updated_at
            FROM wallets
            WHERE user_id = $1
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| WalletError::WalletNotFound(user_id.to_string()))?;

        Ok(wallet)
    }

    /// Debits `amount` from the wallet owned by `user_id`, optimistic-lock
    /// compare-and-swap on `version`. No sufficiency re-check here — the
    /// caller (the orchestrator) has already confirmed funds via
    /// `validate_funds`.
    pub async fn debit(&self, user_id: &str, amount: Decimal) -> WalletResult<Wallet> {
        let wallet = self.find_by_user_id(user_id).await?;
        let new_balance = wallet.balance - amount;
        let new_version = wallet.version + 1;

        let rows_affected = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = $1, version = $2
            WHERE id = $3 AND version = $4
            "#,
        )
        .bind(new_balance)
        .bind(new_version)
        .bind(&wallet.id)
        .bind(wallet.version)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(WalletError::OptimisticLockError);
        }

        self.find_by_id(&wallet.id).await
    }
}
