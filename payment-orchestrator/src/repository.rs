use crate::errors::{OrchestratorError, OrchestratorResult};
use crate::models::{Currency, Payment, PaymentMethod, PaymentStatus};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;

/// Repository for payment persistence.
///
/// Only looks payments up by id — the saga never needs the Go service's
/// generic `GetBy(field, value)` lookup, so it isn't reproduced here.
#[derive(Clone)]
pub struct PaymentStore {
    pool: PgPool,
}

impl PaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        id: &str,
        amount: Decimal,
        currency: Currency,
        method: PaymentMethod,
        customer_id: &str,
        trace_id: &str,
    ) -> OrchestratorResult<Payment> {
        let now = Utc::now();

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments
                (id, amount, currency, method, customer_id, status, wallet_approved,
                 fraud_cleared, failed_reason, trace_id, created_at, updated_at, authorized_at)
            VALUES ($1, $2, $3, $4, $5, $6, false, false, NULL, $7, $8, $8, NULL)
            RETURNING id, amount, currency, method, customer_id, status, wallet_approved,
                      fraud_cleared, failed_reason, trace_id, created_at, updated_at, authorized_at
            "#,
        )
        .bind(id)
        .bind(amount)
        .bind(currency)
        .bind(method)
        .bind(customer_id)
        .bind(PaymentStatus::Pending)
        .bind(trace_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(payment)
    }

    pub async fn get_by_id(&self, id: &str) -> OrchestratorResult<Payment> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, amount, currency, method, customer_id, status, wallet_approved,
                   fraud_cleared, failed_reason, trace_id, created_at, updated_at, authorized_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))?;

        Ok(payment)
    }

    /// Full-row update. The saga holds the per-payment lock across
    /// read-modify-write, so this is a plain overwrite, not a compare-and-swap.
    pub async fn update(&self, payment: &Payment) -> OrchestratorResult<Payment> {
        let now = Utc::now();

        let updated = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = $1, wallet_approved = $2, fraud_cleared = $3,
                failed_reason = $4, updated_at = $5, authorized_at = $6
            WHERE id = $7
            RETURNING id, amount, currency, method, customer_id, status, wallet_approved,
                      fraud_cleared, failed_reason, trace_id, created_at, updated_at, authorized_at
            "#,
        )
        .bind(payment.status)
        .bind(payment.wallet_approved)
        .bind(payment.fraud_cleared)
        .bind(&payment.failed_reason)
        .bind(now)
        .bind(payment.authorized_at)
        .bind(&payment.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(payment.id.clone()))?;

        Ok(updated)
    }
}
