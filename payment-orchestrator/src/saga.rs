//! The saga core: payment creation, flag updates, and completion.
//!
//! `PaymentRepository`/`SagaPublisher` traits keep the saga exercisable
//! against in-memory doubles in tests.

use crate::errors::{OrchestratorError, OrchestratorResult};
use crate::lock_registry::LockRegistry;
use crate::models::{Currency, Payment, PaymentMethod, PaymentStatus, VerificationOutcome};
use async_trait::async_trait;
use chrono::Utc;
use saga_common::events::{PaymentCreatedEvent, WalletDebitRequestedEvent};
use saga_common::topics;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Repo and publish calls are bounded so a stalled database or broker never
/// hangs a saga step forever.
const OP_TIMEOUT: Duration = Duration::from_secs(5);

async fn with_timeout<T>(op: &str, fut: impl Future<Output = OrchestratorResult<T>>) -> OrchestratorResult<T> {
    match tokio::time::timeout(OP_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(OrchestratorError::Timeout(op.to_string())),
    }
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(
        &self,
        id: &str,
        amount: rust_decimal::Decimal,
        currency: Currency,
        method: PaymentMethod,
        customer_id: &str,
        trace_id: &str,
    ) -> OrchestratorResult<Payment>;

    async fn get_by_id(&self, id: &str) -> OrchestratorResult<Payment>;

    async fn update(&self, payment: &Payment) -> OrchestratorResult<Payment>;
}

#[async_trait]
impl PaymentRepository for crate::repository::PaymentStore {
    async fn create(
        &self,
        id: &str,
        amount: rust_decimal::Decimal,
        currency: Currency,
        method: PaymentMethod,
        customer_id: &str,
        trace_id: &str,
    ) -> OrchestratorResult<Payment> {
        crate::repository::PaymentStore::create(
            self,
            id,
            amount,
            currency,
            method,
            customer_id,
            trace_id,
        )
        .await
    }

    async fn get_by_id(&self, id: &str) -> OrchestratorResult<Payment> {
        crate::repository::PaymentStore::get_by_id(self, id).await
    }

    async fn update(&self, payment: &Payment) -> OrchestratorResult<Payment> {
        crate::repository::PaymentStore::update(self, payment).await
    }
}

#[async_trait]
pub trait SagaPublisher: Send + Sync {
    async fn publish_payment_created(&self, event: &PaymentCreatedEvent) -> OrchestratorResult<()>;
    async fn publish_wallet_debit_requested(
        &self,
        event: &WalletDebitRequestedEvent,
    ) -> OrchestratorResult<()>;
}

#[async_trait]
impl SagaPublisher for saga_common::bus::Publisher {
    async fn publish_payment_created(&self, event: &PaymentCreatedEvent) -> OrchestratorResult<()> {
        self.publish(topics::PAYMENTS_CREATED, &event.id, event)
            .await
            .map_err(OrchestratorError::from)
    }

    async fn publish_wallet_debit_requested(
        &self,
        event: &WalletDebitRequestedEvent,
    ) -> OrchestratorResult<()> {
        self.publish(topics::WALLET_DEBIT_REQUESTED, &event.payment_id, event)
            .await
            .map_err(OrchestratorError::from)
    }
}

pub struct SagaService<R: PaymentRepository, P: SagaPublisher> {
    repo: Arc<R>,
    publisher: Arc<P>,
    locks: LockRegistry,
}

impl<R: PaymentRepository, P: SagaPublisher> SagaService<R, P> {
    pub fn new(repo: Arc<R>, publisher: Arc<P>) -> Self {
        Self {
            repo,
            publisher,
            locks: LockRegistry::default(),
        }
    }

    pub async fn create_payment(
        &self,
        amount: rust_decimal::Decimal,
        currency: &str,
        method: &str,
        customer_id: &str,
    ) -> OrchestratorResult<Payment> {
        let currency = currency.trim().to_uppercase();
        let method = method.trim().to_uppercase();
        let customer_id = customer_id.trim().to_string();

        if amount <= rust_decimal::Decimal::ZERO {
            return Err(OrchestratorError::Validation(
                "amount must be positive".to_string(),
            ));
        }
        if customer_id.is_empty() {
            return Err(OrchestratorError::Validation(
                "customer_id must not be empty".to_string(),
            ));
        }
        let currency_enum = Currency::parse(&currency)
            .ok_or_else(|| OrchestratorError::Validation(format!("unknown currency: {currency}")))?;
        let method_enum = PaymentMethod::parse(&method)
            .ok_or_else(|| OrchestratorError::Validation(format!("unknown method: {method}")))?;

        let id = Uuid::new_v4().to_string();
        let trace_id = Uuid::new_v4().to_string();

        let payment = with_timeout(
            "repo.create",
            self.repo
                .create(&id, amount, currency_enum, method_enum, &customer_id, &trace_id),
        )
        .await?;

        let event = PaymentCreatedEvent {
            id: payment.id.clone(),
            amount: payment.amount,
            currency: payment.currency.to_string(),
            status: payment.status.to_string(),
            method: payment.method.to_string(),
            customer_id: payment.customer_id.clone(),
            trace_id: payment.trace_id.clone(),
            created_at: payment.created_at,
        };

        with_timeout("publish.payment_created", self.publisher.publish_payment_created(&event)).await?;

        Ok(payment)
    }

    pub async fn get_payment(&self, payment_id: &str) -> OrchestratorResult<Payment> {
        with_timeout("repo.get_by_id", self.repo.get_by_id(payment_id)).await
    }

    /// Applies a fraud or wallet verification outcome to the payment, then
    /// tries to complete it. First-writer-wins on `failed_reason`: a second
    /// decline arriving after the first never overwrites the recorded reason.
    pub async fn update_payment_flags(
        &self,
        payment_id: &str,
        outcome: VerificationOutcome,
    ) -> OrchestratorResult<()> {
        let mut payment = with_timeout("repo.get_by_id", self.repo.get_by_id(payment_id)).await?;

        match outcome {
            VerificationOutcome::Wallet { approved, reason } => {
                if !approved {
                    payment.status = PaymentStatus::Failed;
                    if payment.failed_reason.is_none() {
                        payment.failed_reason = reason;
                    }
                }
                payment.wallet_approved = approved;
            }
            VerificationOutcome::Fraud { clean, reason } => {
                if !clean {
                    payment.status = PaymentStatus::Failed;
                    if payment.failed_reason.is_none() {
                        payment.failed_reason = reason;
                    }
                }
                payment.fraud_cleared = clean;
            }
        }

        let payment = with_timeout("repo.update", self.repo.update(&payment)).await?;

        self.complete_payment_if_ready(payment).await
    }

    async fn complete_payment_if_ready(&self, payment: Payment) -> OrchestratorResult<()> {
        let lock = self.locks.get(&payment.id);
        let _guard = lock.lock().await;

        let payment = with_timeout("repo.get_by_id", self.repo.get_by_id(&payment.id)).await?;

        if payment.status.is_terminal() || !payment.wallet_approved || !payment.fraud_cleared {
            return Ok(());
        }

        let mut payment = payment;
        payment.status = PaymentStatus::Authorized;
        payment.failed_reason = None;
        payment.authorized_at = Some(Utc::now());

        let payment = with_timeout("repo.update", self.repo.update(&payment)).await?;

        let event = WalletDebitRequestedEvent {
            payment_id: payment.id.clone(),
            user_id: payment.customer_id.clone(),
            amount: payment.amount,
            reason: "PAYMENT_COMPLETE".to_string(),
            trace_id: payment.trace_id.clone(),
        };

        with_timeout(
            "publish.wallet_debit_requested",
            self.publisher.publish_wallet_debit_requested(&event),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Mutex as AsyncStdMutex;

    #[derive(Default)]
    struct InMemoryStore {
        payments: AsyncStdMutex<HashMap<String, Payment>>,
    }

    #[async_trait]
    impl PaymentRepository for InMemoryStore {
        async fn create(
            &self,
            id: &str,
            amount: rust_decimal::Decimal,
            currency: Currency,
            method: PaymentMethod,
            customer_id: &str,
            trace_id: &str,
        ) -> OrchestratorResult<Payment> {
            let now = Utc::now();
            let payment = Payment {
                id: id.to_string(),
                amount,
                currency,
                method,
                customer_id: customer_id.to_string(),
                status: PaymentStatus::Pending,
                wallet_approved: false,
                fraud_cleared: false,
                failed_reason: None,
                trace_id: trace_id.to_string(),
                created_at: now,
                updated_at: now,
                authorized_at: None,
            };
            self.payments
                .lock()
                .await
                .insert(id.to_string(), payment.clone());
            Ok(payment)
        }

        async fn get_by_id(&self, id: &str) -> OrchestratorResult<Payment> {
            self.payments
                .lock()
                .await
                .get(id)
                .cloned()
                .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))
        }

        async fn update(&self, payment: &Payment) -> OrchestratorResult<Payment> {
            let mut payment = payment.clone();
            payment.updated_at = Utc::now();
            self.payments
                .lock()
                .await
                .insert(payment.id.clone(), payment.clone());
            Ok(payment)
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        debit_requests: StdMutex<Vec<WalletDebitRequestedEvent>>,
        created_events: StdMutex<Vec<PaymentCreatedEvent>>,
    }

    #[async_trait]
    impl SagaPublisher for RecordingPublisher {
        async fn publish_payment_created(
            &self,
            event: &PaymentCreatedEvent,
        ) -> OrchestratorResult<()> {
            self.created_events.lock().unwrap().push(event.clone());
            Ok(())
        }

        async fn publish_wallet_debit_requested(
            &self,
            event: &WalletDebitRequestedEvent,
        ) -> OrchestratorResult<()> {
            self.debit_requests.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn service() -> SagaService<InMemoryStore, RecordingPublisher> {
        SagaService::new(
            Arc::new(InMemoryStore::default()),
            Arc::new(RecordingPublisher::default()),
        )
    }

    #[tokio::test]
    async fn create_payment_rejects_unknown_currency() {
        let svc = service();
        let err = svc
            .create_payment(rust_decimal::Decimal::from(100), "ZZZ", "CREDIT_CARD", "cust-1")
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Validation(_)));
    }

    #[tokio::test]
    async fn create_payment_rejects_non_positive_amount() {
        let svc = service();
        let err = svc
            .create_payment(rust_decimal::Decimal::ZERO, "USD", "CREDIT_CARD", "cust-1")
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Validation(_)));
    }

    #[tokio::test]
    async fn happy_path_authorizes_after_both_signals() {
        let svc = service();
        let payment = svc
            .create_payment(rust_decimal::Decimal::from(100), "usd", "credit_card", "cust-1")
            .await
            .unwrap();

        svc.update_payment_flags(
            &payment.id,
            VerificationOutcome::Fraud {
                clean: true,
                reason: None,
            },
        )
        .await
        .unwrap();

        let mid = svc.repo.get_by_id(&payment.id).await.unwrap();
        assert_eq!(mid.status, PaymentStatus::Pending);

        svc.update_payment_flags(
            &payment.id,
            VerificationOutcome::Wallet {
                approved: true,
                reason: None,
            },
        )
        .await
        .unwrap();

        let done = svc.repo.get_by_id(&payment.id).await.unwrap();
        assert_eq!(done.status, PaymentStatus::Authorized);
        assert!(done.authorized_at.is_some());
        assert_eq!(svc.publisher.debit_requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn out_of_order_signals_still_authorize_exactly_once() {
        let svc = service();
        let payment = svc
            .create_payment(rust_decimal::Decimal::from(50), "usd", "paypal", "cust-2")
            .await
            .unwrap();

        svc.update_payment_flags(
            &payment.id,
            VerificationOutcome::Wallet {
                approved: true,
                reason: None,
            },
        )
        .await
        .unwrap();
        svc.update_payment_flags(
            &payment.id,
            VerificationOutcome::Fraud {
                clean: true,
                reason: None,
            },
        )
        .await
        .unwrap();

        let done = svc.repo.get_by_id(&payment.id).await.unwrap();
        assert_eq!(done.status, PaymentStatus::Authorized);
        assert_eq!(svc.publisher.debit_requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn first_writer_wins_on_failed_reason() {
        let svc = service();
        let payment = svc
            .create_payment(rust_decimal::Decimal::from(50), "usd", "paypal", "cust-3")
            .await
            .unwrap();

        svc.update_payment_flags(
            &payment.id,
            VerificationOutcome::Fraud {
                clean: false,
                reason: Some("fraud reason".to_string()),
            },
        )
        .await
        .unwrap();
        svc.update_payment_flags(
            &payment.id,
            VerificationOutcome::Wallet {
                approved: false,
                reason: Some("wallet reason".to_string()),
            },
        )
        .await
        .unwrap();

        let done = svc.repo.get_by_id(&payment.id).await.unwrap();
        assert_eq!(done.status, PaymentStatus::Failed);
        assert_eq!(done.failed_reason.as_deref(), Some("fraud reason"));
    }

    #[tokio::test]
    async fn terminal_payment_never_gets_a_second_debit_request() {
        let svc = service();
        let payment = svc
            .create_payment(rust_decimal::Decimal::from(50), "usd", "paypal", "cust-4")
            .await
            .unwrap();

        svc.update_payment_flags(
            &payment.id,
            VerificationOutcome::Fraud {
                clean: true,
                reason: None,
            },
        )
        .await
        .unwrap();
        svc.update_payment_flags(
            &payment.id,
            VerificationOutcome::Wallet {
                approved: true,
                reason: None,
            },
        )
        .await
        .unwrap();
        // A duplicate delivery of the same wallet approval (at-least-once redelivery).
        svc.update_payment_flags(
            &payment.id,
            VerificationOutcome::Wallet {
                approved: true,
                reason: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(svc.publisher.debit_requests.lock().unwrap().len(), 1);
    }
}
