//! Demuxes `payments.created` (validate funds) and `wallet.debit.requested`
//! (debit balance).

use crate::service::WalletService;
use saga_common::error::HandlerError;
use saga_common::events::{PaymentCreatedEvent, WalletDebitRequestedEvent};
use saga_common::topics;
use saga_common::bus::Publisher;
use std::sync::Arc;

pub async fn handle_message(
    service: Arc<WalletService>,
    publisher: Arc<Publisher>,
    topic: String,
    payload: Vec<u8>,
) -> Result<(), HandlerError> {
    match topic.as_str() {
        topics::PAYMENTS_CREATED => {
            let event: PaymentCreatedEvent = serde_json::from_slice(&payload)
                .map_err(|e| HandlerError::Protocol(e.to_string()))?;

            tracing::info!(payment_id = %event.id, customer_id = %event.customer_id, "Validating funds");

            let response = service
                .validate_funds(&event)
                .await
                .map_err(|e| HandlerError::Transient(e.to_string()))?;

            publisher
                .publish(topics::WALLET_FUNDS_VERIFIED, &response.payment_id, &response)
                .await
                .map_err(|e| HandlerError::Transient(e.to_string()))?;

            // `wallet.response` is the metrics-only mirror of the same event;
            // best-effort, not retried here — metrics is a read-only observer
            // and the orchestrator-facing publish above is the one the
            // consumer's own retry/DLQ guards.
            if let Err(e) = publisher
                .publish(topics::WALLET_RESPONSE, &response.payment_id, &response)
                .await
            {
                tracing::warn!(error = %e, "failed to publish wallet.response metrics mirror");
            }

            Ok(())
        }
        topics::WALLET_DEBIT_REQUESTED => {
            let event: WalletDebitRequestedEvent = serde_json::from_slice(&payload)
                .map_err(|e| HandlerError::Protocol(e.to_string()))?;

            tracing::info!(payment_id = %event.payment_id, user_id = %event.user_id, "Debiting balance");

            service
                .debit_balance(&event.user_id, event.amount)
                .await
                .map_err(|e| HandlerError::Transient(e.to_string()))
        }
        other => Err(HandlerError::Protocol(format!("unexpected topic: {other}"))),
    }
}
